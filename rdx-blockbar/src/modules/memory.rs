//! The available memory block.

use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use anyhow::Context;
use serde::Deserialize;

const MEMINFO_PATH: &str = "/proc/meminfo";
const KIB_PER_GIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Deserialize)]
pub struct Memory {
    #[serde(flatten)]
    pub base: BlockConfigBase,
    /// Available GiB below which the block is marked urgent.
    #[serde(default = "default_crit_mem")]
    pub crit_mem: f64,
}

fn default_crit_mem() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kib: u64,
    pub available_kib: u64,
}

/// Extracts `MemTotal` and `MemAvailable` from `/proc/meminfo`.
pub fn parse_meminfo(text: &str) -> anyhow::Result<MemInfo> {
    let field = |name: &str| -> anyhow::Result<u64> {
        let line = text
            .lines()
            .find(|line| line.starts_with(name) && line[name.len()..].starts_with(':'))
            .with_context(|| format!("{} missing from meminfo", name))?;
        let value = line[name.len() + 1..]
            .split_whitespace()
            .next()
            .with_context(|| format!("{} has no value", name))?;
        value
            .parse()
            .with_context(|| format!("bad {} value {:?}", name, value))
    };
    Ok(MemInfo {
        total_kib: field("MemTotal")?,
        available_kib: field("MemAvailable")?,
    })
}

impl BlockConfig for Memory {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    fn update(&self, state: &mut BlockState) {
        let available = std::fs::read_to_string(MEMINFO_PATH)
            .context("cannot read meminfo")
            .and_then(|text| parse_meminfo(&text))
            .map(|info| info.available_kib as f64 / KIB_PER_GIB);
        state.urgent = matches!(available, Ok(gib) if gib < self.crit_mem);
        self.base
            .write_result(state, available.map(|gib| format!("{:.2}G", gib)));
    }
}
