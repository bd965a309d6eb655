//! The disk usage block.

use super::run_command;
use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Disk {
    #[serde(flatten)]
    pub base: BlockConfigBase,
    /// Mount points to report, in display order.
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,
    /// Used percentage above which the block is marked urgent.
    #[serde(default = "default_crit_percent")]
    pub crit_percent: u8,
}

fn default_paths() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_crit_percent() -> u8 {
    90
}

/// Parses the used percentage out of `df -P` output for a single path.
pub fn parse_df(output: &str) -> anyhow::Result<u8> {
    let Some(row) = output.lines().nth(1) else {
        bail!("df printed no filesystem row");
    };
    let capacity = row
        .split_whitespace()
        .nth(4)
        .context("df row has no capacity column")?;
    capacity
        .trim_end_matches('%')
        .parse()
        .with_context(|| format!("bad df capacity {:?}", capacity))
}

impl Disk {
    fn usage(&self) -> anyhow::Result<Vec<(&str, u8)>> {
        let mut usage = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let output = run_command("df", &["-P", "-k", path.as_str()])?;
            usage.push((path.as_str(), parse_df(&output)?));
        }
        Ok(usage)
    }
}

impl BlockConfig for Disk {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "disk"
    }

    fn update(&self, state: &mut BlockState) {
        let usage = self.usage();
        state.urgent = matches!(
            &usage,
            Ok(usage) if usage.iter().any(|(_, used)| *used > self.crit_percent)
        );
        let text = usage.map(|usage| {
            usage
                .iter()
                .map(|(path, used)| format!("{} {}%", path, used))
                .collect::<Vec<_>>()
                .join(" ")
        });
        self.base.write_result(state, text);
    }
}
