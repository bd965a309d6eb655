//! The software RAID block, fed from `/proc/mdstat`.

use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use anyhow::Context;
use serde::Deserialize;

const MDSTAT_PATH: &str = "/proc/mdstat";

#[derive(Debug, Clone, Deserialize)]
pub struct Raid {
    #[serde(flatten)]
    pub base: BlockConfigBase,
}

/// Returns the names of degraded arrays, in the order mdstat lists them.
///
/// An array is degraded when its member map (such as `[UU_]`) has a gap.
pub fn degraded_arrays(mdstat: &str) -> Vec<&str> {
    let mut degraded = Vec::new();
    let mut current = None;
    for line in mdstat.lines() {
        if let Some((name, _)) = line.split_once(" : ") {
            let name = name.trim();
            current = name.starts_with("md").then_some(name);
            continue;
        }
        let Some(array) = current else {
            continue;
        };
        let member_map = line
            .split_whitespace()
            .rev()
            .find(|field| field.starts_with('[') && field.ends_with(']') && !field.contains('/'));
        if let Some(map) = member_map {
            if map.contains('_') {
                degraded.push(array);
            }
            current = None;
        }
    }
    degraded
}

impl BlockConfig for Raid {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "raid"
    }

    fn update(&self, state: &mut BlockState) {
        let status = std::fs::read_to_string(MDSTAT_PATH)
            .context("cannot read mdstat")
            .map(|mdstat| {
                let degraded = degraded_arrays(&mdstat);
                if degraded.is_empty() {
                    "ok".to_string()
                } else {
                    format!("degraded: {}", degraded.join(" "))
                }
            });
        state.urgent = matches!(&status, Ok(text) if text != "ok");
        self.base.write_result(state, status);
    }
}
