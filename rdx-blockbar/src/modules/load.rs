//! The load average block.

use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use anyhow::Context;
use serde::Deserialize;

const LOADAVG_PATH: &str = "/proc/loadavg";

#[derive(Debug, Clone, Deserialize)]
pub struct Load {
    #[serde(flatten)]
    pub base: BlockConfigBase,
    /// One-minute load above which the block is marked urgent.
    #[serde(default = "default_crit_load")]
    pub crit_load: f64,
}

fn default_crit_load() -> f64 {
    4.0
}

/// Parses the 1, 5 and 15 minute averages out of `/proc/loadavg`.
pub fn parse_loadavg(text: &str) -> anyhow::Result<[f64; 3]> {
    let mut fields = text.split_whitespace();
    let mut averages = [0.0; 3];
    for average in averages.iter_mut() {
        let field = fields.next().context("truncated loadavg")?;
        *average = field
            .parse()
            .with_context(|| format!("bad load value {:?}", field))?;
    }
    Ok(averages)
}

impl BlockConfig for Load {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "load"
    }

    fn update(&self, state: &mut BlockState) {
        let averages = std::fs::read_to_string(LOADAVG_PATH)
            .context("cannot read load average")
            .and_then(|text| parse_loadavg(&text));
        state.urgent = matches!(averages, Ok([one, _, _]) if one > self.crit_load);
        self.base
            .write_result(state, averages.map(|[one, _, _]| format!("{:.2}", one)));
    }
}
