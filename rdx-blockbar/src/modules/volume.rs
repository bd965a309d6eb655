//! The volume block. Only the ALSA master channel is supported.

use super::run_command;
use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
    #[serde(flatten)]
    pub base: BlockConfigBase,
}

/// Returns the text of the first bracketed field in `amixer get` output,
/// which is the volume percentage.
pub fn parse_amixer(output: &str) -> anyhow::Result<&str> {
    let begin = output.find('[').context("cannot parse amixer output")?;
    let end = output[begin..]
        .find(']')
        .context("cannot parse amixer output")?;
    Ok(&output[begin + 1..begin + end])
}

impl BlockConfig for Volume {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "volume"
    }

    fn update(&self, state: &mut BlockState) {
        let volume = run_command("amixer", &["-D", "default", "get", "Master"])
            .and_then(|output| parse_amixer(&output).map(str::to_string));
        self.base.write_result(state, volume);
    }
}
