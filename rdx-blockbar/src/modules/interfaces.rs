//! The network interface block: link state and IPv4 address.

use super::run_command;
use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Interface {
    #[serde(flatten)]
    pub base: BlockConfigBase,
    pub interface_name: String,
}

/// Extracts the first IPv4 address from `ip -4 -o addr show` output.
pub fn parse_ipv4(output: &str) -> Option<&str> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        fields.find(|field| *field == "inet")?;
        let cidr = fields.next()?;
        Some(cidr.split('/').next().unwrap_or(cidr))
    })
}

impl Interface {
    fn status(&self) -> anyhow::Result<String> {
        let operstate_path = format!("/sys/class/net/{}/operstate", self.interface_name);
        let operstate = std::fs::read_to_string(&operstate_path)
            .with_context(|| format!("no interface {}", self.interface_name))?;
        if operstate.trim() != "up" {
            return Ok("down".to_string());
        }
        let output = run_command(
            "ip",
            &["-4", "-o", "addr", "show", "dev", self.interface_name.as_str()],
        )?;
        Ok(parse_ipv4(&output).unwrap_or("no address").to_string())
    }
}

impl BlockConfig for Interface {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "interface"
    }

    fn update(&self, state: &mut BlockState) {
        state.instance = Some(self.interface_name.clone());
        self.base.write_result(state, self.status());
    }
}
