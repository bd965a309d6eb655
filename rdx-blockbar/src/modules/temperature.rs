//! The temperature block, read from a millidegree sensor file.

use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Temperature {
    #[serde(flatten)]
    pub base: BlockConfigBase,
    /// A sysfs/hwmon file holding millidegrees Celsius, e.g.
    /// `/sys/class/thermal/thermal_zone0/temp`.
    pub cpu_temp_path: String,
    #[serde(default = "default_crit_temp")]
    pub crit_temp: f64,
}

fn default_crit_temp() -> f64 {
    75.0
}

/// Converts a sensor reading in millidegrees to degrees Celsius.
pub fn parse_millidegrees(text: &str) -> anyhow::Result<f64> {
    let raw = text.trim();
    let milli: i64 = raw
        .parse()
        .with_context(|| format!("bad sensor reading {:?}", raw))?;
    Ok(milli as f64 / 1000.0)
}

impl BlockConfig for Temperature {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "temperature"
    }

    fn update(&self, state: &mut BlockState) {
        let celsius = std::fs::read_to_string(&self.cpu_temp_path)
            .with_context(|| format!("cannot read {}", self.cpu_temp_path))
            .and_then(|text| parse_millidegrees(&text));
        state.urgent = matches!(celsius, Ok(c) if c > self.crit_temp);
        self.base
            .write_result(state, celsius.map(|c| format!("{:.0}°C", c)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("48000\n", 48.0)]
    #[test_case("51250", 51.25)]
    #[test_case("-5000", -5.0)]
    fn converts_millidegrees(text: &str, expected: f64) {
        assert_eq!(parse_millidegrees(text).unwrap(), expected);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_millidegrees("N/A").is_err());
    }

    #[test]
    fn missing_sensor_shows_the_error_in_the_block() {
        let block = Temperature {
            base: BlockConfigBase {
                label: "T: ".to_string(),
                ..BlockConfigBase::new(1, 5.0)
            },
            cpu_temp_path: "/nonexistent/blockbar/temp".to_string(),
            crit_temp: default_crit_temp(),
        };
        let mut state = BlockState::new("temperature");
        block.update(&mut state);
        assert_eq!(state.full_text, "T: cannot read /nonexistent/blockbar/temp");
        assert!(!state.urgent);
    }
}
