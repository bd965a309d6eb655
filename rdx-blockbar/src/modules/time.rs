//! The clock block.

use crate::components::block::{BlockConfig, BlockConfigBase, BlockState};
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt::Write;

#[derive(Debug, Clone, Deserialize)]
pub struct Time {
    #[serde(flatten)]
    pub base: BlockConfigBase,
    /// A chrono `strftime` pattern.
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// An IANA zone name (e.g. "America/New_York"). Local time when unset.
    #[serde(default)]
    pub timezone: Option<Tz>,
}

fn default_time_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

/// Formats `now` with `format`, reporting a bad pattern instead of panicking.
pub fn format_time<Z>(now: &DateTime<Z>, format: &str) -> anyhow::Result<String>
where
    Z: TimeZone,
    Z::Offset: std::fmt::Display,
{
    let mut text = String::new();
    write!(text, "{}", now.format(format))
        .map_err(|_| anyhow::anyhow!("invalid time format {:?}", format))?;
    Ok(text)
}

impl BlockConfig for Time {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "time"
    }

    fn update(&self, state: &mut BlockState) {
        let text = match self.timezone {
            Some(tz) => format_time(&Utc::now().with_timezone(&tz), &self.time_format),
            None => format_time(&Local::now(), &self.time_format),
        };
        self.base.write_result(state, text);
    }
}
