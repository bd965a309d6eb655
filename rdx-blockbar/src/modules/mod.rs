//! Block kinds and their acquisition routines.
//!
//! Every kind flattens `BlockConfigBase` into its own settings and keeps its
//! parsing in a plain function so it can be tested without the machine it
//! describes. Acquisition errors end up in the block's text.

use crate::assembly::{parse_block, SectionDescriptor, SectionShape};
use anyhow::{bail, Context};
use std::process::Command;

pub mod disk;
pub mod interfaces;
pub mod load;
pub mod memory;
pub mod raid;
pub mod temperature;
pub mod time;
pub mod volume;

pub use disk::Disk;
pub use interfaces::Interface;
pub use load::Load;
pub use memory::Memory;
pub use raid::Raid;
pub use temperature::Temperature;
pub use time::Time;
pub use volume::Volume;

/// The `[blocks]` sections, in traversal order.
pub const SECTIONS: &[SectionDescriptor] = &[
    SectionDescriptor {
        name: "disk",
        shape: SectionShape::Single,
        parse: parse_block::<Disk>,
    },
    SectionDescriptor {
        name: "interfaces",
        shape: SectionShape::List,
        parse: parse_block::<Interface>,
    },
    SectionDescriptor {
        name: "load",
        shape: SectionShape::Single,
        parse: parse_block::<Load>,
    },
    SectionDescriptor {
        name: "memory",
        shape: SectionShape::Single,
        parse: parse_block::<Memory>,
    },
    SectionDescriptor {
        name: "raid",
        shape: SectionShape::Single,
        parse: parse_block::<Raid>,
    },
    SectionDescriptor {
        name: "temperatures",
        shape: SectionShape::List,
        parse: parse_block::<Temperature>,
    },
    SectionDescriptor {
        name: "time",
        shape: SectionShape::Single,
        parse: parse_block::<Time>,
    },
    SectionDescriptor {
        name: "volume",
        shape: SectionShape::Single,
        parse: parse_block::<Volume>,
    },
];

/// Runs a command to completion and returns its stdout.
///
/// A non-zero exit is an error carrying the first line of stderr.
pub(crate) fn run_command(program: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("{} failed to start", program))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().next().unwrap_or("").trim();
        bail!("{} exited with {}: {}", program, output.status, reason);
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
