//! Turns block configuration into the ordered collection of block units.
//!
//! Configuration is read through a statically declared table of sections.
//! Each section holds either one block or a list of blocks, and sections are
//! visited in table order so the traversal is the same on every run.

use crate::common::MAX_UPDATE_SIGNAL;
use crate::components::block::{BlockConfig, BlockUnit};
use config::{Map, Value, ValueKind};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Structural problems found while assembling blocks. All of them are fatal
/// and stop the engine from starting.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("block section `{section}` must be {expected}, found {found}")]
    UnexpectedShape {
        section: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown block section `{0}`")]
    UnknownSection(String),

    #[error("invalid block in section `{section}`: {source}")]
    InvalidBlock {
        section: String,
        #[source]
        source: config::ConfigError,
    },

    #[error("blocks `{first}` and `{second}` both claim position {position}")]
    DuplicatePosition {
        position: usize,
        first: &'static str,
        second: &'static str,
    },

    #[error("no block at position {position}; {count} enabled blocks need positions 1..={count}")]
    MissingPosition { position: usize, count: usize },

    #[error(
        "block `{kind}` has update_signal {signal}; expected 0 (none) to {max}",
        max = MAX_UPDATE_SIGNAL
    )]
    InvalidUpdateSignal { kind: &'static str, signal: i32 },
}

/// Whether a section holds one block or a list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionShape {
    Single,
    List,
}

impl SectionShape {
    fn describe(self) -> &'static str {
        match self {
            SectionShape::Single => "a single block table",
            SectionShape::List => "a list of block tables",
        }
    }
}

/// A function that deserializes one block table into its configuration.
pub type BlockParser = fn(Value) -> Result<Arc<dyn BlockConfig>, config::ConfigError>;

/// The static description of one configuration section.
pub struct SectionDescriptor {
    pub name: &'static str,
    pub shape: SectionShape,
    pub parse: BlockParser,
}

/// Deserializes a block table into `T`. Used to build `SectionDescriptor`s.
pub fn parse_block<T>(value: Value) -> Result<Arc<dyn BlockConfig>, config::ConfigError>
where
    T: BlockConfig + DeserializeOwned + 'static,
{
    Ok(Arc::new(value.try_deserialize::<T>()?))
}

/// The configured blocks of one section.
#[derive(Debug)]
pub enum Section {
    Single {
        name: &'static str,
        block: Arc<dyn BlockConfig>,
    },
    List {
        name: &'static str,
        blocks: Vec<Arc<dyn BlockConfig>>,
    },
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::Single { name, .. } | Section::List { name, .. } => name,
        }
    }

    fn into_blocks(self) -> Vec<Arc<dyn BlockConfig>> {
        match self {
            Section::Single { block, .. } => vec![block],
            Section::List { blocks, .. } => blocks,
        }
    }
}

fn kind_name(kind: &ValueKind) -> &'static str {
    match kind {
        ValueKind::Nil => "nothing",
        ValueKind::Boolean(_) => "a boolean",
        ValueKind::I64(_) | ValueKind::I128(_) | ValueKind::U64(_) | ValueKind::U128(_) => {
            "an integer"
        }
        ValueKind::Float(_) => "a float",
        ValueKind::String(_) => "a string",
        ValueKind::Table(_) => "a table",
        ValueKind::Array(_) => "a list",
    }
}

/// Reads the raw `[blocks]` table section by section, in descriptor order.
///
/// Absent sections contribute nothing. Keys that match no descriptor and
/// sections of the wrong shape are errors, never skipped.
pub fn read_sections(
    raw: &Map<String, Value>,
    descriptors: &[SectionDescriptor],
) -> Result<Vec<Section>, AssemblyError> {
    if let Some(unknown) = raw
        .keys()
        .find(|key| !descriptors.iter().any(|d| d.name == key.as_str()))
    {
        return Err(AssemblyError::UnknownSection(unknown.clone()));
    }

    let mut sections = Vec::new();
    for descriptor in descriptors {
        let Some(value) = raw.get(descriptor.name) else {
            continue;
        };
        let invalid = |source| AssemblyError::InvalidBlock {
            section: descriptor.name.to_string(),
            source,
        };
        let shape_error = |found| AssemblyError::UnexpectedShape {
            section: descriptor.name.to_string(),
            expected: descriptor.shape.describe(),
            found,
        };

        let section = match (descriptor.shape, &value.kind) {
            (SectionShape::Single, ValueKind::Table(_)) => Section::Single {
                name: descriptor.name,
                block: (descriptor.parse)(value.clone()).map_err(invalid)?,
            },
            (SectionShape::List, ValueKind::Array(items)) => {
                let mut blocks = Vec::with_capacity(items.len());
                for item in items {
                    if !matches!(item.kind, ValueKind::Table(_)) {
                        return Err(shape_error(kind_name(&item.kind)));
                    }
                    blocks.push((descriptor.parse)(item.clone()).map_err(invalid)?);
                }
                Section::List {
                    name: descriptor.name,
                    blocks,
                }
            }
            (_, kind) => return Err(shape_error(kind_name(kind))),
        };
        sections.push(section);
    }
    Ok(sections)
}

/// Builds the ordered block units.
///
/// Blocks with a non-positive `block_index` are disabled and dropped. The
/// remaining positions must be exactly `1..=N`; unit `i` sits at position
/// `i + 1`. An enabled block's `update_signal` must keep `SIGRTMIN + n`
/// within the real-time range.
pub fn assemble(sections: Vec<Section>) -> Result<Vec<BlockUnit>, AssemblyError> {
    let mut placed: BTreeMap<usize, Arc<dyn BlockConfig>> = BTreeMap::new();
    for section in sections {
        let name = section.name();
        for block in section.into_blocks() {
            let index = block.base().block_index;
            if index <= 0 {
                debug!("Skipping disabled `{}` block from `{}`.", block.kind(), name);
                continue;
            }
            let signal = block.base().update_signal;
            if !(0..=MAX_UPDATE_SIGNAL).contains(&signal) {
                return Err(AssemblyError::InvalidUpdateSignal {
                    kind: block.kind(),
                    signal,
                });
            }
            let position = usize::try_from(index).unwrap_or(usize::MAX);
            if let Some(existing) = placed.get(&position) {
                return Err(AssemblyError::DuplicatePosition {
                    position,
                    first: existing.kind(),
                    second: block.kind(),
                });
            }
            placed.insert(position, block);
        }
    }

    let count = placed.len();
    if let Some(position) = (1..=count).find(|p| !placed.contains_key(p)) {
        return Err(AssemblyError::MissingPosition { position, count });
    }

    debug!("Assembled {} blocks.", count);
    Ok(placed
        .into_iter()
        .map(|(position, config)| BlockUnit::new(position, config))
        .collect())
}
