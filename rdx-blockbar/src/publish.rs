//! Publishers turn the ordered block units into output.
//!
//! A publisher owns its failures: a write error is logged and the scheduler
//! carries on as if the render had succeeded.

use crate::components::block::{BlockState, BlockUnit};
use std::io::{self, Write};
use tracing::error;

/// Renders the current state of every block, in position order.
pub trait Publisher: Send {
    fn render(&mut self, units: &[BlockUnit]);
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn render(&mut self, units: &[BlockUnit]) {
        (**self).render(units)
    }
}

/// Speaks the i3bar JSON protocol: a header, then an endless array of
/// status lines.
pub struct I3barPublisher<W: Write + Send> {
    writer: W,
    header_written: bool,
}

impl<W: Write + Send> I3barPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, units: &[BlockUnit]) -> io::Result<()> {
        if !self.header_written {
            self.writer.write_all(b"{\"version\":1}\n[\n")?;
            self.header_written = true;
        }
        let states: Vec<&BlockState> = units.iter().map(|unit| &unit.state).collect();
        serde_json::to_writer(&mut self.writer, &states)?;
        self.writer.write_all(b",\n")?;
        self.writer.flush()
    }
}

impl<W: Write + Send> Publisher for I3barPublisher<W> {
    fn render(&mut self, units: &[BlockUnit]) {
        if let Err(e) = self.write_line(units) {
            error!("Failed to publish status line: {}", e);
        }
    }
}

/// Writes one plain text line per render, blocks separated by ` | `.
pub struct PlainPublisher<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> PlainPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Publisher for PlainPublisher<W> {
    fn render(&mut self, units: &[BlockUnit]) {
        let line = units
            .iter()
            .map(|unit| unit.state.full_text.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        let result = writeln!(self.writer, "{}", line).and_then(|_| self.writer.flush());
        if let Err(e) = result {
            error!("Failed to publish status line: {}", e);
        }
    }
}
