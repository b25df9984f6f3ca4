//! Snapshot sinks: QEMU human-monitor commands and JSON lines.

use std::io::Write;

use corbwatch_core::{DumpKind, DumpRequest, SinkError, SnapshotSink};

/// Default `pmemsave` capture length in bytes: one page, enough for the
/// largest (256-entry, 4 bytes each) CORB plus slack.
pub const DEFAULT_DUMP_LEN: u32 = 0x1000;

/// Renders each dump request as a QEMU human-monitor command:
/// `pmemsave <addr> <len> <label>`. The target can be anything writable —
/// stdout for piping, the monitor pty, a FIFO.
pub struct MonitorCommandSink<W> {
    out: W,
    dump_len: u32,
}

impl<W: Write> MonitorCommandSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            dump_len: DEFAULT_DUMP_LEN,
        }
    }

    pub fn with_dump_len(mut self, len: u32) -> Self {
        self.dump_len = len;
        self
    }
}

fn label(request: &DumpRequest) -> String {
    match request.kind {
        DumpKind::Final => "exit_dump".to_owned(),
        DumpKind::Periodic => format!("frame{:02}", request.sequence),
    }
}

impl<W: Write> SnapshotSink for MonitorCommandSink<W> {
    fn deliver(&mut self, request: &DumpRequest) -> Result<(), SinkError> {
        if request.address == 0 {
            // The guest has not programmed CORBLBASE yet; a dump at 0 would
            // capture the real-mode IVT instead of the command ring.
            tracing::warn!(
                "skipping {:?} dump, CORB base address not observed yet",
                request.kind
            );
            return Ok(());
        }
        writeln!(
            self.out,
            "pmemsave {:#x} {:#x} {}",
            request.address,
            self.dump_len,
            label(request)
        )?;
        // One command per event; the monitor must see it before the next
        // drain, so don't sit in a BufWriter.
        self.out.flush()?;
        Ok(())
    }
}

/// Emits one JSON object per dump request, for harnesses that capture memory
/// themselves.
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SnapshotSink for JsonLinesSink<W> {
    fn deliver(&mut self, request: &DumpRequest) -> Result<(), SinkError> {
        let line = serde_json::to_string(request)?;
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}
