//! The synchronous pull loop: trace lines in, dump commands out.

use std::io::{self, BufRead};

use corbwatch_core::{CorbMonitor, DumpKind, RegisterId, SinkError, SnapshotSink};
use corbwatch_trace::{parse_line, ParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("reading trace input: {0}")]
    Input(#[source] io::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(Debug, Default, Copy, Clone)]
pub struct SessionStats {
    /// Input lines consumed, trace or not.
    pub lines: u64,
    /// Well-formed write events fed to the monitor.
    pub events: u64,
    /// Dump requests delivered to the sink.
    pub dumps: u64,
    /// Whether the final (teardown) dump was requested.
    pub final_dump: bool,
}

/// Drive `monitor` with every write event decodable from `input`, delivering
/// dump requests to `sink` as they are produced.
///
/// Non-trace lines are skipped silently, malformed trace lines with a debug
/// log; only input and sink I/O errors abort the session.
pub fn run_session<R: BufRead, S: SnapshotSink>(
    input: R,
    monitor: &mut CorbMonitor,
    sink: &mut S,
    stop_on_final: bool,
) -> Result<SessionStats, SessionError> {
    let mut stats = SessionStats::default();

    for line in input.lines() {
        let line = line.map_err(SessionError::Input)?;
        stats.lines += 1;

        let event = match parse_line(&line) {
            Ok(event) => event,
            Err(ParseError::NotATraceLine) => continue,
            Err(err) => {
                tracing::debug!("skipping trace line ({err}): {line}");
                continue;
            }
        };
        stats.events += 1;

        let observation = monitor.observe(&event);
        match observation.register {
            RegisterId::GenericVerbRegion | RegisterId::Unclassified => {
                // Not ring control; logged so verb traffic can be correlated
                // with the dump timeline.
                tracing::debug!(
                    "uninterpreted write at verb {}: region{}+{:#x} = {:#x}",
                    monitor.verbs(),
                    event.region,
                    event.offset,
                    event.data
                );
            }
            register => {
                tracing::trace!("ring write {register:?} = {:#x}", event.data);
            }
        }

        if let Some(request) = observation.dump {
            tracing::info!(
                "{:?} dump requested at {:#x} (seq {}, verbs {})",
                request.kind,
                request.address,
                request.sequence,
                monitor.verbs()
            );
            sink.deliver(&request)?;
            stats.dumps += 1;
            if request.kind == DumpKind::Final {
                stats.final_dump = true;
                if stop_on_final {
                    break;
                }
            }
        }
    }

    Ok(stats)
}
