//! Session loop and snapshot sinks for the `corbwatch` binary.

#![forbid(unsafe_code)]

mod session;
mod sinks;

pub use session::{run_session, SessionError, SessionStats};
pub use sinks::{JsonLinesSink, MonitorCommandSink, DEFAULT_DUMP_LEN};
