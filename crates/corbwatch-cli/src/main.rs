#![forbid(unsafe_code)]

use std::fs::OpenOptions;
use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use corbwatch_cli::{run_session, JsonLinesSink, MonitorCommandSink, DEFAULT_DUMP_LEN};
use corbwatch_core::{CorbMonitor, DEFAULT_EXIT_THRESHOLD};

/// Watch a QEMU HDA register-write trace on stdin and request guest-memory
/// dumps as the command ring drains.
#[derive(Debug, Parser)]
#[command(name = "corbwatch", version)]
struct Args {
    /// Where to deliver capture commands: "-" for stdout, or a path (monitor
    /// pty, FIFO, file).
    #[arg(long, default_value = "-")]
    monitor: String,

    /// pmemsave capture length in bytes.
    #[arg(long, default_value_t = DEFAULT_DUMP_LEN)]
    dump_len: u32,

    /// Verb count that must be exceeded before the teardown probe fires the
    /// final dump.
    #[arg(long, default_value_t = DEFAULT_EXIT_THRESHOLD)]
    exit_threshold: u32,

    /// Emit dump requests as JSON lines instead of monitor commands.
    #[arg(long)]
    json: bool,

    /// Stop reading the trace once the final dump has been delivered.
    #[arg(long)]
    exit_on_final: bool,
}

fn open_target(target: &str) -> anyhow::Result<Box<dyn Write>> {
    match target {
        "-" => Ok(Box::new(io::stdout())),
        path => {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .open(path)
                .with_context(|| format!("opening monitor target {path}"))?;
            Ok(Box::new(file))
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout may be the command channel.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut monitor = CorbMonitor::new().with_exit_threshold(args.exit_threshold);
    let out = open_target(&args.monitor)?;

    let stdin = io::stdin();
    let stats = if args.json {
        let mut sink = JsonLinesSink::new(out);
        run_session(stdin.lock(), &mut monitor, &mut sink, args.exit_on_final)?
    } else {
        let mut sink = MonitorCommandSink::new(out).with_dump_len(args.dump_len);
        run_session(stdin.lock(), &mut monitor, &mut sink, args.exit_on_final)?
    };

    tracing::info!(
        lines = stats.lines,
        events = stats.events,
        verbs = monitor.verbs(),
        dumps = stats.dumps,
        final_dump = stats.final_dump,
        "trace ended"
    );
    Ok(())
}
