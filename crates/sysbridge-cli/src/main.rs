//! Sysbridge CLI - send messages to the system log through the sysbridge
//! module, the same way a script running in the host would.
//!
//! Messages come from the command line, or one per line from standard input
//! when none are given.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sysbridge::{DispatchMode, LibcSyslog, RecordingSyslog, SyslogBackend, SyslogCall};
use sysbridge_telemetry::LogConfig;

mod config_file;
mod names;
mod session;

use config_file::CliConfig;
use session::Plan;

/// Sysbridge - the system log from a host isolate
#[derive(Parser, Debug)]
#[command(name = "sysbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file with [bridge] and [logging] sections
    #[arg(short, long, env = "SYSBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Daemon name the messages are logged under
    #[arg(short = 't', long = "tag", default_value = "sysbridge")]
    name: String,

    /// Facility name (daemon, local0, ...) or number
    #[arg(short, long, default_value = "user", value_parser = names::parse_facility)]
    facility: i32,

    /// Severity name (info, err, ...) or level 0-7
    #[arg(short, long, default_value = "notice", value_parser = names::parse_level)]
    level: i32,

    /// Open option: pid, cons, odelay, ndelay, nowait or perror (repeatable)
    #[arg(short, long = "option", value_parser = names::parse_option)]
    options: Vec<i32>,

    /// Restrict delivery to this severity
    #[arg(short, long, value_parser = names::parse_level)]
    mask: Option<i32>,

    /// With --mask, deliver that severity and everything more urgent
    #[arg(long, requires = "mask")]
    up_to: bool,

    /// Write in submission order on one dedicated thread
    #[arg(long)]
    serial: bool,

    /// Record the calls and print them instead of writing to the system log
    #[arg(long)]
    dry_run: bool,

    /// Messages to log; read from standard input when absent
    messages: Vec<String>,
}

impl Cli {
    fn plan(&self, messages: Vec<String>) -> Plan {
        Plan {
            name: self.name.clone(),
            option: self.options.iter().fold(0, |flags, flag| flags | flag),
            facility: self.facility,
            level: self.level,
            mask: self.mask.map(|level| (level, self.up_to)),
            messages,
        }
    }

    fn messages(&self) -> Result<Vec<String>> {
        if !self.messages.is_empty() {
            return Ok(vec![self.messages.join(" ")]);
        }
        std::io::stdin()
            .lock()
            .lines()
            .filter(|line| !matches!(line, Ok(text) if text.trim().is_empty()))
            .collect::<Result<_, _>>()
            .context("failed to read messages from standard input")
    }
}

fn log_config(file: &CliConfig, verbose: bool) -> LogConfig {
    let mut config = file.logging.clone();
    if verbose {
        "debug".clone_into(&mut config.level);
    }
    config
}

fn print_recorded(recorder: &RecordingSyslog) {
    for call in recorder.calls() {
        match call {
            SyslogCall::Open {
                ident,
                option,
                facility,
            } => println!("open    ident={ident} option={option:#x} facility={facility}"),
            SyslogCall::Write { priority, message } => println!(
                "write   {}: {message}",
                names::level_name(priority & sysbridge_sys::MAX_LEVEL)
            ),
            SyslogCall::SetMask { mask, previous } => {
                println!("setmask mask={mask:#04x} previous={previous:#04x}");
            },
            SyslogCall::Close => println!("close"),
        }
    }
    let filtered = recorder.filtered();
    if filtered > 0 {
        println!("({filtered} message(s) filtered by the mask)");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Err(e) = sysbridge_telemetry::setup_logging(&log_config(&file, cli.verbose)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut bridge = file.bridge;
    if cli.serial {
        bridge.dispatch = DispatchMode::Serial;
    }

    let plan = cli.plan(cli.messages()?);
    if cli.dry_run {
        let recorder = Arc::new(RecordingSyslog::new());
        let backend: Arc<dyn SyslogBackend> = recorder.clone();
        session::run(&plan, bridge, backend)?;
        print_recorded(&recorder);
    } else {
        session::run(&plan, bridge, Arc::new(LibcSyslog))?;
    }
    Ok(())
}
