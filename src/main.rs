//! smictl - disable unwanted SMI sources on Intel ICH south bridges
//!
//! BIOS-triggered System Management Interrupts are a common cause of
//! latency spikes on real-time systems. smictl finds the ICH LPC bridge
//! on the PCI bus, derives the I/O port of its SMI_EN register from the
//! PMBASE configuration bytes, and performs one read-modify-write pass
//! over the register's enable bits. Requires root for port access.
//!
//! # Examples
//!
//! Show the current register and its bit breakdown:
//!
//! ```text
//! smictl -v
//! ```
//!
//! Disable the TCO watchdog SMI without disturbing anything else:
//!
//! ```text
//! smictl -c 0x2000
//! ```

mod cli;
mod commands;

use cli::Cli;
use smictl_core::{Error, IdTableMatcher, LpcBridgeMatcher, MatchStrategy};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (cli, ops) = Cli::parse_with_ops();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let strategy: Box<dyn MatchStrategy> = if cli.id_table {
        Box::new(IdTableMatcher::new())
    } else {
        Box::new(LpcBridgeMatcher)
    };

    if let Err(err) = commands::run(&cli, ops, strategy.as_ref()) {
        eprintln!("smictl: {}", err);
        std::process::exit(exit_code(&err));
    }
}

/// Distinct exit codes: 1 for missing privilege, 2 is clap's usage
/// error, 3 for hardware-access failures
fn exit_code(err: &Error) -> i32 {
    match err {
        Error::InsufficientPrivilege(_) => 1,
        _ => 3,
    }
}
