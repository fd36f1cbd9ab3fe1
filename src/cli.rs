//! CLI argument parsing

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use smictl_core::BitOperation;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "smictl")]
#[command(author, version, about = "Inspect and mask SMI sources on Intel ICH south bridges", long_about = None)]
pub struct Cli {
    /// Replace the whole register with VALUE (decimal or 0x-prefixed hex)
    #[arg(short = 's', long = "set", value_name = "VALUE",
          value_parser = parse_hex_u32, action = clap::ArgAction::Append)]
    pub set: Vec<u32>,

    /// OR VALUE into the register, leaving other bits alone
    #[arg(short = 'm', long = "mark", value_name = "VALUE",
          value_parser = parse_hex_u32, action = clap::ArgAction::Append)]
    pub mark: Vec<u32>,

    /// Clear the VALUE bits in the register, leaving other bits alone
    #[arg(short = 'c', long = "clear", value_name = "VALUE",
          value_parser = parse_hex_u32, action = clap::ArgAction::Append)]
    pub clear: Vec<u32>,

    /// Operate on ALT_GP_SMI_EN instead of SMI_EN
    #[arg(short = 'g', long = "gpio")]
    pub gpio: bool,

    /// Compute and report the new value without writing it
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Match against the legacy ICH device-ID table instead of the
    /// LPC-bridge heuristic
    #[arg(long = "id-table")]
    pub id_table: bool,

    /// Verbosity level (-v, -vv); one -v also prints the per-bit breakdown
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse the command line, also recovering the left-to-right order of
    /// the mutation flags (clap groups repeated occurrences per flag)
    pub fn parse_with_ops() -> (Self, Vec<BitOperation>) {
        let matches = Self::command().get_matches();
        let cli = Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
        let ops = ordered_ops(&matches);
        (cli, ops)
    }
}

/// Rebuild the order in which -s/-m/-c were given on the command line
///
/// Clap argument indices are positions in the original argument list, so
/// sorting the merged (index, operation) pairs restores interleaving.
pub fn ordered_ops(matches: &ArgMatches) -> Vec<BitOperation> {
    let mut ops: Vec<(usize, BitOperation)> = Vec::new();

    let flags: [(&str, fn(u32) -> BitOperation); 3] = [
        ("set", BitOperation::Set),
        ("mark", BitOperation::Mark),
        ("clear", BitOperation::Clear),
    ];

    for (id, make) in flags {
        if let (Some(indices), Some(values)) = (matches.indices_of(id), matches.get_many::<u32>(id))
        {
            ops.extend(indices.zip(values.copied()).map(|(i, v)| (i, make(v))));
        }
    }

    ops.sort_by_key(|&(index, _)| index);
    ops.into_iter().map(|(_, op)| op).collect()
}
