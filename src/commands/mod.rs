//! Transaction command and report formatting

use smictl_core::{
    describe_bits, run_transaction, BitOperation, MatchStrategy, RawPort, RegisterVariant,
    SysfsBus, TransactionConfig, TransactionOutcome, TransactionReport,
};

use crate::cli::Cli;

/// Run the one transaction this tool performs and print the report
pub fn run(cli: &Cli, ops: Vec<BitOperation>, strategy: &dyn MatchStrategy) -> smictl_core::Result<()> {
    // Privilege first: fail before touching anything else
    let mut port = RawPort::acquire()?;
    let bus = SysfsBus::scan()?;

    let config = TransactionConfig {
        variant: if cli.gpio {
            RegisterVariant::AltGpSmiEn
        } else {
            RegisterVariant::SmiEn
        },
        ops,
        dry_run: cli.dry_run,
    };

    match run_transaction(&bus, strategy, &mut port, &config)? {
        TransactionOutcome::NoMatch => {
            println!("No SMI-enabled chipset found");
            Ok(())
        }
        TransactionOutcome::Done(report) => {
            print_report(&report, cli.verbose > 0, cli.dry_run);
            Ok(())
        }
    }
}

fn print_report(report: &TransactionReport, decode: bool, dry_run: bool) {
    let digits = report.target.width.hex_digits();
    let register = report.target.variant.name();
    // The GPIO variant's bits are board-specific; only decode SMI_EN
    let decode = decode && report.target.variant.is_decodable();

    println!("SMI-enabled chipset found:");
    println!(
        "  {} ({:04x}:{:04x}) at {}",
        report.chipset.label(),
        report.chipset.vendor_id,
        report.chipset.device_id,
        report.bdf
    );
    println!();
    println!(
        "  {} register at {:#06x}: {:0digits$x}",
        register, report.target.io_port, report.initial
    );
    if decode {
        print_bits(report.initial);
    }

    let Some(update) = &report.update else {
        return;
    };

    if dry_run {
        println!(
            "  new value (dry run, not written): {:0digits$x}",
            update.candidate
        );
        if decode {
            print_bits(update.candidate);
        }
        return;
    }

    println!("  new value: {:0digits$x}", update.candidate);
    if let Some(readback) = update.readback {
        println!("  read back: {:0digits$x}", readback);
        if decode {
            print_bits(readback);
        }
        if readback != update.candidate {
            log::warn!(
                "read-back {:0digits$x} differs from the written value; some {} bits are read-only or latched",
                readback,
                register
            );
        }
    }
}

fn print_bits(value: u32) {
    for (name, set) in describe_bits(value) {
        println!("    {:<16} {}", name, u8::from(set));
    }
}
