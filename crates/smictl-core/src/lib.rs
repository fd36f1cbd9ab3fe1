//! smictl-core - Intel ICH chipset detection and SMI register control
//!
//! This crate holds everything smictl knows about the hardware: finding
//! the ICH LPC bridge on the PCI bus, deriving the SMI_EN register's I/O
//! port from the PMBASE configuration bytes, and mutating the register's
//! enable bits in one read-modify-write pass.
//!
//! # Architecture
//!
//! The two hardware touchpoints are behind traits so the transaction
//! logic runs unchanged against fakes in tests:
//!
//! - [`pci::PciBus`] - bus enumeration, config-space byte reads, and
//!   best-effort name lookup; production implementation [`pci::SysfsBus`]
//!   reads the Linux sysfs PCI tree
//! - [`portio::PortIo`] - 8/16/32-bit port I/O; production implementation
//!   [`portio::RawPort`] raises IOPL once and issues IN/OUT instructions
//!
//! Chipset matching is a [`chipset::MatchStrategy`]: either the legacy
//! ICH device-ID table or the structural LPC-bridge predicate.

pub mod chipset;
pub mod error;
pub mod pci;
pub mod portio;
pub mod smi_regs;
pub mod transaction;
pub mod update;

pub use chipset::{IdTableMatcher, LpcBridgeMatcher, MatchStrategy, MatchedChipset};
pub use error::{Error, Result};
pub use pci::{PciBus, PciDevice, SysfsBus};
pub use portio::{PortIo, RawPort};
pub use smi_regs::{describe_bits, RegisterTarget, RegisterVariant, RegisterWidth, SmiEnable};
pub use transaction::{
    run_transaction, TransactionConfig, TransactionOutcome, TransactionReport,
};
pub use update::{apply, BitOperation};
