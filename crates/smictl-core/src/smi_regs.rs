//! ICH power-management register map
//!
//! The SMI control registers live in the chipset's ACPI/PM I/O window.
//! The window's base address (PMBASE) is programmed by the BIOS into two
//! configuration-space bytes of the LPC bridge; only bits 7-15 are
//! significant, split across the top bit of the first byte and all of the
//! second.
//!
//! # Register Layout
//!
//! - SMI_EN at PMBASE + 0x30: 16 bits on the original ICH pair, 32 bits
//!   from ICH2 on
//! - SMI_STS at PMBASE + 0x34: status companion to SMI_EN
//! - ALT_GP_SMI_EN at PMBASE + 0x38: 16 bits, GPIO-event SMI enables
//! - SMI monitor region at PMBASE + 0x40: device monitor traps

use bitflags::bitflags;

use crate::chipset::MatchedChipset;
use crate::error::Result;
use crate::pci::{PciBus, PciDevice};

/// Config-space offset of the low PMBASE byte
pub const PMBASE_B0: u8 = 0x40;
/// Config-space offset of the high PMBASE byte
pub const PMBASE_B1: u8 = 0x41;

/// Offset of SMI_EN within the PM I/O window
pub const SMI_EN_OFFSET: u16 = 0x30;
/// Offset of SMI_STS within the PM I/O window
pub const SMI_STS_OFFSET: u16 = 0x34;
/// Offset of ALT_GP_SMI_EN within the PM I/O window
pub const ALT_GP_SMI_EN_OFFSET: u16 = 0x38;
/// Offset of the SMI monitor region within the PM I/O window
pub const SMI_MON_OFFSET: u16 = 0x40;

bitflags! {
    /// Known SMI_EN bits (ICH2 layout; later generations keep these)
    ///
    /// GBL_SMI_EN is reset by a PCI reset event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SmiEnable: u32 {
        /// Intel-specific USB2 SMI (ICH4 and later)
        const INTEL_USB2_EN = 1 << 18;
        /// Legacy USB2 keyboard/mouse emulation SMI (ICH4 and later)
        const LEGACY_USB2_EN = 1 << 17;
        /// Periodic timer SMI (called 1MIN_ on ICH0)
        const PERIODIC_EN = 1 << 14;
        /// TCO watchdog SMI
        const TCO_EN = 1 << 13;
        /// Microcontroller SMI
        const MCSMI_EN = 1 << 11;
        /// Software SMI timer
        const SWSMI_TMR_EN = 1 << 6;
        /// APM control port SMI
        const APMC_EN = 1 << 5;
        /// Sleep-state entry SMI
        const SLP_EN = 1 << 4;
        /// Legacy USB keyboard/mouse emulation SMI
        const LEGACY_USB_EN = 1 << 3;
        /// BIOS write-enable SMI
        const BIOS_EN = 1 << 2;
        /// Global SMI enable
        const GBL_SMI_EN = 1 << 0;
    }
}

/// Which SMI enable register a transaction targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterVariant {
    /// The primary SMI_EN register
    #[default]
    SmiEn,
    /// The alternate GPIO-event register, ALT_GP_SMI_EN
    AltGpSmiEn,
}

impl RegisterVariant {
    /// Hardware name, as printed in reports
    pub fn name(self) -> &'static str {
        match self {
            Self::SmiEn => "SMI_EN",
            Self::AltGpSmiEn => "ALT_GP_SMI_EN",
        }
    }

    /// The per-bit breakdown only applies to the primary register; the
    /// GPIO variant's bits are board-specific and not decoded here.
    pub fn is_decodable(self) -> bool {
        matches!(self, Self::SmiEn)
    }
}

/// Access width of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWidth {
    /// 16-bit access
    Word,
    /// 32-bit access
    Dword,
}

impl RegisterWidth {
    /// Hex digits needed to print a value at this width
    pub fn hex_digits(self) -> usize {
        match self {
            Self::Word => 4,
            Self::Dword => 8,
        }
    }
}

/// A resolved register, ready for port I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterTarget {
    /// Absolute I/O port address
    pub io_port: u16,
    /// Access width (drives 2- vs 4-byte port cycles and hex padding)
    pub width: RegisterWidth,
    /// Which register this is
    pub variant: RegisterVariant,
}

/// Reassemble PMBASE bits 7-15 from the two config bytes
pub fn pmbase_from_bytes(byte0: u8, byte1: u8) -> u16 {
    (((byte1 as u16) << 1) | ((byte0 as u16) >> 7)) << 7
}

/// Resolve the I/O port of the requested SMI register on a matched bridge
pub fn resolve_target(
    bus: &dyn PciBus,
    dev: &PciDevice,
    chipset: &MatchedChipset,
    variant: RegisterVariant,
) -> Result<RegisterTarget> {
    let byte0 = bus.read_config8(dev, PMBASE_B0)?;
    let byte1 = bus.read_config8(dev, PMBASE_B1)?;
    let base = pmbase_from_bytes(byte0, byte1);

    let (io_port, width) = match variant {
        RegisterVariant::SmiEn => (base + SMI_EN_OFFSET, chipset.smi_en_width),
        RegisterVariant::AltGpSmiEn => (base + ALT_GP_SMI_EN_OFFSET, RegisterWidth::Word),
    };

    log::debug!(
        "PMBASE {:#06x}, {} at {:#06x}",
        base,
        variant.name(),
        io_port
    );

    Ok(RegisterTarget {
        io_port,
        width,
        variant,
    })
}

/// Break a register value down into (bit name, is set) pairs
///
/// Pairs come out in the fixed table order above, all eleven every time.
pub fn describe_bits(value: u32) -> Vec<(&'static str, bool)> {
    let flags = SmiEnable::from_bits_retain(value);
    SmiEnable::all()
        .iter_names()
        .map(|(name, bit)| (name, flags.contains(bit)))
        .collect()
}
