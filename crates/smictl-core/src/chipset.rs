//! South-bridge identification
//!
//! Two matching policies exist for finding the ICH LPC bridge, both kept
//! behind [`MatchStrategy`]: an explicit device-ID table covering the ICH
//! generations the tool was originally written against, and a structural
//! predicate (Intel ISA bridge in slot 31 function 0) that also covers
//! later parts without a table update.

use crate::pci::{PciBus, PciDevice};
use crate::smi_regs::RegisterWidth;

/// Intel PCI vendor ID
pub const INTEL_VID: u16 = 0x8086;

/// PCI base/sub class of an ISA (LPC) bridge
pub const CLASS_ISA_BRIDGE: u16 = 0x0601;

/// Device slot the LPC bridge occupies on every ICH generation
pub const LPC_BRIDGE_SLOT: u8 = 31;

/// Function number of the LPC bridge
pub const LPC_BRIDGE_FUNCTION: u8 = 0;

/// A chipset entry in the device-ID table
#[derive(Debug, Clone, Copy)]
pub struct ChipsetDescriptor {
    pub vendor_id: u16,
    pub device_id: u16,
    pub vendor_name: &'static str,
    pub device_name: &'static str,
    /// Width of the primary SMI_EN register on this part
    pub smi_en_width: RegisterWidth,
}

impl ChipsetDescriptor {
    const fn new(
        vendor_id: u16,
        device_id: u16,
        vendor_name: &'static str,
        device_name: &'static str,
        smi_en_width: RegisterWidth,
    ) -> Self {
        Self {
            vendor_id,
            device_id,
            vendor_name,
            device_name,
            smi_en_width,
        }
    }
}

// SMI_EN is 16 bits wide on the first ICH pair, 32 bits from ICH2 on.
const W16: RegisterWidth = RegisterWidth::Word;
const W32: RegisterWidth = RegisterWidth::Dword;

/// LPC bridges with a known SMI_EN register, by PCI device ID
pub const CHIPSET_TABLE: &[ChipsetDescriptor] = &[
    ChipsetDescriptor::new(INTEL_VID, 0x2410, "Intel", "82801AA (ICH)", W16),
    ChipsetDescriptor::new(INTEL_VID, 0x2420, "Intel", "82801AB (ICH0)", W16),
    ChipsetDescriptor::new(INTEL_VID, 0x2440, "Intel", "82801BA (ICH2)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x244c, "Intel", "82801BAM (ICH2-M)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x2450, "Intel", "82801E (C-ICH)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x2480, "Intel", "82801CA (ICH3-S)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x248c, "Intel", "82801CAM (ICH3-M)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x24c0, "Intel", "82801DB (ICH4)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x24cc, "Intel", "82801DBM (ICH4-M)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x24d0, "Intel", "82801EB/ER (ICH5)", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x2640, "Intel", "ICH6/ICH6R", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x2641, "Intel", "ICH6-M", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x2642, "Intel", "ICH6W", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x27b8, "Intel", "ICH7/ICH7R", W32),
    ChipsetDescriptor::new(INTEL_VID, 0x27b9, "Intel", "ICH7-M", W32),
];

/// A matched south bridge, ready for address resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedChipset {
    pub vendor_id: u16,
    pub device_id: u16,
    pub vendor_name: String,
    pub device_name: String,
    pub smi_en_width: RegisterWidth,
}

impl MatchedChipset {
    /// Display label falling back to numeric IDs when names are unknown
    pub fn label(&self) -> String {
        if self.vendor_name.is_empty() && self.device_name.is_empty() {
            format!("{:04x}:{:04x}", self.vendor_id, self.device_id)
        } else {
            format!("{}:{}", self.vendor_name, self.device_name)
        }
    }
}

/// Policy deciding whether a bus-enumerated device is the target bridge
///
/// Pure predicate over already-enumerated data; the bus handle is only
/// used for optional name resolution.
pub trait MatchStrategy {
    fn match_device(&self, bus: &dyn PciBus, dev: &PciDevice) -> Option<MatchedChipset>;
}

/// Legacy policy: explicit (vendor, device) lookup in [`CHIPSET_TABLE`]
#[derive(Debug)]
pub struct IdTableMatcher {
    table: &'static [ChipsetDescriptor],
}

impl IdTableMatcher {
    pub fn new() -> Self {
        Self {
            table: CHIPSET_TABLE,
        }
    }
}

impl Default for IdTableMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchStrategy for IdTableMatcher {
    fn match_device(&self, _bus: &dyn PciBus, dev: &PciDevice) -> Option<MatchedChipset> {
        self.table
            .iter()
            .find(|entry| entry.vendor_id == dev.vendor_id && entry.device_id == dev.device_id)
            .map(|entry| MatchedChipset {
                vendor_id: entry.vendor_id,
                device_id: entry.device_id,
                vendor_name: entry.vendor_name.to_string(),
                device_name: entry.device_name.to_string(),
                smi_en_width: entry.smi_en_width,
            })
    }
}

/// Structural policy: Intel ISA bridge in slot 31 function 0
///
/// Matches any ICH2-or-later LPC bridge without needing a table entry,
/// so `smi_en_width` is always the 32-bit layout those parts use.
#[derive(Debug, Default)]
pub struct LpcBridgeMatcher;

impl MatchStrategy for LpcBridgeMatcher {
    fn match_device(&self, bus: &dyn PciBus, dev: &PciDevice) -> Option<MatchedChipset> {
        if dev.vendor_id != INTEL_VID
            || dev.base_class() != CLASS_ISA_BRIDGE
            || dev.device != LPC_BRIDGE_SLOT
            || dev.function != LPC_BRIDGE_FUNCTION
        {
            return None;
        }

        let (vendor_name, device_name) = bus
            .device_names(dev.vendor_id, dev.device_id)
            .unwrap_or_default();

        Some(MatchedChipset {
            vendor_id: dev.vendor_id,
            device_id: dev.device_id,
            vendor_name,
            device_name,
            smi_en_width: RegisterWidth::Dword,
        })
    }
}
