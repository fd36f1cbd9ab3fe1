//! PCI device scanning and access
//!
//! This module provides PCI device scanning using the Linux sysfs
//! interface (/sys/bus/pci/devices), behind the [`PciBus`] trait so the
//! rest of the crate can be exercised against an in-memory bus in tests.

#[cfg(target_os = "linux")]
use std::fs;
#[cfg(target_os = "linux")]
use std::path::Path;

use crate::error::{Error, Result};

/// PCI device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciDevice {
    /// PCI domain (usually 0)
    pub domain: u16,
    /// PCI bus number
    pub bus: u8,
    /// PCI device (slot) number
    pub device: u8,
    /// PCI function number
    pub function: u8,
    /// Vendor ID
    pub vendor_id: u16,
    /// Device ID
    pub device_id: u16,
    /// Class code (3 bytes, upper 24 bits)
    pub class: u32,
}

impl PciDevice {
    /// Get the BDF (Bus:Device.Function) string
    pub fn bdf(&self) -> String {
        format!("{:02x}:{:02x}.{:x}", self.bus, self.device, self.function)
    }

    /// Base and sub class (upper 16 bits of the class code)
    pub fn base_class(&self) -> u16 {
        (self.class >> 8) as u16
    }
}

/// Access to an enumerated PCI bus
///
/// The production implementation is [`SysfsBus`]; tests substitute a fake
/// with canned devices and config bytes.
pub trait PciBus {
    /// All devices, in enumeration order
    fn devices(&self) -> &[PciDevice];

    /// Read one byte from a device's configuration space
    fn read_config8(&self, dev: &PciDevice, offset: u8) -> Result<u8>;

    /// Resolve human-readable vendor/device names, if known
    ///
    /// Name lookup is best-effort; `None` means the caller should fall
    /// back to numeric IDs.
    fn device_names(&self, vendor_id: u16, device_id: u16) -> Option<(String, String)> {
        let _ = (vendor_id, device_id);
        None
    }
}

/// PCI bus access through the Linux sysfs tree
#[cfg(target_os = "linux")]
pub struct SysfsBus {
    devices: Vec<PciDevice>,
}

#[cfg(target_os = "linux")]
impl SysfsBus {
    /// Scan /sys/bus/pci/devices once and capture the device list
    ///
    /// Devices are sorted by domain/bus/device/function so that
    /// "first match" is deterministic across runs.
    pub fn scan() -> Result<Self> {
        let pci_path = Path::new("/sys/bus/pci/devices");

        let entries = fs::read_dir(pci_path).map_err(Error::PciScan)?;

        let mut devices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Error::PciScan)?;
            let name = entry.file_name();

            if let Some(dev) = parse_sysfs_device(&entry.path(), &name.to_string_lossy()) {
                devices.push(dev);
            }
        }

        devices.sort_by_key(|d| (d.domain, d.bus, d.device, d.function));
        log::debug!("scanned {} PCI devices", devices.len());

        Ok(Self { devices })
    }
}

#[cfg(target_os = "linux")]
impl PciBus for SysfsBus {
    fn devices(&self) -> &[PciDevice] {
        &self.devices
    }

    fn read_config8(&self, dev: &PciDevice, offset: u8) -> Result<u8> {
        use std::io::{Read, Seek, SeekFrom};

        let path = format!(
            "/sys/bus/pci/devices/{:04x}:{:02x}:{:02x}.{:x}/config",
            dev.domain, dev.bus, dev.device, dev.function
        );

        let mut file = fs::File::open(&path).map_err(|source| Error::ConfigRead {
            bdf: dev.bdf(),
            offset,
            source,
        })?;

        file.seek(SeekFrom::Start(offset as u64))
            .map_err(|source| Error::ConfigRead {
                bdf: dev.bdf(),
                offset,
                source,
            })?;

        let mut buf = [0u8; 1];
        file.read_exact(&mut buf)
            .map_err(|source| Error::ConfigRead {
                bdf: dev.bdf(),
                offset,
                source,
            })?;

        Ok(buf[0])
    }

    fn device_names(&self, vendor_id: u16, device_id: u16) -> Option<(String, String)> {
        lookup_pci_ids(vendor_id, device_id)
    }
}

/// Parse a device entry name of the form "0000:00:1f.0"
#[cfg(target_os = "linux")]
fn parse_sysfs_device(path: &Path, name: &str) -> Option<PciDevice> {
    let mut parts = name.split(':');
    let domain = u16::from_str_radix(parts.next()?, 16).ok()?;
    let bus = u8::from_str_radix(parts.next()?, 16).ok()?;

    let mut dev_func = parts.next()?.split('.');
    let device = u8::from_str_radix(dev_func.next()?, 16).ok()?;
    let function = u8::from_str_radix(dev_func.next()?, 16).ok()?;

    let vendor_id = read_sysfs_hex(&path.join("vendor"))? as u16;
    let device_id = read_sysfs_hex(&path.join("device"))? as u16;
    // Class is optional in principle; a device without it is useless to us
    let class = read_sysfs_hex(&path.join("class")).unwrap_or(0);

    Some(PciDevice {
        domain,
        bus,
        device,
        function,
        vendor_id,
        device_id,
        class,
    })
}

/// Read a hex value from a sysfs attribute file (with or without "0x")
#[cfg(target_os = "linux")]
fn read_sysfs_hex(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    let content = content.trim();
    let hex_str = content.strip_prefix("0x").unwrap_or(content);
    u32::from_str_radix(hex_str, 16).ok()
}

/// Well-known locations of the pci.ids database
#[cfg(target_os = "linux")]
const PCI_IDS_PATHS: &[&str] = &[
    "/usr/share/hwdata/pci.ids",
    "/usr/share/misc/pci.ids",
    "/usr/share/pci.ids",
];

/// Resolve vendor/device names from the system pci.ids database
///
/// The database format is one vendor per unindented line
/// (`8086  Intel Corporation`) followed by tab-indented device lines
/// (`\t2440  82801BA ISA Bridge`). Lookup is best-effort: a missing or
/// malformed database yields `None`.
#[cfg(target_os = "linux")]
fn lookup_pci_ids(vendor_id: u16, device_id: u16) -> Option<(String, String)> {
    let content = PCI_IDS_PATHS
        .iter()
        .find_map(|path| fs::read_to_string(path).ok())?;

    let vendor_prefix = format!("{:04x}", vendor_id);
    let device_prefix = format!("\t{:04x}", device_id);

    let mut vendor_name: Option<String> = None;
    for line in content.lines() {
        if line.starts_with('#') {
            continue;
        }

        if let Some(found) = &vendor_name {
            if line.starts_with(&device_prefix) {
                let device_name = line[device_prefix.len()..].trim().to_string();
                return Some((found.clone(), device_name));
            }
            // Vendor blocks are contiguous: the next unindented line ends ours
            if !line.starts_with('\t') {
                log::warn!(
                    "pci.ids has no entry for device {:04x}:{:04x}",
                    vendor_id,
                    device_id
                );
                return None;
            }
        } else if line.starts_with(&vendor_prefix) {
            vendor_name = Some(line[vendor_prefix.len()..].trim().to_string());
        }
    }

    None
}

// Non-Linux stub
#[cfg(not(target_os = "linux"))]
pub struct SysfsBus {
    devices: Vec<PciDevice>,
}

#[cfg(not(target_os = "linux"))]
impl SysfsBus {
    pub fn scan() -> Result<Self> {
        Err(Error::NotSupported(
            "PCI scanning is only supported on Linux",
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl PciBus for SysfsBus {
    fn devices(&self) -> &[PciDevice] {
        &self.devices
    }

    fn read_config8(&self, _dev: &PciDevice, _offset: u8) -> Result<u8> {
        Err(Error::NotSupported(
            "PCI config access is only supported on Linux",
        ))
    }
}
