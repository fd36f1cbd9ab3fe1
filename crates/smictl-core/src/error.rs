//! Error types for smictl-core

use thiserror::Error;

/// Error type for chipset detection and register access
#[derive(Debug, Error)]
pub enum Error {
    /// Raising the I/O privilege level failed for lack of rights
    #[error("I/O port access denied (root privileges required)")]
    InsufficientPrivilege(#[source] std::io::Error),

    /// Failed to enumerate the PCI bus
    #[error("failed to scan PCI bus")]
    PciScan(#[source] std::io::Error),

    /// Failed to read PCI configuration space
    #[error("failed to read config space of {bdf} at {offset:#04x}")]
    ConfigRead {
        bdf: String,
        offset: u8,
        #[source]
        source: std::io::Error,
    },

    /// An I/O port access failed
    #[error("I/O port {port:#06x} access failed")]
    PortIo {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Operation not available on this platform
    #[error("not supported: {0}")]
    NotSupported(&'static str),
}

/// Result type for smictl-core operations
pub type Result<T> = core::result::Result<T, Error>;
