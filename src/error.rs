use core::fmt;

/// Errors raised while constructing an input driver.
///
/// A constructor that returns one of these has not touched the hardware
/// beyond the failed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Configuration values are inconsistent (zero debounce, long >= very long...).
    InvalidConfig(&'static str),
    /// The GPIO level could not be read.
    Gpio,
    /// The capacitive sensor did not return a usable baseline.
    Touch,
}

/// Errors reported by a [`Storage`](crate::storage::Storage) backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing stored yet under the requested key.
    NotFound,
    /// Stored blob failed validation.
    Corrupt,
    /// Backend write failed.
    Write,
    /// Backend read failed.
    Read,
}

/// Errors raised when decoding a [`SyncMessage`](crate::sync::SyncMessage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame length differs from [`SYNC_MESSAGE_LEN`](crate::sync::SYNC_MESSAGE_LEN).
    Length(usize),
    /// First byte is not the sync magic.
    Magic(u8),
    /// Protocol version is not supported.
    Version(u8),
    /// Command kind is unknown.
    Kind(u8),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid input config: {}", reason),
            Self::Gpio => f.write_str("gpio read failed"),
            Self::Touch => f.write_str("touch sensor read failed"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("no stored value"),
            Self::Corrupt => f.write_str("stored value is corrupt"),
            Self::Write => f.write_str("storage write failed"),
            Self::Read => f.write_str("storage read failed"),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(len) => write!(f, "unexpected sync frame length {}", len),
            Self::Magic(byte) => write!(f, "bad sync magic {:#04x}", byte),
            Self::Version(version) => write!(f, "unsupported sync version {}", version),
            Self::Kind(kind) => write!(f, "unknown command kind {}", kind),
        }
    }
}
