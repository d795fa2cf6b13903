use thiserror::Error;

/// Errors that can occur while decoding a sensor payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The flags (or a declared size) imply more bytes than the buffer holds
    #[error("Insufficient data: need {required} bytes, got {actual}")]
    InsufficientData {
        /// Bytes required by the frame layout
        required: usize,
        /// Bytes actually received
        actual: usize,
    },

    /// A fixed-size frame arrived with the wrong length
    #[error("Unexpected frame length: expected {expected} bytes, got {actual}")]
    UnexpectedLength {
        /// Length mandated by the frame layout
        expected: usize,
        /// Length actually received
        actual: usize,
    },

    /// A primitive read was attempted past the end of the buffer
    #[error("Read of {width} bytes at offset {offset} exceeds buffer of {len} bytes")]
    OutOfRange {
        /// Offset of the attempted read
        offset: usize,
        /// Width of the attempted read
        width: usize,
        /// Length of the buffer
        len: usize,
    },

    /// Reserved bits are set in the flags field
    #[error("Reserved flag bits set: {flags:#04X}")]
    ReservedFlagsSet {
        /// The offending flags value
        flags: u8,
    },

    /// The flags field describes a layout that cannot exist
    #[error("Invalid flag combination {flags:#04X}: {reason}")]
    InvalidFlagCombination {
        /// The offending flags value
        flags: u8,
        /// Why the combination is rejected
        reason: &'static str,
    },

    /// A CRC (or the CRC placeholder) did not match
    #[error("Checksum mismatch: expected {expected:#06X}, computed {actual:#06X}")]
    ChecksumMismatch {
        /// Value carried on the wire
        expected: u16,
        /// Value computed over the received bytes
        actual: u16,
    },

    /// A discriminator byte has no defined meaning
    #[error("Unrecognized {field} value: {value:#04X}")]
    UnrecognizedEnumValue {
        /// Name of the field being decoded
        field: &'static str,
        /// The raw value received
        value: u32,
    },

    /// Invalid configuration value
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

impl DecodeError {
    /// Check if this error was caused by a truncated or oversized buffer
    #[must_use]
    pub const fn is_length_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::UnexpectedLength { .. } | Self::OutOfRange { .. }
        )
    }

    /// Check if this error was raised by an integrity check
    #[must_use]
    pub const fn is_checksum_error(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Check if this error was raised by the flags field
    #[must_use]
    pub const fn is_flags_error(&self) -> bool {
        matches!(
            self,
            Self::ReservedFlagsSet { .. } | Self::InvalidFlagCombination { .. }
        )
    }
}

/// Errors raised by the Bluetooth bridge
#[cfg(feature = "ble")]
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Bluetooth communication errors
    #[error("Bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),

    /// The peripheral exposes none of the decodable characteristics
    #[error("No decodable characteristic found on peripheral")]
    NoDecodableCharacteristic,
}

/// Fail with [`DecodeError::InsufficientData`] unless `data` holds at least `required` bytes.
pub(crate) const fn ensure_len(data: &[u8], required: usize) -> Result<()> {
    if data.len() < required {
        return Err(DecodeError::InsufficientData {
            required,
            actual: data.len(),
        });
    }
    Ok(())
}
