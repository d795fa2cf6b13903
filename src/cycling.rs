use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, DecodeError, Result},
};

const FLAG_WHEEL_DATA: u8 = 0x01;
const FLAG_CRANK_DATA: u8 = 0x02;
const FLAGS_RESERVED: u8 = 0xFC;

/// Event times tick at 1/1024 s
pub const EVENT_TIME_RESOLUTION: f32 = 1024.0;

/// Cumulative wheel revolutions and the time of the last wheel event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WheelData {
    /// Cumulative wheel revolutions
    pub revolutions: u32,
    /// Time of the last wheel event in 1/1024 s, wraps at 65536
    pub event_time: u16,
}

/// Cumulative crank revolutions and the time of the last crank event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrankData {
    /// Cumulative crank revolutions, wraps at 65536
    pub revolutions: u16,
    /// Time of the last crank event in 1/1024 s, wraps at 65536
    pub event_time: u16,
}

/// Raw counters carried by a CSC Measurement notification
///
/// Speed, distance and cadence are derived across consecutive samples by
/// [`crate::session::CadenceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CscMeasurement {
    /// Wheel revolution data, if present
    pub wheel: Option<WheelData>,
    /// Crank revolution data, if present
    pub crank: Option<CrankData>,
}

impl CscMeasurement {
    /// Decode a CSC Measurement notification
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ReservedFlagsSet`] if bits 2-7 are set, or
    /// [`DecodeError::InsufficientData`] if the frame is shorter than its flags require.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode with the counters in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order).inspect_err(|e| debug!("Rejected CSC frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 1)?;
        let flags = data[0];
        if flags & FLAGS_RESERVED != 0 {
            return Err(DecodeError::ReservedFlagsSet { flags });
        }

        let wheel_present = flags & FLAG_WHEEL_DATA != 0;
        let crank_present = flags & FLAG_CRANK_DATA != 0;
        let required = 1
            + if wheel_present { 6 } else { 0 }
            + if crank_present { 4 } else { 0 };
        ensure_len(data, required)?;

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;

        let wheel = if wheel_present {
            Some(WheelData {
                revolutions: reader.u32()?,
                event_time: reader.u16()?,
            })
        } else {
            None
        };

        let crank = if crank_present {
            Some(CrankData {
                revolutions: reader.u16()?,
                event_time: reader.u16()?,
            })
        } else {
            None
        };

        Ok(Self { wheel, crank })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_and_crank() {
        let data = [
            0x03, 0xE8, 0x03, 0x00, 0x00, 0xC8, 0x00, 0x2A, 0x00, 0x00, 0x04,
        ];
        let record = CscMeasurement::parse(&data).unwrap();

        assert_eq!(
            record.wheel,
            Some(WheelData {
                revolutions: 1000,
                event_time: 200
            })
        );
        assert_eq!(
            record.crank,
            Some(CrankData {
                revolutions: 42,
                event_time: 1024
            })
        );
    }

    #[test]
    fn test_big_endian_counters() {
        let data = [
            0x03, 0x00, 0x00, 0x03, 0xE8, 0x00, 0xC8, 0x00, 0x2A, 0x04, 0x00,
        ];
        let record = CscMeasurement::parse_with_order(&data, ByteOrder::BigEndian).unwrap();

        assert_eq!(
            record.wheel,
            Some(WheelData {
                revolutions: 1000,
                event_time: 200
            })
        );
        assert_eq!(
            record.crank,
            Some(CrankData {
                revolutions: 42,
                event_time: 1024
            })
        );
    }

    #[test]
    fn test_crank_only() {
        let record = CscMeasurement::parse(&[0x02, 0x10, 0x00, 0xFF, 0xFF]).unwrap();

        assert_eq!(record.wheel, None);
        assert_eq!(
            record.crank,
            Some(CrankData {
                revolutions: 16,
                event_time: 0xFFFF
            })
        );
    }

    #[test]
    fn test_empty_flags_is_valid() {
        assert_eq!(CscMeasurement::parse(&[0x00]), Ok(CscMeasurement::default()));
    }

    #[test]
    fn test_invalid_frames_rejected() {
        assert!(CscMeasurement::parse(&[]).is_err());
        assert!(CscMeasurement::parse(&[0x01, 0xE8, 0x03, 0x00, 0x00, 0xC8]).is_err());
        assert!(CscMeasurement::parse(&[0x03, 0xE8, 0x03, 0x00, 0x00, 0xC8, 0x00]).is_err());
        assert!(CscMeasurement::parse(&[0x04]).unwrap_err().is_flags_error());
    }
}
