use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, DecodeError, Result},
};

const FLAG_STRIDE_LENGTH: u8 = 0x01;
const FLAG_TOTAL_DISTANCE: u8 = 0x02;
const FLAG_RUNNING: u8 = 0x04;
const FLAGS_RESERVED: u8 = 0xF8;

/// RSC Measurement record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningCadence {
    /// Whether the user is running (otherwise walking)
    pub running: bool,
    /// Instantaneous speed in m/s
    pub speed: f32,
    /// Instantaneous cadence in steps per minute
    pub cadence: u8,
    /// Instantaneous stride length in centimetres
    pub stride_length: Option<u16>,
    /// Total distance in decimetres
    pub total_distance: Option<u32>,
}

impl RunningCadence {
    /// Decode an RSC Measurement notification
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ReservedFlagsSet`] if bits 3-7 are set, or
    /// [`DecodeError::InsufficientData`] if the frame is shorter than its flags require.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode with multi-byte fields in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order).inspect_err(|e| debug!("Rejected RSC frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 4)?;
        let flags = data[0];
        if flags & FLAGS_RESERVED != 0 {
            return Err(DecodeError::ReservedFlagsSet { flags });
        }

        let stride_present = flags & FLAG_STRIDE_LENGTH != 0;
        let distance_present = flags & FLAG_TOTAL_DISTANCE != 0;
        let required = 4
            + if stride_present { 2 } else { 0 }
            + if distance_present { 4 } else { 0 };
        ensure_len(data, required)?;

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;
        let speed = f32::from(reader.u16()?) / 256.0;
        let cadence = reader.u8()?;

        let stride_length = if stride_present {
            Some(reader.u16()?)
        } else {
            None
        };
        let total_distance = if distance_present {
            Some(reader.u32()?)
        } else {
            None
        };

        Ok(Self {
            running: flags & FLAG_RUNNING != 0,
            speed,
            cadence,
            stride_length,
            total_distance,
        })
    }

    /// Total distance in metres, if reported
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_distance_m(&self) -> Option<f32> {
        self.total_distance.map(|dm| dm as f32 / 10.0)
    }

    /// Pace in minutes per kilometre, or `None` when standing still
    #[must_use]
    pub fn pace_min_per_km(&self) -> Option<f32> {
        (self.speed > 0.0).then(|| 1000.0 / self.speed / 60.0)
    }
}
