use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, DecodeError, Result},
};

const FLAG_HEART_RATE_16BIT: u8 = 0x01;
const FLAG_CONTACT_DETECTED: u8 = 0x02;
const FLAG_CONTACT_SUPPORTED: u8 = 0x04;
const FLAG_ENERGY_EXPENDED: u8 = 0x08;
const FLAG_RR_INTERVALS: u8 = 0x10;
const FLAGS_RESERVED: u8 = 0xE0;

/// Heart Rate Measurement record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateMeasurement {
    /// Heart rate in beats per minute
    pub heart_rate: u16,
    /// True only when contact detection is supported and skin contact is detected
    pub sensor_contact: bool,
    /// Accumulated energy expended in kilojoules
    pub energy_expended: Option<u16>,
    /// RR intervals in 1/1024 s units, in transmission order
    pub rr_intervals: Vec<u16>,
}

impl HeartRateMeasurement {
    /// Decode a Heart Rate Measurement notification
    ///
    /// Flags layout:
    /// - Bit 0: heart rate is u16 (otherwise u8)
    /// - Bits 1-2: sensor contact detected / supported
    /// - Bit 3: energy expended (u16) present
    /// - Bit 4: one or more RR intervals (u16 each) fill the rest of the frame
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ReservedFlagsSet`] if bits 5-7 are set, or
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
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected heart rate frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 2)?;
        let flags = data[0];
        if flags & FLAGS_RESERVED != 0 {
            return Err(DecodeError::ReservedFlagsSet { flags });
        }

        let wide = flags & FLAG_HEART_RATE_16BIT != 0;
        let energy_present = flags & FLAG_ENERGY_EXPENDED != 0;
        let rr_present = flags & FLAG_RR_INTERVALS != 0;

        let required = 1
            + if wide { 2 } else { 1 }
            + if energy_present { 2 } else { 0 }
            + if rr_present { 2 } else { 0 };
        ensure_len(data, required)?;

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;

        let heart_rate = if wide {
            reader.u16()?
        } else {
            u16::from(reader.u8()?)
        };

        let energy_expended = if energy_present {
            Some(reader.u16()?)
        } else {
            None
        };

        let mut rr_intervals = Vec::new();
        if rr_present {
            let count = reader.remaining() / 2;
            rr_intervals.reserve(count);
            for _ in 0..count {
                rr_intervals.push(reader.u16()?);
            }
        }

        let contact_bits = FLAG_CONTACT_SUPPORTED | FLAG_CONTACT_DETECTED;

        Ok(Self {
            heart_rate,
            sensor_contact: flags & contact_bits == contact_bits,
            energy_expended,
            rr_intervals,
        })
    }

    /// RR intervals converted to milliseconds
    #[must_use]
    pub fn rr_intervals_ms(&self) -> Vec<f32> {
        self.rr_intervals
            .iter()
            .map(|interval| f32::from(*interval) * 1000.0 / 1024.0)
            .collect()
    }
}

/// Body Sensor Location characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodySensorLocation {
    /// Other location
    Other,
    /// Chest strap
    Chest,
    /// Wrist
    Wrist,
    /// Finger
    Finger,
    /// Hand
    Hand,
    /// Ear lobe
    EarLobe,
    /// Foot
    Foot,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for BodySensorLocation {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Other,
            1 => Self::Chest,
            2 => Self::Wrist,
            3 => Self::Finger,
            4 => Self::Hand,
            5 => Self::EarLobe,
            6 => Self::Foot,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for BodySensorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other => write!(f, "Other"),
            Self::Chest => write!(f, "Chest"),
            Self::Wrist => write!(f, "Wrist"),
            Self::Finger => write!(f, "Finger"),
            Self::Hand => write!(f, "Hand"),
            Self::EarLobe => write!(f, "Ear Lobe"),
            Self::Foot => write!(f, "Foot"),
            Self::Unknown(value) => write!(f, "Unknown ({value})"),
        }
    }
}

impl BodySensorLocation {
    /// Decode a Body Sensor Location read
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InsufficientData`] for an empty frame.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::decode(data)
            .inspect_err(|e| debug!("Rejected body sensor location {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, 1)?;
        Ok(Self::from(data[0]))
    }
}
