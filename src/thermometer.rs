use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, Result},
    types::DateTime,
};

const FLAG_FAHRENHEIT: u8 = 0x01;
const FLAG_TIMESTAMP: u8 = 0x02;
const FLAG_TEMPERATURE_TYPE: u8 = 0x04;

/// Temperature unit selected by flags bit 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureUnit {
    /// Degrees Celsius
    Celsius,
    /// Degrees Fahrenheit
    Fahrenheit,
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius => write!(f, "°C"),
            Self::Fahrenheit => write!(f, "°F"),
        }
    }
}

/// Measurement site reported with a temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureType {
    /// Armpit
    Armpit,
    /// Body (general)
    Body,
    /// Ear (usually ear lobe)
    Ear,
    /// Finger
    Finger,
    /// Gastro-intestinal tract
    GastroIntestinalTract,
    /// Mouth
    Mouth,
    /// Rectum
    Rectum,
    /// Toe
    Toe,
    /// Tympanum (ear drum)
    Tympanum,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for TemperatureType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Armpit,
            2 => Self::Body,
            3 => Self::Ear,
            4 => Self::Finger,
            5 => Self::GastroIntestinalTract,
            6 => Self::Mouth,
            7 => Self::Rectum,
            8 => Self::Toe,
            9 => Self::Tympanum,
            other => Self::Unknown(other),
        }
    }
}

/// Health Thermometer temperature measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureMeasurement {
    /// Temperature value in `unit`
    pub temperature: f32,
    /// Unit of `temperature`
    pub unit: TemperatureUnit,
    /// Time of the measurement, if reported
    pub timestamp: Option<DateTime>,
    /// Measurement site, if reported
    pub temperature_type: Option<TemperatureType>,
}

impl TemperatureMeasurement {
    /// Decode a Temperature Measurement (or Intermediate Temperature) frame
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::InsufficientData`] if the frame is shorter
    /// than its flags require.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode a frame whose temperature and year use `order`
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected temperature frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 5)?;
        let flags = data[0];
        let timestamp_present = flags & FLAG_TIMESTAMP != 0;
        let type_present = flags & FLAG_TEMPERATURE_TYPE != 0;

        let required = 5
            + if timestamp_present { DateTime::SIZE } else { 0 }
            + usize::from(type_present);
        ensure_len(data, required)?;

        let unit = if flags & FLAG_FAHRENHEIT == 0 {
            TemperatureUnit::Celsius
        } else {
            TemperatureUnit::Fahrenheit
        };

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;
        let temperature = reader.float()?;

        let timestamp = if timestamp_present {
            Some(DateTime::read(&mut reader)?)
        } else {
            None
        };

        let temperature_type = if type_present {
            Some(TemperatureType::from(reader.u8()?))
        } else {
            None
        };

        Ok(Self {
            temperature,
            unit,
            timestamp,
            temperature_type,
        })
    }

    /// Temperature converted to degrees Celsius
    #[must_use]
    pub fn celsius(&self) -> f32 {
        match self.unit {
            TemperatureUnit::Celsius => self.temperature,
            TemperatureUnit::Fahrenheit => (self.temperature - 32.0) * 5.0 / 9.0,
        }
    }
}
