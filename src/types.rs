use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{
    codec::Reader,
    error::{ensure_len, DecodeError, Result},
};

/// Date Time characteristic value embedded in measurement frames
///
/// Year, month and day use zero on the wire to mean "not known"; those
/// decode to `None` rather than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTime {
    /// Calendar year
    pub year: Option<u16>,
    /// Month of the year, 1 = January
    pub month: Option<u8>,
    /// Day of the month
    pub day: Option<u8>,
    /// Hour of the day (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
}

impl DateTime {
    /// Encoded size in bytes
    pub const SIZE: usize = 7;

    /// Decode a date-time from the first seven bytes of `data`
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InsufficientData`] if fewer than seven bytes are available.
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE)?;
        Self::read(&mut Reader::new(data))
    }

    /// Decode a date-time at the reader's position and advance past it
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than seven bytes remain.
    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let year = reader.u16()?;
        let month = reader.u8()?;
        let day = reader.u8()?;

        Ok(Self {
            year: (year > 0).then_some(year),
            month: (month > 0).then_some(month),
            day: (day > 0).then_some(day),
            hour: reader.u8()?,
            minute: reader.u8()?,
            second: reader.u8()?,
        })
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{year:04}")?,
            None => write!(f, "----")?,
        }
        match self.month {
            Some(month) => write!(f, "-{month:02}")?,
            None => write!(f, "---")?,
        }
        match self.day {
            Some(day) => write!(f, "-{day:02}")?,
            None => write!(f, "---")?,
        }
        write!(f, " {:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Sample type of a glucose reading (low nibble of the type/location octet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    /// Capillary whole blood
    CapillaryWholeBlood,
    /// Capillary plasma
    CapillaryPlasma,
    /// Venous whole blood
    VenousWholeBlood,
    /// Venous plasma
    VenousPlasma,
    /// Arterial whole blood
    ArterialWholeBlood,
    /// Arterial plasma
    ArterialPlasma,
    /// Undetermined whole blood
    UndeterminedWholeBlood,
    /// Undetermined plasma
    UndeterminedPlasma,
    /// Interstitial fluid
    InterstitialFluid,
    /// Control solution
    ControlSolution,
    /// Reserved or vendor value
    Unknown(u8),
}

impl From<u8> for SampleType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::CapillaryWholeBlood,
            2 => Self::CapillaryPlasma,
            3 => Self::VenousWholeBlood,
            4 => Self::VenousPlasma,
            5 => Self::ArterialWholeBlood,
            6 => Self::ArterialPlasma,
            7 => Self::UndeterminedWholeBlood,
            8 => Self::UndeterminedPlasma,
            9 => Self::InterstitialFluid,
            10 => Self::ControlSolution,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapillaryWholeBlood => write!(f, "Capillary Whole Blood"),
            Self::CapillaryPlasma => write!(f, "Capillary Plasma"),
            Self::VenousWholeBlood => write!(f, "Venous Whole Blood"),
            Self::VenousPlasma => write!(f, "Venous Plasma"),
            Self::ArterialWholeBlood => write!(f, "Arterial Whole Blood"),
            Self::ArterialPlasma => write!(f, "Arterial Plasma"),
            Self::UndeterminedWholeBlood => write!(f, "Undetermined Whole Blood"),
            Self::UndeterminedPlasma => write!(f, "Undetermined Plasma"),
            Self::InterstitialFluid => write!(f, "Interstitial Fluid (ISF)"),
            Self::ControlSolution => write!(f, "Control Solution"),
            Self::Unknown(value) => write!(f, "Unknown ({value})"),
        }
    }
}

/// Body location a glucose sample was taken from (high nibble of the type/location octet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleLocation {
    /// Finger
    Finger,
    /// Alternate site test
    AlternateSiteTest,
    /// Earlobe
    Earlobe,
    /// Control solution
    ControlSolution,
    /// Subcutaneous tissue
    SubcutaneousTissue,
    /// Location not available
    NotAvailable,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for SampleLocation {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Finger,
            2 => Self::AlternateSiteTest,
            3 => Self::Earlobe,
            4 => Self::ControlSolution,
            5 => Self::SubcutaneousTissue,
            15 => Self::NotAvailable,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for SampleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finger => write!(f, "Finger"),
            Self::AlternateSiteTest => write!(f, "Alternate Site Test (AST)"),
            Self::Earlobe => write!(f, "Earlobe"),
            Self::ControlSolution => write!(f, "Control Solution"),
            Self::SubcutaneousTissue => write!(f, "Subcutaneous Tissue"),
            Self::NotAvailable => write!(f, "Not Available"),
            Self::Unknown(value) => write!(f, "Unknown ({value})"),
        }
    }
}

/// Split a type/location octet into its two nibbles
pub(crate) fn split_type_location(octet: u8) -> (SampleType, SampleLocation) {
    (
        SampleType::from(octet & 0x0F),
        SampleLocation::from(octet >> 4),
    )
}

/// Battery Level characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatteryLevel {
    /// Remaining charge in percent (0-100)
    pub percent: u8,
}

impl BatteryLevel {
    /// Decode a Battery Level frame
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InsufficientData`] for an empty frame and
    /// [`DecodeError::UnrecognizedEnumValue`] for values above 100.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::decode(data).inspect_err(|e| debug!("Rejected battery level {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, 1)?;
        let percent = data[0];
        if percent > 100 {
            return Err(DecodeError::UnrecognizedEnumValue {
                field: "battery level",
                value: u32::from(percent),
            });
        }
        Ok(Self { percent })
    }
}
