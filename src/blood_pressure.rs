use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, Result},
    types::DateTime,
};

const FLAG_KPA: u8 = 0x01;
const FLAG_TIMESTAMP: u8 = 0x02;
const FLAG_PULSE_RATE: u8 = 0x04;
const FLAG_USER_ID: u8 = 0x08;
const FLAG_STATUS: u8 = 0x10;

/// Pressure unit selected by flags bit 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureUnit {
    /// Millimetres of mercury
    MmHg,
    /// Kilopascal
    KPa,
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MmHg => write!(f, "mmHg"),
            Self::KPa => write!(f, "kPa"),
        }
    }
}

/// Pulse rate range reported in status bits 3-4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PulseRateRange {
    /// Pulse rate within range
    InRange,
    /// Pulse rate exceeds upper limit
    AboveUpperLimit,
    /// Pulse rate below lower limit
    BelowLowerLimit,
    /// Reserved encoding
    Reserved,
}

/// Blood Pressure Measurement Status bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BpmStatus(pub u16);

impl BpmStatus {
    /// Body movement detected during measurement
    #[must_use]
    pub const fn body_movement_detected(self) -> bool {
        self.0 & 0x0001 != 0
    }

    /// Cuff fit too loose
    #[must_use]
    pub const fn cuff_too_loose(self) -> bool {
        self.0 & 0x0002 != 0
    }

    /// Irregular pulse detected
    #[must_use]
    pub const fn irregular_pulse_detected(self) -> bool {
        self.0 & 0x0004 != 0
    }

    /// Pulse rate range detection
    #[must_use]
    pub const fn pulse_rate_range(self) -> PulseRateRange {
        match (self.0 >> 3) & 0x03 {
            0 => PulseRateRange::InRange,
            1 => PulseRateRange::AboveUpperLimit,
            2 => PulseRateRange::BelowLowerLimit,
            _ => PulseRateRange::Reserved,
        }
    }

    /// Improper measurement position detected
    #[must_use]
    pub const fn improper_measurement_position(self) -> bool {
        self.0 & 0x0020 != 0
    }
}

#[derive(Debug, Default)]
struct Trailer {
    timestamp: Option<DateTime>,
    pulse_rate: Option<f32>,
    user_id: Option<u8>,
    status: Option<BpmStatus>,
}

fn required_len(flags: u8) -> usize {
    let mut required = 7;
    if flags & FLAG_TIMESTAMP != 0 {
        required += DateTime::SIZE;
    }
    if flags & FLAG_PULSE_RATE != 0 {
        required += 2;
    }
    if flags & FLAG_USER_ID != 0 {
        required += 1;
    }
    if flags & FLAG_STATUS != 0 {
        required += 2;
    }
    required
}

const fn unit(flags: u8) -> PressureUnit {
    if flags & FLAG_KPA == 0 {
        PressureUnit::MmHg
    } else {
        PressureUnit::KPa
    }
}

fn read_trailer(flags: u8, reader: &mut Reader<'_>) -> Result<Trailer> {
    let mut trailer = Trailer::default();
    if flags & FLAG_TIMESTAMP != 0 {
        trailer.timestamp = Some(DateTime::read(reader)?);
    }
    if flags & FLAG_PULSE_RATE != 0 {
        trailer.pulse_rate = Some(reader.sfloat()?);
    }
    if flags & FLAG_USER_ID != 0 {
        trailer.user_id = Some(reader.u8()?);
    }
    if flags & FLAG_STATUS != 0 {
        trailer.status = Some(BpmStatus(reader.u16()?));
    }
    Ok(trailer)
}

/// Blood Pressure Measurement record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureMeasurement {
    /// Systolic pressure
    pub systolic: f32,
    /// Diastolic pressure
    pub diastolic: f32,
    /// Mean arterial pressure
    pub mean_arterial_pressure: f32,
    /// Unit of the three pressures
    pub unit: PressureUnit,
    /// Time of the measurement
    pub timestamp: Option<DateTime>,
    /// Pulse rate in beats per minute
    pub pulse_rate: Option<f32>,
    /// User index on multi-user devices (255 = unknown user)
    pub user_id: Option<u8>,
    /// Measurement status bits
    pub status: Option<BpmStatus>,
}

impl BloodPressureMeasurement {
    /// Decode a Blood Pressure Measurement indication
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::InsufficientData`] if the frame is shorter
    /// than its flags require.
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
            .inspect_err(|e| debug!("Rejected blood pressure frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 7)?;
        let flags = data[0];
        ensure_len(data, required_len(flags))?;

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;
        let systolic = reader.sfloat()?;
        let diastolic = reader.sfloat()?;
        let mean_arterial_pressure = reader.sfloat()?;
        let trailer = read_trailer(flags, &mut reader)?;

        Ok(Self {
            systolic,
            diastolic,
            mean_arterial_pressure,
            unit: unit(flags),
            timestamp: trailer.timestamp,
            pulse_rate: trailer.pulse_rate,
            user_id: trailer.user_id,
            status: trailer.status,
        })
    }
}

/// Intermediate Cuff Pressure record, streamed while the cuff inflates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntermediateCuffPressure {
    /// Current cuff pressure
    pub cuff_pressure: f32,
    /// Unit of `cuff_pressure`
    pub unit: PressureUnit,
    /// Time of the sample
    pub timestamp: Option<DateTime>,
    /// Pulse rate in beats per minute
    pub pulse_rate: Option<f32>,
    /// User index on multi-user devices
    pub user_id: Option<u8>,
    /// Measurement status bits
    pub status: Option<BpmStatus>,
}

impl IntermediateCuffPressure {
    /// Decode an Intermediate Cuff Pressure notification
    ///
    /// The two pressure fields after the cuff pressure are unused and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::InsufficientData`] if the frame is shorter
    /// than its flags require.
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
            .inspect_err(|e| debug!("Rejected cuff pressure frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 7)?;
        let flags = data[0];
        ensure_len(data, required_len(flags))?;

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;
        let cuff_pressure = reader.sfloat()?;
        reader.skip(4)?;
        let trailer = read_trailer(flags, &mut reader)?;

        Ok(Self {
            cuff_pressure,
            unit: unit(flags),
            timestamp: trailer.timestamp,
            pulse_rate: trailer.pulse_rate,
            user_id: trailer.user_id,
            status: trailer.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_measurement() {
        // 120 / 80 / 93 mmHg
        let data = [0x00, 0x78, 0x00, 0x50, 0x00, 0x5D, 0x00];
        let record = BloodPressureMeasurement::parse(&data).unwrap();

        assert!((record.systolic - 120.0).abs() < f32::EPSILON);
        assert!((record.diastolic - 80.0).abs() < f32::EPSILON);
        assert!((record.mean_arterial_pressure - 93.0).abs() < f32::EPSILON);
        assert_eq!(record.unit, PressureUnit::MmHg);
        assert_eq!(record.timestamp, None);
        assert_eq!(record.pulse_rate, None);
        assert_eq!(record.user_id, None);
        assert_eq!(record.status, None);
    }

    #[test]
    fn test_full_measurement() {
        let data = [
            0x1F, // kPa, timestamp, pulse, user, status
            0x00, 0xF1, // 25.6
            0x6B, 0xF0, // 10.7
            0x90, 0xF0, // 14.4
            0xE4, 0x07, 0x01, 0x02, 0x03, 0x04, 0x05, // 2020-01-02 03:04:05
            0x48, 0x00, // pulse 72
            0x02, // user 2
            0x0D, 0x00, // movement, irregular pulse, above upper limit
        ];
        let record = BloodPressureMeasurement::parse(&data).unwrap();

        assert_eq!(record.unit, PressureUnit::KPa);
        assert!((record.systolic - 25.6).abs() < 0.001);
        assert!((record.diastolic - 10.7).abs() < 0.001);
        assert!((record.mean_arterial_pressure - 14.4).abs() < 0.001);
        assert_eq!(record.timestamp.unwrap().year, Some(2020));
        assert_eq!(record.timestamp.unwrap().second, 5);
        assert!((record.pulse_rate.unwrap() - 72.0).abs() < f32::EPSILON);
        assert_eq!(record.user_id, Some(2));

        let status = record.status.unwrap();
        assert!(status.body_movement_detected());
        assert!(!status.cuff_too_loose());
        assert!(status.irregular_pulse_detected());
        assert_eq!(status.pulse_rate_range(), PulseRateRange::AboveUpperLimit);
        assert!(!status.improper_measurement_position());
    }

    #[test]
    fn test_intermediate_cuff_pressure() {
        let data = [0x04, 0x96, 0x00, 0xFF, 0x07, 0xFF, 0x07, 0x3C, 0x00];
        let record = IntermediateCuffPressure::parse(&data).unwrap();

        assert!((record.cuff_pressure - 150.0).abs() < f32::EPSILON);
        assert_eq!(record.unit, PressureUnit::MmHg);
        assert!((record.pulse_rate.unwrap() - 60.0).abs() < f32::EPSILON);
        assert_eq!(record.status, None);
    }

    #[test]
    fn test_big_endian_fields() {
        let data = [
            0x14, // pulse, status
            0x00, 0x78, // 120
            0x00, 0x50, // 80
            0x00, 0x5D, // 93
            0x00, 0x48, // pulse 72
            0x00, 0x0D, // movement, irregular pulse, above upper limit
        ];
        let record =
            BloodPressureMeasurement::parse_with_order(&data, ByteOrder::BigEndian).unwrap();

        assert!((record.systolic - 120.0).abs() < f32::EPSILON);
        assert!((record.mean_arterial_pressure - 93.0).abs() < f32::EPSILON);
        assert!((record.pulse_rate.unwrap() - 72.0).abs() < f32::EPSILON);
        assert_eq!(record.status, Some(BpmStatus(0x000D)));

        let cuff = [0x00, 0x00, 0x96, 0x07, 0xFF, 0x07, 0xFF];
        let record =
            IntermediateCuffPressure::parse_with_order(&cuff, ByteOrder::BigEndian).unwrap();
        assert!((record.cuff_pressure - 150.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_short_frames_rejected() {
        assert!(BloodPressureMeasurement::parse(&[0x00, 0x78, 0x00, 0x50, 0x00, 0x5D]).is_err());
        // status flagged but missing
        assert!(
            BloodPressureMeasurement::parse(&[0x10, 0x78, 0x00, 0x50, 0x00, 0x5D, 0x00, 0x01])
                .is_err()
        );
        // user id flagged but missing
        assert!(
            IntermediateCuffPressure::parse(&[0x08, 0x96, 0x00, 0xFF, 0x07, 0xFF, 0x07]).is_err()
        );
    }

    #[test]
    fn test_pulse_rate_range_decoding() {
        assert_eq!(BpmStatus(0x0000).pulse_rate_range(), PulseRateRange::InRange);
        assert_eq!(
            BpmStatus(0x0010).pulse_rate_range(),
            PulseRateRange::BelowLowerLimit
        );
        assert_eq!(BpmStatus(0x0018).pulse_rate_range(), PulseRateRange::Reserved);
        assert!(BpmStatus(0x0022).cuff_too_loose());
        assert!(BpmStatus(0x0022).improper_measurement_position());
    }
}
