//! Continuous Glucose Monitoring frames.
//!
//! CGM frames may end in an E2E-CRC (CRC-16/MCRF4XX over the preceding bytes
//! of the same frame). A measurement notification can batch several records,
//! each led by its own size byte; a record whose CRC does not match is
//! dropped and decoding resumes at the next record boundary.
//!
//! Whether a record carries a CRC can only be inferred from its size and
//! flags, which the CRC itself protects. Once the CGM Feature of the device
//! is known, [`CgmMeasurementBatch::parse_with_feature`] requires the CRC on
//! every record and checks it before trusting either byte.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    codec::{ByteOrder, Reader},
    crc::Crc16,
    error::{ensure_len, DecodeError, Result},
    types::{split_type_location, SampleLocation, SampleType},
};

const FLAG_TREND: u8 = 0x01;
const FLAG_QUALITY: u8 = 0x02;
const FLAG_WARNING_OCTET: u8 = 0x20;
const FLAG_CAL_TEMP_OCTET: u8 = 0x40;
const FLAG_STATUS_OCTET: u8 = 0x80;

/// Size, flags, concentration and time offset
const BASE_RECORD_SIZE: usize = 6;
const CRC_SIZE: usize = 2;

/// Sensor Status Annunciation, assembled as
/// `status | cal_temp << 8 | warning << 16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CgmStatus(pub u32);

macro_rules! status_bits {
    ($($(#[$doc:meta])* $name:ident = $mask:expr;)*) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub const fn $name(self) -> bool {
                self.0 & $mask != 0
            }
        )*
    };
}

impl CgmStatus {
    /// Assemble the bitfield from its three octets
    #[must_use]
    pub const fn from_octets(status: u8, cal_temp: u8, warning: u8) -> Self {
        Self(status as u32 | (cal_temp as u32) << 8 | (warning as u32) << 16)
    }

    /// Status octet
    #[must_use]
    pub const fn status_octet(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Calibration/temperature octet
    #[must_use]
    pub const fn cal_temp_octet(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Warning octet
    #[must_use]
    pub const fn warning_octet(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    status_bits! {
        /// Session stopped
        session_stopped = 0x00_0001;
        /// Device battery low
        device_battery_low = 0x00_0002;
        /// Sensor type incorrect for device
        sensor_type_incorrect = 0x00_0004;
        /// Sensor malfunction
        sensor_malfunction = 0x00_0008;
        /// Device specific alert
        device_specific_alert = 0x00_0010;
        /// General device fault
        general_device_fault = 0x00_0020;
        /// Time synchronization between sensor and collector required
        time_sync_required = 0x00_0100;
        /// Calibration not allowed
        calibration_not_allowed = 0x00_0200;
        /// Calibration recommended
        calibration_recommended = 0x00_0400;
        /// Calibration required
        calibration_required = 0x00_0800;
        /// Sensor temperature too high for valid measurement
        sensor_temperature_too_high = 0x00_1000;
        /// Sensor temperature too low for valid measurement
        sensor_temperature_too_low = 0x00_2000;
        /// Calibration pending
        calibration_pending = 0x00_4000;
        /// Result lower than the patient low level
        below_patient_low_level = 0x01_0000;
        /// Result higher than the patient high level
        above_patient_high_level = 0x02_0000;
        /// Result lower than the hypo level
        below_hypo_level = 0x04_0000;
        /// Result higher than the hyper level
        above_hyper_level = 0x08_0000;
        /// Rate of decrease exceeded
        rate_of_decrease_exceeded = 0x10_0000;
        /// Rate of increase exceeded
        rate_of_increase_exceeded = 0x20_0000;
        /// Result lower than the device can process
        below_device_range = 0x40_0000;
        /// Result higher than the device can process
        above_device_range = 0x80_0000;
    }
}

/// One CGM Measurement record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CgmRecord {
    /// Glucose concentration in mg/dL
    pub glucose_concentration: f32,
    /// Minutes since the session start
    pub time_offset: u16,
    /// Sensor status annunciation, if any octet was present
    pub status: Option<CgmStatus>,
    /// Trend in mg/dL/min
    pub trend: Option<f32>,
    /// Quality in percent
    pub quality: Option<f32>,
    /// Whether the record carried a verified E2E-CRC
    pub crc_present: bool,
}

/// Records decoded from one CGM Measurement notification
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CgmMeasurementBatch {
    /// Records that decoded and passed their CRC check
    pub records: Vec<CgmRecord>,
    /// Records discarded because their CRC did not match
    pub crc_failures: usize,
}

impl CgmMeasurementBatch {
    /// Decode every record of a CGM Measurement notification
    ///
    /// # Errors
    ///
    /// Fails the whole batch if a declared size is below the minimum, runs
    /// past the buffer, or disagrees with the record's flags. CRC mismatches
    /// only drop the affected record and are counted in `crc_failures`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode with multi-byte fields (and CRCs) in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, false, order)
            .inspect_err(|e| debug!("Rejected CGM measurement {:02X?}: {}", data, e))
    }

    /// Decode a notification from a device whose CGM Feature is known
    ///
    /// When `feature` reports E2E-CRC support, every record must end in a CRC.
    /// The CRC is checked over everything but the last two bytes of the
    /// declared size before the flags are read, so a corrupted size or flags
    /// byte is counted in `crc_failures` instead of changing the layout.
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`], plus [`DecodeError::UnexpectedLength`] if a
    /// record with a valid CRC has flags that disagree with its size.
    pub fn parse_with_feature(data: &[u8], feature: &CgmFeature) -> Result<Self> {
        Self::decode(data, feature.e2e_crc_supported(), ByteOrder::LittleEndian)
            .inspect_err(|e| debug!("Rejected CGM measurement {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], crc_required: bool, order: ByteOrder) -> Result<Self> {
        ensure_len(data, BASE_RECORD_SIZE)?;
        let mut batch = Self::default();
        let mut offset = 0;

        while offset < data.len() {
            let size = usize::from(data[offset]);
            if size < BASE_RECORD_SIZE {
                return Err(DecodeError::UnexpectedLength {
                    expected: BASE_RECORD_SIZE,
                    actual: size,
                });
            }
            ensure_len(data, offset + size)?;

            let frame = &data[offset..offset + size];
            offset += size;

            match decode_record(frame, crc_required, order) {
                Ok(record) => batch.records.push(record),
                Err(DecodeError::ChecksumMismatch { expected, actual }) => {
                    warn!(
                        "Discarding CGM record with bad E2E-CRC: expected {:#06X}, computed {:#06X}",
                        expected, actual
                    );
                    batch.crc_failures += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(batch)
    }
}

fn decode_record(frame: &[u8], crc_required: bool, order: ByteOrder) -> Result<CgmRecord> {
    if crc_required {
        verify_e2e_crc(frame, frame.len() - CRC_SIZE, order)?;
    }

    let flags = frame[1];
    let trend_present = flags & FLAG_TREND != 0;
    let quality_present = flags & FLAG_QUALITY != 0;
    let warning_present = flags & FLAG_WARNING_OCTET != 0;
    let cal_temp_present = flags & FLAG_CAL_TEMP_OCTET != 0;
    let status_present = flags & FLAG_STATUS_OCTET != 0;

    let data_size = BASE_RECORD_SIZE
        + if trend_present { 2 } else { 0 }
        + if quality_present { 2 } else { 0 }
        + usize::from(warning_present)
        + usize::from(cal_temp_present)
        + usize::from(status_present);

    let crc_present = frame.len() == data_size + CRC_SIZE;
    if crc_required && !crc_present {
        return Err(DecodeError::UnexpectedLength {
            expected: data_size + CRC_SIZE,
            actual: frame.len(),
        });
    }
    if frame.len() != data_size && !crc_present {
        return Err(DecodeError::UnexpectedLength {
            expected: data_size,
            actual: frame.len(),
        });
    }
    if crc_present && !crc_required {
        verify_e2e_crc(frame, data_size, order)?;
    }

    let mut reader = Reader::with_order(frame, order);
    reader.skip(2)?;
    let glucose_concentration = reader.sfloat()?;
    let time_offset = reader.u16()?;

    let warning = if warning_present { reader.u8()? } else { 0 };
    let cal_temp = if cal_temp_present { reader.u8()? } else { 0 };
    let sensor_status = if status_present { reader.u8()? } else { 0 };
    let status = (warning_present || cal_temp_present || status_present)
        .then(|| CgmStatus::from_octets(sensor_status, cal_temp, warning));

    let trend = if trend_present {
        Some(reader.sfloat()?)
    } else {
        None
    };
    let quality = if quality_present {
        Some(reader.sfloat()?)
    } else {
        None
    };

    Ok(CgmRecord {
        glucose_concentration,
        time_offset,
        status,
        trend,
        quality,
        crc_present,
    })
}

/// Check the CRC stored at `frame[covered..covered + 2]`
fn verify_e2e_crc(frame: &[u8], covered: usize, order: ByteOrder) -> Result<()> {
    let expected = Reader::with_order(&frame[covered..], order).u16()?;
    let actual = Crc16::MCRF4XX.checksum(&frame[..covered]);
    if expected != actual {
        return Err(DecodeError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// CGM Feature bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CgmFeatures(pub u32);

impl CgmFeatures {
    status_bits! {
        /// Calibration supported
        calibration_supported = 0x00_0001;
        /// Patient high/low alerts supported
        patient_high_low_alerts_supported = 0x00_0002;
        /// Hypo alerts supported
        hypo_alerts_supported = 0x00_0004;
        /// Hyper alerts supported
        hyper_alerts_supported = 0x00_0008;
        /// Rate of increase/decrease alerts supported
        rate_alerts_supported = 0x00_0010;
        /// Device specific alert supported
        device_specific_alert_supported = 0x00_0020;
        /// Sensor malfunction detection supported
        sensor_malfunction_detection_supported = 0x00_0040;
        /// Sensor temperature high/low detection supported
        sensor_temperature_detection_supported = 0x00_0080;
        /// Sensor result high/low detection supported
        sensor_result_detection_supported = 0x00_0100;
        /// Low battery detection supported
        low_battery_detection_supported = 0x00_0200;
        /// Sensor type error detection supported
        sensor_type_error_detection_supported = 0x00_0400;
        /// General device fault supported
        general_device_fault_supported = 0x00_0800;
        /// E2E-CRC supported
        e2e_crc_supported = 0x00_1000;
        /// Multiple bond supported
        multiple_bond_supported = 0x00_2000;
        /// Multiple sessions supported
        multiple_sessions_supported = 0x00_4000;
        /// CGM trend information supported
        trend_supported = 0x00_8000;
        /// CGM quality supported
        quality_supported = 0x01_0000;
    }
}

/// CGM Feature characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CgmFeature {
    /// Supported features
    pub features: CgmFeatures,
    /// Sample type (low nibble)
    pub sample_type: SampleType,
    /// Sample location (high nibble)
    pub sample_location: SampleLocation,
}

impl CgmFeature {
    /// Frame size in bytes
    pub const SIZE: usize = 6;

    /// Decode a CGM Feature read
    ///
    /// When the device does not support E2E-CRC the CRC field must hold
    /// `0xFFFF`; otherwise it must match the CRC of the first four bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedLength`] unless the frame is exactly six
    /// bytes, and [`DecodeError::ChecksumMismatch`] if the CRC field is wrong.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode a CGM Feature read in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected CGM feature {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(DecodeError::UnexpectedLength {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut reader = Reader::with_order(data, order);
        let features = CgmFeatures(reader.u24()?);
        let (sample_type, sample_location) = split_type_location(reader.u8()?);
        let expected = reader.u16()?;

        if features.e2e_crc_supported() {
            verify_e2e_crc(data, 4, order)?;
        } else if expected != 0xFFFF {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                actual: 0xFFFF,
            });
        }

        Ok(Self {
            features,
            sample_type,
            sample_location,
        })
    }

    /// Whether the device protects its frames with an E2E-CRC
    #[must_use]
    pub const fn e2e_crc_supported(&self) -> bool {
        self.features.e2e_crc_supported()
    }
}

/// CGM Status characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CgmStatusReport {
    /// Minutes since the session start
    pub time_offset: u16,
    /// Current sensor status annunciation
    pub status: CgmStatus,
    /// Whether the frame carried a verified E2E-CRC
    pub crc_present: bool,
}

impl CgmStatusReport {
    /// Decode a CGM Status read (5 bytes, or 7 with an E2E-CRC)
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedLength`] for any other size, and
    /// [`DecodeError::ChecksumMismatch`] if the trailing CRC is wrong.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode a CGM Status read in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected CGM status {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        const BODY: usize = 5;
        if data.len() != BODY && data.len() != BODY + CRC_SIZE {
            return Err(DecodeError::UnexpectedLength {
                expected: BODY,
                actual: data.len(),
            });
        }

        let crc_present = data.len() == BODY + CRC_SIZE;
        if crc_present {
            verify_e2e_crc(data, BODY, order)?;
        }

        let mut reader = Reader::with_order(data, order);
        let time_offset = reader.u16()?;
        let status = CgmStatus(reader.u24()?);

        Ok(Self {
            time_offset,
            status,
            crc_present,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Prefix `body` (flags onwards) with its size and append a valid E2E-CRC
    fn framed_with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(body.len() + 3);
        frame.push(u8::try_from(body.len() + 3).unwrap());
        frame.extend_from_slice(body);
        let crc = Crc16::MCRF4XX.checksum(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    fn e2e_feature() -> CgmFeature {
        CgmFeature {
            features: CgmFeatures(0x00_1000),
            sample_type: SampleType::InterstitialFluid,
            sample_location: SampleLocation::SubcutaneousTissue,
        }
    }

    #[test]
    fn test_minimal_record_without_crc() {
        // 100 mg/dL at 5 minutes
        let batch = CgmMeasurementBatch::parse(&[0x06, 0x00, 0x64, 0x00, 0x05, 0x00]).unwrap();

        assert_eq!(batch.crc_failures, 0);
        assert_eq!(batch.records.len(), 1);
        let record = batch.records[0];
        assert!((record.glucose_concentration - 100.0).abs() < f32::EPSILON);
        assert_eq!(record.time_offset, 5);
        assert_eq!(record.status, None);
        assert_eq!(record.trend, None);
        assert_eq!(record.quality, None);
        assert!(!record.crc_present);
    }

    #[test]
    fn test_all_optional_fields() {
        let frame = framed_with_crc(&[
            0xE3, // trend, quality, all three status octets
            0x78, 0x00, // 120 mg/dL
            0x0A, 0x00, // 10 min
            0x01, // warning: below patient low level
            0x08, // cal/temp: calibration required
            0x02, // status: battery low
            0xF5, 0xFF, // trend -1.1 (mantissa -11, exp -1)
            0x5F, 0x00, // quality 95 %
        ]);
        let batch = CgmMeasurementBatch::parse(&frame).unwrap();
        let record = batch.records[0];

        assert!(record.crc_present);
        assert!((record.glucose_concentration - 120.0).abs() < f32::EPSILON);
        assert_eq!(record.time_offset, 10);
        assert!((record.trend.unwrap() + 1.1).abs() < 1e-4);
        assert!((record.quality.unwrap() - 95.0).abs() < f32::EPSILON);

        let status = record.status.unwrap();
        assert!(status.below_patient_low_level());
        assert!(status.calibration_required());
        assert!(status.device_battery_low());
        assert!(!status.session_stopped());
        assert_eq!(status.warning_octet(), 0x01);
        assert_eq!(status.cal_temp_octet(), 0x08);
        assert_eq!(status.status_octet(), 0x02);
    }

    #[test]
    fn test_crc_round_trip_accepts_record() {
        let bodies: [&[u8]; 4] = [
            &[0x00, 0x64, 0x00, 0x05, 0x00],
            &[0x01, 0xFF, 0x0F, 0x00, 0x00, 0x12, 0xF0],
            &[0x80, 0x2C, 0x01, 0xFF, 0xFF, 0x01],
            &[0x62, 0x50, 0x00, 0x3C, 0x00, 0x10, 0x00, 0x50, 0x00],
        ];

        for body in bodies {
            let frame = framed_with_crc(body);
            let batch = CgmMeasurementBatch::parse(&frame).unwrap();
            assert_eq!(batch.records.len(), 1, "frame {frame:02X?}");
            assert!(batch.records[0].crc_present);
            assert_eq!(batch.crc_failures, 0);
        }
    }

    #[test]
    fn test_single_bit_flip_rejects_record() {
        let frame = framed_with_crc(&[0x03, 0x64, 0x00, 0x05, 0x00, 0x12, 0xF0, 0x5F, 0x00]);

        // without the feature, size and flags decide whether a CRC is present
        for byte in 2..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                let batch = CgmMeasurementBatch::parse(&corrupted).unwrap();
                assert!(batch.records.is_empty(), "byte {byte} bit {bit} accepted");
                assert_eq!(batch.crc_failures, 1);
            }
        }
    }

    #[test]
    fn test_required_crc_rejects_any_single_bit_flip() {
        let feature = e2e_feature();
        let bodies: [&[u8]; 3] = [
            &[0x03, 0x64, 0x00, 0x05, 0x00, 0x12, 0xF0, 0x5F, 0x00],
            &[0x01, 0x64, 0x00, 0x05, 0x00, 0x12, 0xF0],
            &[0x00, 0x64, 0x00, 0x05, 0x00],
        ];

        for body in bodies {
            let frame = framed_with_crc(body);
            let batch = CgmMeasurementBatch::parse_with_feature(&frame, &feature).unwrap();
            assert_eq!(batch.records.len(), 1);
            assert!(batch.records[0].crc_present);

            for byte in 0..frame.len() {
                for bit in 0..8 {
                    let mut corrupted = frame.clone();
                    corrupted[byte] ^= 1 << bit;
                    if let Ok(batch) = CgmMeasurementBatch::parse_with_feature(&corrupted, &feature)
                    {
                        assert!(
                            batch.records.is_empty(),
                            "{frame:02X?}: byte {byte} bit {bit} accepted"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_required_crc_catches_flipped_flags() {
        // trend-only record; dropping the trend bit for quality would make
        // the CRC look like a quality field
        let mut frame = framed_with_crc(&[0x01, 0x64, 0x00, 0x05, 0x00, 0x12, 0xF0]);
        frame[1] ^= 0x02;

        let batch = CgmMeasurementBatch::parse_with_feature(&frame, &e2e_feature()).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.crc_failures, 1);
    }

    #[test]
    fn test_required_crc_rejects_records_without_one() {
        let feature = e2e_feature();
        let data = [0x06, 0x00, 0x64, 0x00, 0x05, 0x00];

        assert_eq!(CgmMeasurementBatch::parse(&data).unwrap().records.len(), 1);
        let batch = CgmMeasurementBatch::parse_with_feature(&data, &feature).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.crc_failures, 1);

        // valid CRC over a size that leaves a spare byte the flags do not explain
        let mut padded = vec![0x09, 0x00, 0x64, 0x00, 0x05, 0x00, 0x00];
        let crc = Crc16::MCRF4XX.checksum(&padded);
        padded.extend_from_slice(&crc.to_le_bytes());
        assert!(CgmMeasurementBatch::parse_with_feature(&padded, &feature)
            .unwrap_err()
            .is_length_error());

        // without E2E-CRC support the feature changes nothing
        let plain = CgmFeature {
            features: CgmFeatures(0),
            ..feature
        };
        assert_eq!(
            CgmMeasurementBatch::parse_with_feature(&data, &plain),
            CgmMeasurementBatch::parse(&data)
        );
    }

    #[test]
    fn test_big_endian_record() {
        let mut frame = vec![0x0A, 0x01, 0x00, 0x78, 0x00, 0x0A, 0x00, 0x0A];
        let crc = Crc16::MCRF4XX.checksum(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());

        let batch = CgmMeasurementBatch::parse_with_order(&frame, ByteOrder::BigEndian).unwrap();
        assert_eq!(batch.crc_failures, 0);
        let record = batch.records[0];
        assert!(record.crc_present);
        assert!((record.glucose_concentration - 120.0).abs() < f32::EPSILON);
        assert_eq!(record.time_offset, 10);
        assert!((record.trend.unwrap() - 10.0).abs() < f32::EPSILON);

        let report =
            CgmStatusReport::parse_with_order(&[0x00, 0x1E, 0x80, 0x00, 0x01], ByteOrder::BigEndian)
                .unwrap();
        assert_eq!(report.time_offset, 30);
        assert!(report.status.session_stopped());
        assert!(report.status.above_device_range());
    }

    #[test]
    fn test_bad_crc_only_discards_that_record() {
        let good = framed_with_crc(&[0x00, 0x64, 0x00, 0x05, 0x00]);
        let mut bad = framed_with_crc(&[0x00, 0x6E, 0x00, 0x0A, 0x00]);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;

        let mut data = good.clone();
        data.extend_from_slice(&bad);
        data.extend_from_slice(&good);

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let batch = tracing::subscriber::with_default(subscriber, || {
            CgmMeasurementBatch::parse(&data)
        })
        .unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.crc_failures, 1);
        assert_eq!(batch.records[0], batch.records[1]);
    }

    #[test]
    fn test_batched_records_without_crc() {
        let data = [
            0x06, 0x00, 0x64, 0x00, 0x05, 0x00, //
            0x08, 0x01, 0x6E, 0x00, 0x0A, 0x00, 0x0A, 0x00,
        ];
        let batch = CgmMeasurementBatch::parse(&data).unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[1].time_offset, 10);
        assert!((batch.records[1].trend.unwrap() - 10.0).abs() < f32::EPSILON);
        assert!(!batch.records[1].crc_present);
    }

    #[test]
    fn test_structural_errors_fail_the_batch() {
        // declared size below minimum
        assert!(CgmMeasurementBatch::parse(&[0x05, 0x00, 0x64, 0x00, 0x05, 0x00]).is_err());
        // declared size past the end of the buffer
        assert!(CgmMeasurementBatch::parse(&[0x08, 0x00, 0x64, 0x00, 0x05, 0x00]).is_err());
        // size disagrees with flags (trend flagged, no room)
        assert!(matches!(
            CgmMeasurementBatch::parse(&[0x07, 0x01, 0x64, 0x00, 0x05, 0x00, 0x00]),
            Err(DecodeError::UnexpectedLength { .. })
        ));
        assert!(CgmMeasurementBatch::parse(&[]).is_err());
    }

    #[test]
    fn test_feature_without_e2e_crc() {
        // calibration + trend supported, capillary plasma from finger
        let feature = CgmFeature::parse(&[0x01, 0x80, 0x00, 0x12, 0xFF, 0xFF]).unwrap();

        assert!(feature.features.calibration_supported());
        assert!(feature.features.trend_supported());
        assert!(!feature.e2e_crc_supported());
        assert_eq!(feature.sample_type, SampleType::CapillaryPlasma);
        assert_eq!(feature.sample_location, SampleLocation::Finger);

        assert!(CgmFeature::parse(&[0x01, 0x80, 0x00, 0x12, 0x00, 0x00])
            .unwrap_err()
            .is_checksum_error());
    }

    #[test]
    fn test_feature_with_e2e_crc() {
        let mut data = vec![0x00, 0x10, 0x01, 0x59];
        let crc = Crc16::MCRF4XX.checksum(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        let feature = CgmFeature::parse(&data).unwrap();
        assert!(feature.e2e_crc_supported());
        assert!(feature.features.quality_supported());
        assert_eq!(feature.sample_type, SampleType::InterstitialFluid);
        assert_eq!(feature.sample_location, SampleLocation::SubcutaneousTissue);

        // 0xFFFF placeholder is not acceptable once E2E-CRC is supported
        let mut placeholder = data.clone();
        placeholder[4] = 0xFF;
        placeholder[5] = 0xFF;
        if crc != 0xFFFF {
            assert!(CgmFeature::parse(&placeholder).is_err());
        }
    }

    #[test]
    fn test_feature_requires_exact_size() {
        assert_eq!(
            CgmFeature::parse(&[0x00, 0x00, 0x00, 0x11, 0xFF]),
            Err(DecodeError::UnexpectedLength {
                expected: 6,
                actual: 5
            })
        );
        assert!(CgmFeature::parse(&[0x00, 0x00, 0x00, 0x11, 0xFF, 0xFF, 0x00]).is_err());
    }

    #[test]
    fn test_status_report() {
        let report = CgmStatusReport::parse(&[0x1E, 0x00, 0x01, 0x00, 0x80]).unwrap();
        assert_eq!(report.time_offset, 30);
        assert!(report.status.session_stopped());
        assert!(report.status.above_device_range());
        assert!(!report.crc_present);

        let mut with_crc = vec![0x1E, 0x00, 0x01, 0x00, 0x80];
        let crc = Crc16::MCRF4XX.checksum(&with_crc);
        with_crc.extend_from_slice(&crc.to_le_bytes());
        assert!(CgmStatusReport::parse(&with_crc).unwrap().crc_present);

        with_crc[0] ^= 0x01;
        assert!(CgmStatusReport::parse(&with_crc).is_err());
        assert!(CgmStatusReport::parse(&[0x1E, 0x00, 0x01]).is_err());
    }
}
