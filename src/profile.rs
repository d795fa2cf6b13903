//! Characteristic table and notification routing.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;
use uuid::Uuid;

use crate::{
    blood_pressure::{BloodPressureMeasurement, IntermediateCuffPressure},
    cgm::{CgmFeature, CgmMeasurementBatch, CgmStatusReport},
    codec::ByteOrder,
    cycling::CscMeasurement,
    direction::{AzimuthMeasurement, ControlPointResult, DistanceMeasurement, ElevationMeasurement},
    error::Result,
    glucose::{GlucoseContext, GlucoseFeature, GlucoseMeasurement},
    heart_rate::{BodySensorLocation, HeartRateMeasurement},
    racp::RacpResponse,
    running::RunningCadence,
    session::{CadenceSession, CyclingSnapshot},
    thermometer::TemperatureMeasurement,
    types::BatteryLevel,
};

/// Expand a 16-bit assigned number onto the Bluetooth base UUID
#[must_use]
pub const fn uuid_from_u16(short: u16) -> Uuid {
    Uuid::from_u128(((short as u128) << 96) | 0x0000_0000_0000_1000_8000_0080_5F9B_34FB)
}

/// Heart Rate Measurement characteristic
pub const HEART_RATE_MEASUREMENT_UUID: Uuid = uuid_from_u16(0x2A37);
/// Body Sensor Location characteristic
pub const BODY_SENSOR_LOCATION_UUID: Uuid = uuid_from_u16(0x2A38);
/// Battery Level characteristic
pub const BATTERY_LEVEL_UUID: Uuid = uuid_from_u16(0x2A19);
/// Temperature Measurement characteristic
pub const TEMPERATURE_MEASUREMENT_UUID: Uuid = uuid_from_u16(0x2A1C);
/// Intermediate Temperature characteristic
pub const INTERMEDIATE_TEMPERATURE_UUID: Uuid = uuid_from_u16(0x2A1E);
/// Blood Pressure Measurement characteristic
pub const BLOOD_PRESSURE_MEASUREMENT_UUID: Uuid = uuid_from_u16(0x2A35);
/// Intermediate Cuff Pressure characteristic
pub const INTERMEDIATE_CUFF_PRESSURE_UUID: Uuid = uuid_from_u16(0x2A36);
/// RSC Measurement characteristic
pub const RSC_MEASUREMENT_UUID: Uuid = uuid_from_u16(0x2A53);
/// CSC Measurement characteristic
pub const CSC_MEASUREMENT_UUID: Uuid = uuid_from_u16(0x2A5B);
/// CGM Measurement characteristic
pub const CGM_MEASUREMENT_UUID: Uuid = uuid_from_u16(0x2AA7);
/// CGM Feature characteristic
pub const CGM_FEATURE_UUID: Uuid = uuid_from_u16(0x2AA8);
/// CGM Status characteristic
pub const CGM_STATUS_UUID: Uuid = uuid_from_u16(0x2AA9);
/// Glucose Measurement characteristic
pub const GLUCOSE_MEASUREMENT_UUID: Uuid = uuid_from_u16(0x2A18);
/// Glucose Measurement Context characteristic
pub const GLUCOSE_MEASUREMENT_CONTEXT_UUID: Uuid = uuid_from_u16(0x2A34);
/// Glucose Feature characteristic
pub const GLUCOSE_FEATURE_UUID: Uuid = uuid_from_u16(0x2A51);
/// Record Access Control Point characteristic
pub const RECORD_ACCESS_CONTROL_POINT_UUID: Uuid = uuid_from_u16(0x2A52);

/// Direction finding service (vendor specific)
pub const DIRECTION_FINDER_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x2149_0000_494A_4573_98AF_F126_AF76_F490);
/// Azimuth characteristic
pub const AZIMUTH_UUID: Uuid = Uuid::from_u128(0x2149_0001_494A_4573_98AF_F126_AF76_F490);
/// Elevation characteristic
pub const ELEVATION_UUID: Uuid = Uuid::from_u128(0x2149_0002_494A_4573_98AF_F126_AF76_F490);
/// Distance characteristic
pub const DISTANCE_UUID: Uuid = Uuid::from_u128(0x2149_0003_494A_4573_98AF_F126_AF76_F490);
/// Ranging control point characteristic
pub const RANGING_CONTROL_POINT_UUID: Uuid =
    Uuid::from_u128(0x2149_0004_494A_4573_98AF_F126_AF76_F490);

/// Every characteristic this crate can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Characteristic {
    /// Heart Rate Measurement
    HeartRateMeasurement,
    /// Body Sensor Location
    BodySensorLocation,
    /// Battery Level
    BatteryLevel,
    /// Temperature Measurement
    TemperatureMeasurement,
    /// Intermediate Temperature
    IntermediateTemperature,
    /// Blood Pressure Measurement
    BloodPressureMeasurement,
    /// Intermediate Cuff Pressure
    IntermediateCuffPressure,
    /// RSC Measurement
    RscMeasurement,
    /// CSC Measurement
    CscMeasurement,
    /// CGM Measurement
    CgmMeasurement,
    /// CGM Feature
    CgmFeature,
    /// CGM Status
    CgmStatus,
    /// Glucose Measurement
    GlucoseMeasurement,
    /// Glucose Measurement Context
    GlucoseMeasurementContext,
    /// Glucose Feature
    GlucoseFeature,
    /// Record Access Control Point
    RecordAccessControlPoint,
    /// Direction finder azimuth
    Azimuth,
    /// Direction finder elevation
    Elevation,
    /// Direction finder distance
    Distance,
    /// Direction finder ranging control point
    RangingControlPoint,
}

impl Characteristic {
    /// All decodable characteristics
    pub const ALL: [Self; 20] = [
        Self::HeartRateMeasurement,
        Self::BodySensorLocation,
        Self::BatteryLevel,
        Self::TemperatureMeasurement,
        Self::IntermediateTemperature,
        Self::BloodPressureMeasurement,
        Self::IntermediateCuffPressure,
        Self::RscMeasurement,
        Self::CscMeasurement,
        Self::CgmMeasurement,
        Self::CgmFeature,
        Self::CgmStatus,
        Self::GlucoseMeasurement,
        Self::GlucoseMeasurementContext,
        Self::GlucoseFeature,
        Self::RecordAccessControlPoint,
        Self::Azimuth,
        Self::Elevation,
        Self::Distance,
        Self::RangingControlPoint,
    ];

    /// Characteristic UUID
    #[must_use]
    pub const fn uuid(self) -> Uuid {
        match self {
            Self::HeartRateMeasurement => HEART_RATE_MEASUREMENT_UUID,
            Self::BodySensorLocation => BODY_SENSOR_LOCATION_UUID,
            Self::BatteryLevel => BATTERY_LEVEL_UUID,
            Self::TemperatureMeasurement => TEMPERATURE_MEASUREMENT_UUID,
            Self::IntermediateTemperature => INTERMEDIATE_TEMPERATURE_UUID,
            Self::BloodPressureMeasurement => BLOOD_PRESSURE_MEASUREMENT_UUID,
            Self::IntermediateCuffPressure => INTERMEDIATE_CUFF_PRESSURE_UUID,
            Self::RscMeasurement => RSC_MEASUREMENT_UUID,
            Self::CscMeasurement => CSC_MEASUREMENT_UUID,
            Self::CgmMeasurement => CGM_MEASUREMENT_UUID,
            Self::CgmFeature => CGM_FEATURE_UUID,
            Self::CgmStatus => CGM_STATUS_UUID,
            Self::GlucoseMeasurement => GLUCOSE_MEASUREMENT_UUID,
            Self::GlucoseMeasurementContext => GLUCOSE_MEASUREMENT_CONTEXT_UUID,
            Self::GlucoseFeature => GLUCOSE_FEATURE_UUID,
            Self::RecordAccessControlPoint => RECORD_ACCESS_CONTROL_POINT_UUID,
            Self::Azimuth => AZIMUTH_UUID,
            Self::Elevation => ELEVATION_UUID,
            Self::Distance => DISTANCE_UUID,
            Self::RangingControlPoint => RANGING_CONTROL_POINT_UUID,
        }
    }

    /// Look up a characteristic by UUID
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    /// Whether the value arrives as a notification or indication rather than a read
    #[must_use]
    pub const fn is_streamed(self) -> bool {
        !matches!(
            self,
            Self::BodySensorLocation | Self::CgmFeature | Self::CgmStatus | Self::GlucoseFeature
        )
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HeartRateMeasurement => "Heart Rate Measurement",
            Self::BodySensorLocation => "Body Sensor Location",
            Self::BatteryLevel => "Battery Level",
            Self::TemperatureMeasurement => "Temperature Measurement",
            Self::IntermediateTemperature => "Intermediate Temperature",
            Self::BloodPressureMeasurement => "Blood Pressure Measurement",
            Self::IntermediateCuffPressure => "Intermediate Cuff Pressure",
            Self::RscMeasurement => "RSC Measurement",
            Self::CscMeasurement => "CSC Measurement",
            Self::CgmMeasurement => "CGM Measurement",
            Self::CgmFeature => "CGM Feature",
            Self::CgmStatus => "CGM Status",
            Self::GlucoseMeasurement => "Glucose Measurement",
            Self::GlucoseMeasurementContext => "Glucose Measurement Context",
            Self::GlucoseFeature => "Glucose Feature",
            Self::RecordAccessControlPoint => "Record Access Control Point",
            Self::Azimuth => "Azimuth",
            Self::Elevation => "Elevation",
            Self::Distance => "Distance",
            Self::RangingControlPoint => "Ranging Control Point",
        };
        write!(f, "{name}")
    }
}

/// A decoded characteristic value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Measurement {
    /// Heart rate
    HeartRate(HeartRateMeasurement),
    /// Heart rate sensor location
    BodySensorLocation(BodySensorLocation),
    /// Battery level
    BatteryLevel(BatteryLevel),
    /// Final temperature reading
    Temperature(TemperatureMeasurement),
    /// Temperature while the reading settles
    IntermediateTemperature(TemperatureMeasurement),
    /// Blood pressure
    BloodPressure(BloodPressureMeasurement),
    /// Cuff pressure while inflating
    IntermediateCuffPressure(IntermediateCuffPressure),
    /// Running speed and cadence
    RunningCadence(RunningCadence),
    /// Raw cycling counters, when no session is involved
    CyclingCounters(CscMeasurement),
    /// Cycling values derived by a session
    Cycling(CyclingSnapshot),
    /// CGM measurement records
    Cgm(CgmMeasurementBatch),
    /// CGM feature
    CgmFeature(CgmFeature),
    /// CGM status
    CgmStatus(CgmStatusReport),
    /// Glucose measurement
    Glucose(GlucoseMeasurement),
    /// Glucose measurement context
    GlucoseContext(GlucoseContext),
    /// Glucose feature
    GlucoseFeature(GlucoseFeature),
    /// RACP response
    Racp(RacpResponse),
    /// Azimuth
    Azimuth(AzimuthMeasurement),
    /// Elevation
    Elevation(ElevationMeasurement),
    /// Distance
    Distance(DistanceMeasurement),
    /// Ranging control point response
    RangingControlPoint(ControlPointResult),
}

/// Decode a characteristic value with the matching parser
///
/// CSC frames decode to their raw counters; use [`decode_with_session`] to
/// derive speed and cadence.
///
/// # Errors
///
/// Propagates the parser's [`crate::DecodeError`].
pub fn decode(characteristic: Characteristic, data: &[u8]) -> Result<Measurement> {
    decode_with_order(characteristic, data, ByteOrder::LittleEndian)
}

/// Decode a characteristic value whose multi-byte fields use `order`
///
/// # Errors
///
/// Propagates the parser's [`crate::DecodeError`].
pub fn decode_with_order(
    characteristic: Characteristic,
    data: &[u8],
    order: ByteOrder,
) -> Result<Measurement> {
    trace!("Decoding {} frame {:02X?} ({:?})", characteristic, data, order);

    let measurement = match characteristic {
        Characteristic::HeartRateMeasurement => {
            Measurement::HeartRate(HeartRateMeasurement::parse_with_order(data, order)?)
        }
        Characteristic::BodySensorLocation => {
            Measurement::BodySensorLocation(BodySensorLocation::parse(data)?)
        }
        Characteristic::BatteryLevel => Measurement::BatteryLevel(BatteryLevel::parse(data)?),
        Characteristic::TemperatureMeasurement => {
            Measurement::Temperature(TemperatureMeasurement::parse_with_order(data, order)?)
        }
        Characteristic::IntermediateTemperature => Measurement::IntermediateTemperature(
            TemperatureMeasurement::parse_with_order(data, order)?,
        ),
        Characteristic::BloodPressureMeasurement => {
            Measurement::BloodPressure(BloodPressureMeasurement::parse_with_order(data, order)?)
        }
        Characteristic::IntermediateCuffPressure => Measurement::IntermediateCuffPressure(
            IntermediateCuffPressure::parse_with_order(data, order)?,
        ),
        Characteristic::RscMeasurement => {
            Measurement::RunningCadence(RunningCadence::parse_with_order(data, order)?)
        }
        Characteristic::CscMeasurement => {
            Measurement::CyclingCounters(CscMeasurement::parse_with_order(data, order)?)
        }
        Characteristic::CgmMeasurement => {
            Measurement::Cgm(CgmMeasurementBatch::parse_with_order(data, order)?)
        }
        Characteristic::CgmFeature => {
            Measurement::CgmFeature(CgmFeature::parse_with_order(data, order)?)
        }
        Characteristic::CgmStatus => {
            Measurement::CgmStatus(CgmStatusReport::parse_with_order(data, order)?)
        }
        Characteristic::GlucoseMeasurement => {
            Measurement::Glucose(GlucoseMeasurement::parse_with_order(data, order)?)
        }
        Characteristic::GlucoseMeasurementContext => {
            Measurement::GlucoseContext(GlucoseContext::parse_with_order(data, order)?)
        }
        Characteristic::GlucoseFeature => {
            Measurement::GlucoseFeature(GlucoseFeature::parse_with_order(data, order)?)
        }
        Characteristic::RecordAccessControlPoint => {
            Measurement::Racp(RacpResponse::parse_with_order(data, order)?)
        }
        Characteristic::Azimuth => {
            Measurement::Azimuth(AzimuthMeasurement::parse_with_order(data, order)?)
        }
        Characteristic::Elevation => Measurement::Elevation(ElevationMeasurement::parse(data)?),
        Characteristic::Distance => {
            Measurement::Distance(DistanceMeasurement::parse_with_order(data, order)?)
        }
        Characteristic::RangingControlPoint => {
            Measurement::RangingControlPoint(ControlPointResult::parse(data)?)
        }
    };

    Ok(measurement)
}

/// Decode a characteristic value against the peer's `session`
///
/// CSC frames derive speed and cadence from the previous sample. A decoded
/// CGM Feature is stored in the session, and later CGM measurements require
/// an E2E-CRC on every record if the feature says the device supports it.
///
/// # Errors
///
/// Propagates the parser's [`crate::DecodeError`]. A rejected CSC frame
/// leaves the session untouched.
pub fn decode_with_session(
    characteristic: Characteristic,
    data: &[u8],
    session: &mut CadenceSession,
) -> Result<Measurement> {
    match characteristic {
        Characteristic::CscMeasurement => Ok(Measurement::Cycling(session.process(data)?)),
        Characteristic::CgmFeature => {
            let feature = CgmFeature::parse(data)?;
            session.set_cgm_feature(feature);
            Ok(Measurement::CgmFeature(feature))
        }
        Characteristic::CgmMeasurement => match session.cgm_feature() {
            Some(feature) => Ok(Measurement::Cgm(CgmMeasurementBatch::parse_with_feature(
                data, &feature,
            )?)),
            None => decode(characteristic, data),
        },
        other => decode(other, data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_number_expansion() {
        assert_eq!(
            HEART_RATE_MEASUREMENT_UUID,
            Uuid::parse_str("00002a37-0000-1000-8000-00805f9b34fb").unwrap()
        );
        assert_eq!(
            RANGING_CONTROL_POINT_UUID,
            Uuid::parse_str("21490004-494A-4573-98AF-F126AF76F490").unwrap()
        );
    }

    #[test]
    fn test_uuid_lookup_round_trip() {
        for characteristic in Characteristic::ALL {
            assert_eq!(
                Characteristic::from_uuid(characteristic.uuid()),
                Some(characteristic)
            );
        }
        assert_eq!(Characteristic::from_uuid(uuid_from_u16(0x2A00)), None);
        assert_eq!(Characteristic::from_uuid(DIRECTION_FINDER_SERVICE_UUID), None);
    }

    #[test]
    fn test_decode_routes_to_parser() {
        let measurement = decode(Characteristic::HeartRateMeasurement, &[0x00, 0x64]).unwrap();
        match measurement {
            Measurement::HeartRate(record) => assert_eq!(record.heart_rate, 100),
            other => panic!("Unexpected measurement: {other:?}"),
        }

        assert_eq!(
            decode(Characteristic::RecordAccessControlPoint, &[0x05, 0x00, 0x01]),
            Ok(Measurement::Racp(RacpResponse::RecordCount(1)))
        );
        assert!(decode(Characteristic::BatteryLevel, &[]).is_err());
    }

    #[test]
    fn test_decode_with_order() {
        assert_eq!(
            decode_with_order(
                Characteristic::RecordAccessControlPoint,
                &[0x05, 0x00, 0x01, 0x2C],
                ByteOrder::BigEndian
            ),
            Ok(Measurement::Racp(RacpResponse::RecordCount(300)))
        );
        assert_eq!(
            decode_with_order(
                Characteristic::HeartRateMeasurement,
                &[0x01, 0x00, 0x64],
                ByteOrder::BigEndian
            ),
            decode(Characteristic::HeartRateMeasurement, &[0x01, 0x64, 0x00])
        );
    }

    #[test]
    fn test_decode_is_idempotent() {
        let data = [
            0x06, 0x71, 0x0E, 0x00, 0xFE, 0xE4, 0x07, 0x05, 0x15, 0x0A, 0x1E, 0x2D, 0x00, 0xFE,
        ];
        assert_eq!(
            decode(Characteristic::TemperatureMeasurement, &data),
            decode(Characteristic::TemperatureMeasurement, &data)
        );
    }

    #[test]
    fn test_cycling_routing() {
        let frame = [0x01, 0xE8, 0x03, 0x00, 0x00, 0xC8, 0x00];
        assert!(matches!(
            decode(Characteristic::CscMeasurement, &frame),
            Ok(Measurement::CyclingCounters(_))
        ));

        let mut session = CadenceSession::default();
        match decode_with_session(Characteristic::CscMeasurement, &frame, &mut session) {
            Ok(Measurement::Cycling(snapshot)) => {
                assert!(snapshot.distance.abs() < f32::EPSILON);
                assert!(snapshot.speed.abs() < f32::EPSILON);
                assert!((snapshot.total_distance.unwrap() - 2340.0).abs() < 0.01);
            }
            other => panic!("Unexpected result: {other:?}"),
        }
        assert_eq!(session.state().last_wheel_revolutions, Some(1000));

        assert!(decode_with_session(Characteristic::CscMeasurement, &[0x01], &mut session).is_err());
        assert_eq!(session.state().last_wheel_revolutions, Some(1000));

        assert!(matches!(
            decode_with_session(Characteristic::BatteryLevel, &[50], &mut session),
            Ok(Measurement::BatteryLevel(BatteryLevel { percent: 50 }))
        ));
    }

    #[test]
    fn test_cgm_feature_tightens_crc_checks() {
        let unprotected = [0x06, 0x00, 0x64, 0x00, 0x05, 0x00];
        let mut session = CadenceSession::default();

        match decode_with_session(Characteristic::CgmMeasurement, &unprotected, &mut session) {
            Ok(Measurement::Cgm(batch)) => assert_eq!(batch.records.len(), 1),
            other => panic!("Unexpected result: {other:?}"),
        }

        // E2E-CRC supported
        let mut feature = vec![0x00, 0x10, 0x00, 0x59];
        let crc = crate::crc::Crc16::MCRF4XX.checksum(&feature);
        feature.extend_from_slice(&crc.to_le_bytes());
        assert!(matches!(
            decode_with_session(Characteristic::CgmFeature, &feature, &mut session),
            Ok(Measurement::CgmFeature(_))
        ));
        assert!(session.cgm_feature().unwrap().e2e_crc_supported());

        match decode_with_session(Characteristic::CgmMeasurement, &unprotected, &mut session) {
            Ok(Measurement::Cgm(batch)) => {
                assert!(batch.records.is_empty());
                assert_eq!(batch.crc_failures, 1);
            }
            other => panic!("Unexpected result: {other:?}"),
        }

        // a rejected feature read keeps the previous one
        assert!(decode_with_session(Characteristic::CgmFeature, &[0x00], &mut session).is_err());
        assert!(session.cgm_feature().is_some());
    }
}
