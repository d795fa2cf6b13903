#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! # Pulsewire
//!
//! Decoders for the Bluetooth Low Energy GATT sensor profiles used by health
//! and fitness devices.
//!
//! The crate turns raw characteristic values into typed records:
//!
//! - **Heart Rate**, **Health Thermometer**, **Blood Pressure** (with
//!   intermediate cuff pressure), **Running Speed & Cadence**
//! - **Cycling Speed & Cadence**, with a per-peer session that derives speed,
//!   distance, cadence and gear ratio from the cumulative counters
//! - **Continuous Glucose Monitoring** and **Glucose**, including E2E-CRC
//!   verification and the Record Access Control Point
//! - A vendor **direction finding** profile (azimuth, elevation, distance)
//!
//! Every parser is a pure function of the input buffer. A malformed frame
//! yields a [`DecodeError`] and never a partially filled record.
//!
//! ## Quick Start
//!
//! ```
//! use pulsewire::{decode, Characteristic, Measurement};
//!
//! let measurement = decode(Characteristic::HeartRateMeasurement, &[0x00, 0x64])?;
//! if let Measurement::HeartRate(record) = measurement {
//!     assert_eq!(record.heart_rate, 100);
//! }
//! # Ok::<(), pulsewire::DecodeError>(())
//! ```
//!
//! Cycling counters only make sense against the previous sample of the same
//! peer, so each peer gets its own session:
//!
//! ```
//! use pulsewire::{CadenceConfig, SessionStore};
//!
//! let mut sessions = SessionStore::new(CadenceConfig::default())?;
//! sessions.process("bike", &[0x01, 0xE8, 0x03, 0x00, 0x00, 0xC8, 0x00])?;
//! let snapshot = sessions.process("bike", &[0x01, 0x4C, 0x04, 0x00, 0x00, 0xE8, 0x03])?;
//! assert!(snapshot.speed > 0.0);
//! # Ok::<(), pulsewire::DecodeError>(())
//! ```
//!
//! With the `ble` feature, the `ble` module wires these decoders to `btleplug`
//! notification streams.

#[cfg(feature = "ble")]
pub mod ble;
/// Blood Pressure and Intermediate Cuff Pressure
pub mod blood_pressure;
pub mod cgm;
pub mod codec;
pub mod crc;
/// Cycling Speed and Cadence raw counters
pub mod cycling;
pub mod direction;
/// Error types and handling
pub mod error;
/// Glucose measurement, context and feature
pub mod glucose;
/// Heart Rate Measurement and Body Sensor Location
pub mod heart_rate;
pub mod profile;
pub mod racp;
/// Running Speed and Cadence
pub mod running;
pub mod session;
/// Health Thermometer
pub mod thermometer;
/// Shared value types
pub mod types;

// Re-export the main types for convenient usage
pub use blood_pressure::{
    BloodPressureMeasurement, BpmStatus, IntermediateCuffPressure, PressureUnit,
};
pub use cgm::{CgmFeature, CgmMeasurementBatch, CgmRecord, CgmStatus, CgmStatusReport};
pub use codec::{ByteOrder, IntFormat, Reader};
pub use crc::{crc16, Crc16};
pub use cycling::{CrankData, CscMeasurement, WheelData};
pub use direction::{
    AzimuthMeasurement, ControlPointResult, DistanceEstimate, DistanceMeasurement,
    ElevationMeasurement,
};
#[cfg(feature = "ble")]
pub use error::BridgeError;
pub use error::{DecodeError, Result};
pub use glucose::{GlucoseContext, GlucoseFeature, GlucoseMeasurement, GlucoseStatus};
pub use heart_rate::{BodySensorLocation, HeartRateMeasurement};
pub use profile::{decode, decode_with_order, decode_with_session, Characteristic, Measurement};
pub use racp::{RacpRequest, RacpResponse, RacpResponseCode};
pub use running::RunningCadence;
pub use session::{
    CadenceConfig, CadenceSession, CyclingSnapshot, DeltaSessionState, SessionStore,
};
pub use thermometer::{TemperatureMeasurement, TemperatureUnit};
pub use types::{BatteryLevel, DateTime};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
