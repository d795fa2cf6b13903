//! Direction-finding and ranging frames.
//!
//! Azimuth, elevation and distance notifications share a common header: a
//! flags byte, a quality indicator and the 7-byte address of the peer the
//! measurement refers to.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, DecodeError, Result},
};

const HEADER_SIZE: usize = 9;

const DISTANCE_FLAG_MCPD: u8 = 0x01;
const DISTANCE_FLAG_RTT: u8 = 0x02;

const CONTROL_POINT_RESPONSE: u8 = 0x20;
const OP_CHANGE_MODE: u8 = 0x01;
const OP_CHECK_MODE: u8 = 0x02;

/// Quality of a direction or distance estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityIndicator {
    /// Good quality
    Good,
    /// Poor quality
    Poor,
    /// Quality not supported by the device
    NotSupported,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for QualityIndicator {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Good,
            1 => Self::Poor,
            2 => Self::NotSupported,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for QualityIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Poor => write!(f, "Poor"),
            Self::NotSupported => write!(f, "Not supported"),
            Self::Unknown(value) => write!(f, "Unknown ({value})"),
        }
    }
}

/// Bluetooth address type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    /// Public device address
    Public,
    /// Random device address
    Random,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for AddressType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Public,
            1 => Self::Random,
            other => Self::Unknown(other),
        }
    }
}

/// Address of the peer a measurement refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    /// Address bytes in wire order (least significant first)
    pub bytes: [u8; 6],
    /// Address type
    pub kind: AddressType,
}

impl PeerAddress {
    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            bytes: reader.array::<6>()?,
            kind: AddressType::from(reader.u8()?),
        })
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.bytes;
        write!(f, "{g:02X}:{e:02X}:{d:02X}:{c:02X}:{b:02X}:{a:02X}")
    }
}

#[derive(Debug)]
struct Header {
    flags: u8,
    quality: QualityIndicator,
    address: PeerAddress,
}

impl Header {
    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            flags: reader.u8()?,
            quality: QualityIndicator::from(reader.u8()?),
            address: PeerAddress::read(reader)?,
        })
    }
}

/// Azimuth measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AzimuthMeasurement {
    /// Raw flags byte
    pub flags: u8,
    /// Estimate quality
    pub quality: QualityIndicator,
    /// Peer the azimuth refers to
    pub address: PeerAddress,
    /// Azimuth in degrees
    pub azimuth: i16,
}

impl AzimuthMeasurement {
    /// Decode an azimuth notification
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InsufficientData`] for frames under 11 bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode an azimuth notification whose angle uses `order`
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected azimuth frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, HEADER_SIZE + 2)?;
        let mut reader = Reader::with_order(data, order);
        let header = Header::read(&mut reader)?;

        Ok(Self {
            flags: header.flags,
            quality: header.quality,
            address: header.address,
            azimuth: reader.i16()?,
        })
    }
}

/// Elevation measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElevationMeasurement {
    /// Raw flags byte
    pub flags: u8,
    /// Estimate quality
    pub quality: QualityIndicator,
    /// Peer the elevation refers to
    pub address: PeerAddress,
    /// Elevation in degrees
    pub elevation: i8,
}

impl ElevationMeasurement {
    /// Decode an elevation notification
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InsufficientData`] for frames under 10 bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::decode(data).inspect_err(|e| debug!("Rejected elevation frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, HEADER_SIZE + 1)?;
        let mut reader = Reader::new(data);
        let header = Header::read(&mut reader)?;

        Ok(Self {
            flags: header.flags,
            quality: header.quality,
            address: header.address,
            elevation: reader.i8()?,
        })
    }
}

/// Ranging result, one variant per ranging technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceEstimate {
    /// Round-trip time estimate
    Rtt {
        /// Distance estimate
        value: u16,
    },
    /// Multi-carrier phase difference estimates
    Mcpd {
        /// IFFT based estimate
        ifft: u16,
        /// Phase slope based estimate
        phase_slope: u16,
        /// RSSI based estimate
        rssi: u16,
        /// Best effort estimate
        best_effort: u16,
    },
}

/// Distance measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistanceMeasurement {
    /// Estimate quality
    pub quality: QualityIndicator,
    /// Peer the distance refers to
    pub address: PeerAddress,
    /// Ranging result
    pub estimate: DistanceEstimate,
}

impl DistanceMeasurement {
    /// Decode a distance notification
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidFlagCombination`] unless exactly one of
    /// the MCPD and RTT bits is set, or [`DecodeError::InsufficientData`] if
    /// the frame is too short for the selected estimate.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode a distance notification whose estimates use `order`
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected distance frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, HEADER_SIZE)?;
        let flags = data[0];
        let mcpd = flags & DISTANCE_FLAG_MCPD != 0;
        let rtt = flags & DISTANCE_FLAG_RTT != 0;

        let payload = match (mcpd, rtt) {
            (true, false) => 8,
            (false, true) => 2,
            (true, true) => {
                return Err(DecodeError::InvalidFlagCombination {
                    flags,
                    reason: "MCPD and RTT are mutually exclusive",
                })
            }
            (false, false) => {
                return Err(DecodeError::InvalidFlagCombination {
                    flags,
                    reason: "no ranging technique selected",
                })
            }
        };
        ensure_len(data, HEADER_SIZE + payload)?;

        let mut reader = Reader::with_order(data, order);
        let header = Header::read(&mut reader)?;
        let estimate = if mcpd {
            DistanceEstimate::Mcpd {
                ifft: reader.u16()?,
                phase_slope: reader.u16()?,
                rssi: reader.u16()?,
                best_effort: reader.u16()?,
            }
        } else {
            DistanceEstimate::Rtt {
                value: reader.u16()?,
            }
        };

        Ok(Self {
            quality: header.quality,
            address: header.address,
            estimate,
        })
    }
}

/// Ranging technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangingMode {
    /// Round-trip time
    Rtt,
    /// Multi-carrier phase difference
    Mcpd,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for RangingMode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Rtt,
            0x01 => Self::Mcpd,
            other => Self::Unknown(other),
        }
    }
}

impl From<RangingMode> for u8 {
    fn from(mode: RangingMode) -> Self {
        match mode {
            RangingMode::Rtt => 0x00,
            RangingMode::Mcpd => 0x01,
            RangingMode::Unknown(value) => value,
        }
    }
}

/// Result code of a control point procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlPointStatus {
    /// Procedure succeeded
    Success,
    /// Request op code not supported
    OpCodeNotSupported,
    /// Request parameter invalid
    InvalidParameter,
    /// Procedure failed
    Failed,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for ControlPointStatus {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Success,
            0x02 => Self::OpCodeNotSupported,
            0x03 => Self::InvalidParameter,
            0x04 => Self::Failed,
            other => Self::Unknown(other),
        }
    }
}

/// Decoded control point response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlPointResult {
    /// Response to a change-ranging-mode request
    ChangeMode {
        /// Procedure result
        status: ControlPointStatus,
    },
    /// Response to a check-ranging-mode request
    CheckMode {
        /// Procedure result
        status: ControlPointStatus,
        /// Ranging modes reported on success, empty otherwise
        modes: Vec<RangingMode>,
    },
}

impl ControlPointResult {
    /// Decode a control point indication
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnrecognizedEnumValue`] if the first byte is not
    /// the response code or the echoed request op code is unknown, and
    /// [`DecodeError::InsufficientData`] if a successful check-mode response
    /// lists no ranging mode.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::decode(data)
            .inspect_err(|e| debug!("Rejected ranging control point frame {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, 3)?;
        if data[0] != CONTROL_POINT_RESPONSE {
            return Err(DecodeError::UnrecognizedEnumValue {
                field: "control point response code",
                value: u32::from(data[0]),
            });
        }

        let status = ControlPointStatus::from(data[2]);
        match data[1] {
            OP_CHANGE_MODE => Ok(Self::ChangeMode { status }),
            OP_CHECK_MODE => {
                let modes = if status == ControlPointStatus::Success {
                    ensure_len(data, 4)?;
                    data[3..].iter().copied().map(RangingMode::from).collect()
                } else {
                    Vec::new()
                };
                Ok(Self::CheckMode { status, modes })
            }
            other => Err(DecodeError::UnrecognizedEnumValue {
                field: "control point request op code",
                value: u32::from(other),
            }),
        }
    }

    /// Result code of the procedure
    #[must_use]
    pub const fn status(&self) -> ControlPointStatus {
        match self {
            Self::ChangeMode { status } | Self::CheckMode { status, .. } => *status,
        }
    }
}

/// Request to switch the ranging technique
#[must_use]
pub fn change_mode_request(mode: RangingMode) -> Bytes {
    let mut buf = BytesMut::with_capacity(2);
    buf.put_u8(OP_CHANGE_MODE);
    buf.put_u8(mode.into());
    buf.freeze()
}

/// Request the ranging technique currently in use
#[must_use]
pub fn check_mode_request() -> Bytes {
    Bytes::from_static(&[OP_CHECK_MODE])
}
