//! Record Access Control Point (RACP) requests and responses.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, DecodeError, Result},
};

/// RACP op code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RacpOpCode {
    /// Report stored records
    ReportStoredRecords,
    /// Delete stored records
    DeleteStoredRecords,
    /// Abort the running operation
    AbortOperation,
    /// Report the number of stored records
    ReportNumberOfStoredRecords,
    /// Number of stored records response
    NumberOfStoredRecordsResponse,
    /// Response code
    ResponseCode,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for RacpOpCode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::ReportStoredRecords,
            2 => Self::DeleteStoredRecords,
            3 => Self::AbortOperation,
            4 => Self::ReportNumberOfStoredRecords,
            5 => Self::NumberOfStoredRecordsResponse,
            6 => Self::ResponseCode,
            other => Self::Unknown(other),
        }
    }
}

impl From<RacpOpCode> for u8 {
    fn from(op_code: RacpOpCode) -> Self {
        match op_code {
            RacpOpCode::ReportStoredRecords => 1,
            RacpOpCode::DeleteStoredRecords => 2,
            RacpOpCode::AbortOperation => 3,
            RacpOpCode::ReportNumberOfStoredRecords => 4,
            RacpOpCode::NumberOfStoredRecordsResponse => 5,
            RacpOpCode::ResponseCode => 6,
            RacpOpCode::Unknown(value) => value,
        }
    }
}

/// RACP operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RacpOperator {
    /// No operator, used in responses and abort
    Null,
    /// All records
    AllRecords,
    /// Records less than or equal to the operand
    LessThanOrEqual,
    /// Records greater than or equal to the operand
    GreaterThanOrEqual,
    /// Records within the operand range
    WithinRange,
    /// First record
    FirstRecord,
    /// Last record
    LastRecord,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for RacpOperator {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Null,
            1 => Self::AllRecords,
            2 => Self::LessThanOrEqual,
            3 => Self::GreaterThanOrEqual,
            4 => Self::WithinRange,
            5 => Self::FirstRecord,
            6 => Self::LastRecord,
            other => Self::Unknown(other),
        }
    }
}

impl From<RacpOperator> for u8 {
    fn from(operator: RacpOperator) -> Self {
        match operator {
            RacpOperator::Null => 0,
            RacpOperator::AllRecords => 1,
            RacpOperator::LessThanOrEqual => 2,
            RacpOperator::GreaterThanOrEqual => 3,
            RacpOperator::WithinRange => 4,
            RacpOperator::FirstRecord => 5,
            RacpOperator::LastRecord => 6,
            RacpOperator::Unknown(value) => value,
        }
    }
}

/// Outcome of a RACP procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RacpResponseCode {
    /// Success
    Success,
    /// Op code not supported
    OpCodeNotSupported,
    /// Invalid operator
    InvalidOperator,
    /// Operator not supported
    OperatorNotSupported,
    /// Invalid operand
    InvalidOperand,
    /// No records found
    NoRecordsFound,
    /// Abort unsuccessful
    AbortUnsuccessful,
    /// Procedure not completed
    ProcedureNotCompleted,
    /// Operand not supported
    OperandNotSupported,
    /// Reserved value
    Unknown(u8),
}

impl From<u8> for RacpResponseCode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Success,
            2 => Self::OpCodeNotSupported,
            3 => Self::InvalidOperator,
            4 => Self::OperatorNotSupported,
            5 => Self::InvalidOperand,
            6 => Self::NoRecordsFound,
            7 => Self::AbortUnsuccessful,
            8 => Self::ProcedureNotCompleted,
            9 => Self::OperandNotSupported,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for RacpResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::OpCodeNotSupported => write!(f, "Op code not supported"),
            Self::InvalidOperator => write!(f, "Invalid operator"),
            Self::OperatorNotSupported => write!(f, "Operator not supported"),
            Self::InvalidOperand => write!(f, "Invalid operand"),
            Self::NoRecordsFound => write!(f, "No records found"),
            Self::AbortUnsuccessful => write!(f, "Abort unsuccessful"),
            Self::ProcedureNotCompleted => write!(f, "Procedure not completed"),
            Self::OperandNotSupported => write!(f, "Operand not supported"),
            Self::Unknown(value) => write!(f, "Unknown ({value})"),
        }
    }
}

impl RacpResponseCode {
    /// Whether the procedure ran to completion
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Success | Self::NoRecordsFound)
    }
}

/// Decoded RACP indication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RacpResponse {
    /// Number of stored records matching the request
    RecordCount(u32),
    /// Result of a procedure
    OperationResult {
        /// Op code of the request being answered
        request_op_code: RacpOpCode,
        /// Outcome
        response_code: RacpResponseCode,
    },
}

impl RacpResponse {
    /// Decode a RACP indication
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnrecognizedEnumValue`] for an op code other than
    /// a response, or a non-null operator, and
    /// [`DecodeError::UnexpectedLength`] if the operand size does not fit the op code.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode a RACP indication whose record count uses `order`
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        let response = Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected RACP frame {:02X?}: {}", data, e))?;

        if let Self::OperationResult {
            request_op_code,
            response_code,
        } = response
        {
            if !response_code.is_completed() {
                warn!(
                    "RACP request {:?} failed: {}",
                    request_op_code, response_code
                );
            }
        }
        Ok(response)
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 3)?;

        let operator = data[1];
        if operator != 0 {
            return Err(DecodeError::UnrecognizedEnumValue {
                field: "RACP operator",
                value: u32::from(operator),
            });
        }

        match RacpOpCode::from(data[0]) {
            RacpOpCode::NumberOfStoredRecordsResponse => {
                let mut operand = Reader::with_order(&data[2..], order);
                let count = match operand.remaining() {
                    1 => u32::from(operand.u8()?),
                    2 => u32::from(operand.u16()?),
                    4 => operand.u32()?,
                    width => {
                        return Err(DecodeError::UnexpectedLength {
                            expected: 4,
                            actual: width + 2,
                        })
                    }
                };
                Ok(Self::RecordCount(count))
            }
            RacpOpCode::ResponseCode => {
                if data.len() != 4 {
                    return Err(DecodeError::UnexpectedLength {
                        expected: 4,
                        actual: data.len(),
                    });
                }
                Ok(Self::OperationResult {
                    request_op_code: RacpOpCode::from(data[2]),
                    response_code: RacpResponseCode::from(data[3]),
                })
            }
            _ => Err(DecodeError::UnrecognizedEnumValue {
                field: "RACP op code",
                value: u32::from(data[0]),
            }),
        }
    }

    /// Whether the indication marks a completed procedure
    ///
    /// A record count always completes its request.
    #[must_use]
    pub const fn operation_completed(&self) -> bool {
        match self {
            Self::RecordCount(_) => true,
            Self::OperationResult { response_code, .. } => response_code.is_completed(),
        }
    }
}

/// Filter type for sequence-number based requests
const FILTER_SEQUENCE_NUMBER: u8 = 0x01;

/// RACP request, written verbatim to the control point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RacpRequest {
    /// Requested procedure
    pub op_code: RacpOpCode,
    /// Record selection
    pub operator: RacpOperator,
    /// Operand bytes following the operator
    pub operand: Vec<u8>,
}

impl RacpRequest {
    /// Create a request with an operand
    #[must_use]
    pub const fn new(op_code: RacpOpCode, operator: RacpOperator, operand: Vec<u8>) -> Self {
        Self {
            op_code,
            operator,
            operand,
        }
    }

    /// Create a request without an operand
    #[must_use]
    pub const fn command(op_code: RacpOpCode, operator: RacpOperator) -> Self {
        Self::new(op_code, operator, Vec::new())
    }

    /// Report all stored records
    #[must_use]
    pub const fn report_all() -> Self {
        Self::command(RacpOpCode::ReportStoredRecords, RacpOperator::AllRecords)
    }

    /// Report the first stored record
    #[must_use]
    pub const fn report_first() -> Self {
        Self::command(RacpOpCode::ReportStoredRecords, RacpOperator::FirstRecord)
    }

    /// Report the last stored record
    #[must_use]
    pub const fn report_last() -> Self {
        Self::command(RacpOpCode::ReportStoredRecords, RacpOperator::LastRecord)
    }

    /// Report records with a sequence number of at least `sequence_number`
    #[must_use]
    pub fn report_from_sequence(sequence_number: u16) -> Self {
        let mut operand = vec![FILTER_SEQUENCE_NUMBER];
        operand.extend_from_slice(&sequence_number.to_le_bytes());
        Self::new(
            RacpOpCode::ReportStoredRecords,
            RacpOperator::GreaterThanOrEqual,
            operand,
        )
    }

    /// Report the number of stored records
    #[must_use]
    pub const fn report_number_of_records() -> Self {
        Self::command(
            RacpOpCode::ReportNumberOfStoredRecords,
            RacpOperator::AllRecords,
        )
    }

    /// Delete all stored records
    #[must_use]
    pub const fn delete_all() -> Self {
        Self::command(RacpOpCode::DeleteStoredRecords, RacpOperator::AllRecords)
    }

    /// Abort the running procedure
    #[must_use]
    pub const fn abort() -> Self {
        Self::command(RacpOpCode::AbortOperation, RacpOperator::Null)
    }

    /// Serialize the request for writing to the control point
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.operand.len());
        buf.put_u8(self.op_code.into());
        buf.put_u8(self.operator.into());
        buf.put_slice(&self.operand);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_count_widths() {
        assert_eq!(
            RacpResponse::parse(&[0x05, 0x00, 0x01]),
            Ok(RacpResponse::RecordCount(1))
        );
        assert_eq!(
            RacpResponse::parse(&[0x05, 0x00, 0x2C, 0x01]),
            Ok(RacpResponse::RecordCount(300))
        );
        assert_eq!(
            RacpResponse::parse(&[0x05, 0x00, 0x00, 0x00, 0x01, 0x00]),
            Ok(RacpResponse::RecordCount(65_536))
        );
        assert!(RacpResponse::parse(&[0x05, 0x00, 0x01, 0x00, 0x00])
            .unwrap_err()
            .is_length_error());
    }

    #[test]
    fn test_big_endian_record_count() {
        assert_eq!(
            RacpResponse::parse_with_order(&[0x05, 0x00, 0x01, 0x2C], ByteOrder::BigEndian),
            Ok(RacpResponse::RecordCount(300))
        );
        assert_eq!(
            RacpResponse::parse_with_order(
                &[0x05, 0x00, 0x00, 0x01, 0x00, 0x00],
                ByteOrder::BigEndian
            ),
            Ok(RacpResponse::RecordCount(65_536))
        );
        assert_eq!(
            RacpResponse::parse_with_order(&[0x06, 0x00, 0x01, 0x02], ByteOrder::BigEndian),
            RacpResponse::parse(&[0x06, 0x00, 0x01, 0x02])
        );
    }

    #[test]
    fn test_op_code_not_supported() {
        let response = RacpResponse::parse(&[0x06, 0x00, 0x01, 0x02]).unwrap();

        assert_eq!(
            response,
            RacpResponse::OperationResult {
                request_op_code: RacpOpCode::ReportStoredRecords,
                response_code: RacpResponseCode::OpCodeNotSupported,
            }
        );
        assert!(!response.operation_completed());
    }

    #[test]
    fn test_completed_operations() {
        let success = RacpResponse::parse(&[0x06, 0x00, 0x02, 0x01]).unwrap();
        assert!(success.operation_completed());

        let no_records = RacpResponse::parse(&[0x06, 0x00, 0x01, 0x06]).unwrap();
        assert!(no_records.operation_completed());

        let unknown = RacpResponse::parse(&[0x06, 0x00, 0x01, 0x30]).unwrap();
        assert!(!unknown.operation_completed());
        assert!(RacpResponse::RecordCount(0).operation_completed());
    }

    #[test]
    fn test_invalid_responses() {
        assert!(RacpResponse::parse(&[0x06, 0x00]).is_err());
        // response code frame must be exactly four bytes
        assert!(RacpResponse::parse(&[0x06, 0x00, 0x01]).is_err());
        assert!(RacpResponse::parse(&[0x06, 0x00, 0x01, 0x01, 0x00]).is_err());
        assert!(matches!(
            RacpResponse::parse(&[0x01, 0x00, 0x01]),
            Err(DecodeError::UnrecognizedEnumValue { value: 1, .. })
        ));
        assert!(matches!(
            RacpResponse::parse(&[0x05, 0x01, 0x01]),
            Err(DecodeError::UnrecognizedEnumValue { value: 1, .. })
        ));
    }

    #[test]
    fn test_request_encodings() {
        assert_eq!(&RacpRequest::report_all().to_bytes()[..], &[0x01, 0x01]);
        assert_eq!(&RacpRequest::report_first().to_bytes()[..], &[0x01, 0x05]);
        assert_eq!(&RacpRequest::report_last().to_bytes()[..], &[0x01, 0x06]);
        assert_eq!(
            &RacpRequest::report_number_of_records().to_bytes()[..],
            &[0x04, 0x01]
        );
        assert_eq!(&RacpRequest::delete_all().to_bytes()[..], &[0x02, 0x01]);
        assert_eq!(&RacpRequest::abort().to_bytes()[..], &[0x03, 0x00]);
        assert_eq!(
            &RacpRequest::report_from_sequence(0x0102).to_bytes()[..],
            &[0x01, 0x03, 0x01, 0x02, 0x01]
        );
    }

    #[test]
    fn test_op_code_round_trip() {
        for value in 0..=u8::MAX {
            assert_eq!(u8::from(RacpOpCode::from(value)), value);
            assert_eq!(u8::from(RacpOperator::from(value)), value);
        }
    }
}
