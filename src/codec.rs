//! Fixed-width integer and IEEE-11073 medical float reads over byte slices.
//!
//! Every read checks `offset + width` against the buffer and reports
//! [`DecodeError::OutOfRange`] instead of panicking. Profile parsers validate
//! the flag-implied frame length up front, so in practice they only see this
//! error when the layout tables are wrong.

use bytes::Buf;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

/// Byte order of multi-byte fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Least significant byte first (the GATT default)
    #[default]
    LittleEndian,
    /// Most significant byte first
    BigEndian,
}

/// Integer encodings understood by [`read_int`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntFormat {
    /// Unsigned 8-bit
    Uint8,
    /// Unsigned 16-bit
    Uint16,
    /// Unsigned 24-bit
    Uint24,
    /// Unsigned 32-bit
    Uint32,
    /// Signed 8-bit
    Sint8,
    /// Signed 16-bit
    Sint16,
    /// Signed 24-bit
    Sint24,
    /// Signed 32-bit
    Sint32,
}

impl IntFormat {
    /// Width of the encoding in bytes
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Uint8 | Self::Sint8 => 1,
            Self::Uint16 | Self::Sint16 => 2,
            Self::Uint24 | Self::Sint24 => 3,
            Self::Uint32 | Self::Sint32 => 4,
        }
    }

    /// Whether the encoding is two's-complement signed
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Sint8 | Self::Sint16 | Self::Sint24 | Self::Sint32
        )
    }
}

fn window(data: &[u8], offset: usize, width: usize) -> Result<&[u8]> {
    offset
        .checked_add(width)
        .filter(|end| *end <= data.len())
        .map(|end| &data[offset..end])
        .ok_or(DecodeError::OutOfRange {
            offset,
            width,
            len: data.len(),
        })
}

/// Read an integer of the given format at `offset`.
///
/// Signed formats are sign-extended from their wire width.
///
/// # Errors
///
/// Returns [`DecodeError::OutOfRange`] if the read runs past the end of `data`.
#[allow(clippy::cast_possible_wrap)]
pub fn read_int(data: &[u8], offset: usize, format: IntFormat, order: ByteOrder) -> Result<i64> {
    let width = format.width();
    let mut buf = window(data, offset, width)?;

    let value = match (format.is_signed(), order) {
        (false, ByteOrder::LittleEndian) => buf.get_uint_le(width) as i64,
        (false, ByteOrder::BigEndian) => buf.get_uint(width) as i64,
        (true, ByteOrder::LittleEndian) => buf.get_int_le(width),
        (true, ByteOrder::BigEndian) => buf.get_int(width),
    };

    Ok(value)
}

/// Read a 16-bit medical float (SFLOAT) at `offset`.
///
/// # Errors
///
/// Returns [`DecodeError::OutOfRange`] if the read runs past the end of `data`.
pub fn read_sfloat(data: &[u8], offset: usize, order: ByteOrder) -> Result<f32> {
    let mut buf = window(data, offset, 2)?;
    let raw = match order {
        ByteOrder::LittleEndian => buf.get_u16_le(),
        ByteOrder::BigEndian => buf.get_u16(),
    };
    Ok(sfloat_from_raw(raw))
}

/// Read a 32-bit medical float (FLOAT) at `offset`.
///
/// # Errors
///
/// Returns [`DecodeError::OutOfRange`] if the read runs past the end of `data`.
pub fn read_float(data: &[u8], offset: usize, order: ByteOrder) -> Result<f32> {
    let mut buf = window(data, offset, 4)?;
    let raw = match order {
        ByteOrder::LittleEndian => buf.get_u32_le(),
        ByteOrder::BigEndian => buf.get_u32(),
    };
    Ok(float_from_raw(raw))
}

/// Decode a raw SFLOAT: 4-bit signed exponent over a 12-bit signed mantissa.
///
/// `0x07FE` and `0x0802` are positive and negative infinity; `0x07FF` (NaN),
/// `0x0800` (NRes) and `0x0801` (reserved) all decode to NaN.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sfloat_from_raw(raw: u16) -> f32 {
    match raw {
        0x07FE => f32::INFINITY,
        0x0802 => f32::NEG_INFINITY,
        0x07FF | 0x0800 | 0x0801 => f32::NAN,
        _ => {
            let mantissa = sign_extend(u32::from(raw & 0x0FFF), 12);
            let exponent = sign_extend(u32::from(raw >> 12), 4);
            (f64::from(mantissa) * 10f64.powi(exponent)) as f32
        }
    }
}

/// Decode a raw FLOAT: 8-bit signed exponent over a 24-bit signed mantissa.
///
/// Special values mirror [`sfloat_from_raw`] at 24-bit width.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn float_from_raw(raw: u32) -> f32 {
    match raw {
        0x007F_FFFE => f32::INFINITY,
        0x0080_0002 => f32::NEG_INFINITY,
        0x007F_FFFF | 0x0080_0000 | 0x0080_0001 => f32::NAN,
        _ => {
            let mantissa = sign_extend(raw & 0x00FF_FFFF, 24);
            let exponent = sign_extend(raw >> 24, 8);
            (f64::from(mantissa) * 10f64.powi(exponent)) as f32
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Cursor over a payload that advances past every field it reads
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    /// Start reading `data` from the beginning, little-endian
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self::with_order(data, ByteOrder::LittleEndian)
    }

    /// Start reading `data` from the beginning with an explicit byte order
    #[must_use]
    pub const fn with_order(data: &'a [u8], order: ByteOrder) -> Self {
        Self {
            data,
            offset: 0,
            order,
        }
    }

    /// Current offset into the payload
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the current offset
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    fn take(&mut self, width: usize) -> Result<&'a [u8]> {
        let slice = window(self.data, self.offset, width)?;
        self.offset += width;
        Ok(slice)
    }

    /// Skip `count` bytes
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than `count` bytes remain.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Read a fixed-size byte array
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than `N` bytes remain.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        self.take(N)?.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read an unsigned 8-bit integer
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] at the end of the payload.
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    /// Read a signed 8-bit integer
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] at the end of the payload.
    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?.get_i8())
    }

    /// Read an unsigned 16-bit integer
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 2 bytes remain.
    pub fn u16(&mut self) -> Result<u16> {
        let mut buf = self.take(2)?;
        Ok(match self.order {
            ByteOrder::LittleEndian => buf.get_u16_le(),
            ByteOrder::BigEndian => buf.get_u16(),
        })
    }

    /// Read a signed 16-bit integer
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 2 bytes remain.
    pub fn i16(&mut self) -> Result<i16> {
        let mut buf = self.take(2)?;
        Ok(match self.order {
            ByteOrder::LittleEndian => buf.get_i16_le(),
            ByteOrder::BigEndian => buf.get_i16(),
        })
    }

    /// Read an unsigned 24-bit integer
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 3 bytes remain.
    #[allow(clippy::cast_possible_truncation)]
    pub fn u24(&mut self) -> Result<u32> {
        let mut buf = self.take(3)?;
        Ok(match self.order {
            ByteOrder::LittleEndian => buf.get_uint_le(3),
            ByteOrder::BigEndian => buf.get_uint(3),
        } as u32)
    }

    /// Read an unsigned 32-bit integer
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 4 bytes remain.
    pub fn u32(&mut self) -> Result<u32> {
        let mut buf = self.take(4)?;
        Ok(match self.order {
            ByteOrder::LittleEndian => buf.get_u32_le(),
            ByteOrder::BigEndian => buf.get_u32(),
        })
    }

    /// Read a 16-bit medical float
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 2 bytes remain.
    pub fn sfloat(&mut self) -> Result<f32> {
        Ok(sfloat_from_raw(self.u16()?))
    }

    /// Read a 32-bit medical float
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 4 bytes remain.
    pub fn float(&mut self) -> Result<f32> {
        Ok(float_from_raw(self.u32()?))
    }
}
