//! Bit-serial CRC-16 with the six parameter sets used by sensor profiles.

use crate::error::{DecodeError, Result};

/// Parameters of a CRC-16 variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    /// Generator polynomial (without the implicit x^16 term)
    pub poly: u16,
    /// Register value before the first byte
    pub init: u16,
    /// Feed each input byte least significant bit first
    pub reflect_input: bool,
    /// Bit-reverse the register before the final XOR
    pub reflect_output: bool,
    /// Value XORed into the result
    pub xor_out: u16,
}

impl Crc16 {
    /// CRC-16/KERMIT
    pub const KERMIT: Self = Self::new(0x1021, 0x0000, true, true, 0x0000);
    /// CRC-16/CCITT-FALSE
    pub const CCITT_FALSE: Self = Self::new(0x1021, 0xFFFF, false, false, 0x0000);
    /// CRC-16/MCRF4XX, the E2E-CRC of the glucose profiles
    pub const MCRF4XX: Self = Self::new(0x1021, 0xFFFF, true, true, 0x0000);
    /// CRC-16/AUG-CCITT
    pub const AUG_CCITT: Self = Self::new(0x1021, 0x1D0F, false, false, 0x0000);
    /// CRC-16/ARC
    pub const ARC: Self = Self::new(0x8005, 0x0000, true, true, 0x0000);
    /// CRC-16/MAXIM
    pub const MAXIM: Self = Self::new(0x8005, 0x0000, true, true, 0xFFFF);

    /// Create a parameter set
    #[must_use]
    pub const fn new(
        poly: u16,
        init: u16,
        reflect_input: bool,
        reflect_output: bool,
        xor_out: u16,
    ) -> Self {
        Self {
            poly,
            init,
            reflect_input,
            reflect_output,
            xor_out,
        }
    }

    /// Compute the CRC over all of `data`
    #[must_use]
    pub fn checksum(&self, data: &[u8]) -> u16 {
        let mut crc = self.init;

        for &byte in data {
            for bit_index in 0..8 {
                let bit = if self.reflect_input {
                    (byte >> bit_index) & 1 == 1
                } else {
                    (byte >> (7 - bit_index)) & 1 == 1
                };
                let top = crc & 0x8000 != 0;
                crc <<= 1;
                if top ^ bit {
                    crc ^= self.poly;
                }
            }
        }

        if self.reflect_output {
            crc = crc.reverse_bits();
        }
        crc ^ self.xor_out
    }

    /// Compute the CRC over `length` bytes of `data` starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if the range does not fit in `data`.
    pub fn checksum_range(&self, data: &[u8], offset: usize, length: usize) -> Result<u16> {
        let range = offset
            .checked_add(length)
            .filter(|end| *end <= data.len())
            .map(|end| &data[offset..end])
            .ok_or(DecodeError::OutOfRange {
                offset,
                width: length,
                len: data.len(),
            })?;
        Ok(self.checksum(range))
    }
}

/// Compute a CRC-16 with explicit parameters over `data[offset..offset + length]`
///
/// # Errors
///
/// Returns [`DecodeError::OutOfRange`] if the range does not fit in `data`.
#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
pub fn crc16(
    poly: u16,
    init: u16,
    data: &[u8],
    offset: usize,
    length: usize,
    reflect_input: bool,
    reflect_output: bool,
    xor_out: u16,
) -> Result<u16> {
    Crc16::new(poly, init, reflect_input, reflect_output, xor_out).checksum_range(
        data, offset, length,
    )
}
