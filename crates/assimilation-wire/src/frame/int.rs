// SPDX-License-Identifier: GPL-3.0-or-later

//! Integer frames (`FRAMETYPE_CINTVAL` family): fixed-width big-endian
//! signed/unsigned integers, width inferred from the TLV's own length field
//! on decode (no separate width byte, matching `original_source`'s
//! `intframe.c` which keys width off `f_len`).

use super::Frame;
use crate::error::DecodeError;
use crate::tlv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W24,
    W32,
    W64,
}

impl IntWidth {
    fn from_len(len: usize) -> Result<Self, DecodeError> {
        match len {
            1 => Ok(Self::W8),
            2 => Ok(Self::W16),
            3 => Ok(Self::W24),
            4 => Ok(Self::W32),
            8 => Ok(Self::W64),
            _ => Err(DecodeError::Malformed("integer frame has illegal width")),
        }
    }
}

pub fn encode_uint(width: IntWidth, value: u64) -> Vec<u8> {
    match width {
        IntWidth::W8 => vec![value as u8],
        IntWidth::W16 => {
            let mut b = vec![0u8; 2];
            tlv::put_u16(&mut b, 0, value as u16).expect("fixed-size buffer");
            b
        }
        IntWidth::W24 => {
            let mut b = vec![0u8; 3];
            tlv::put_u24(&mut b, 0, value as u32).expect("fixed-size buffer");
            b
        }
        IntWidth::W32 => {
            let mut b = vec![0u8; 4];
            tlv::put_u32(&mut b, 0, value as u32).expect("fixed-size buffer");
            b
        }
        IntWidth::W64 => {
            let mut b = vec![0u8; 8];
            tlv::put_u64(&mut b, 0, value).expect("fixed-size buffer");
            b
        }
    }
}

pub fn encode_int(width: IntWidth, value: i64) -> Vec<u8> {
    encode_uint(width, value as u64)
}

pub fn decode_uint(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    let width = IntWidth::from_len(value.len())?;
    let parsed = match width {
        IntWidth::W8 => u64::from(tlv::get_u8(value, 0)?),
        IntWidth::W16 => u64::from(tlv::get_u16(value, 0)?),
        IntWidth::W24 => u64::from(tlv::get_u24(value, 0)?),
        IntWidth::W32 => u64::from(tlv::get_u32(value, 0)?),
        IntWidth::W64 => tlv::get_u64(value, 0)?,
    };
    Ok(Frame::UInt {
        type_code,
        width,
        value: parsed,
    })
}

pub fn decode_int(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    let width = IntWidth::from_len(value.len())?;
    let unsigned = match width {
        IntWidth::W8 => u64::from(tlv::get_u8(value, 0)?),
        IntWidth::W16 => u64::from(tlv::get_u16(value, 0)?),
        IntWidth::W24 => u64::from(tlv::get_u24(value, 0)?),
        IntWidth::W32 => u64::from(tlv::get_u32(value, 0)?),
        IntWidth::W64 => tlv::get_u64(value, 0)?,
    };
    let signed = match width {
        IntWidth::W8 => i64::from(unsigned as u8 as i8),
        IntWidth::W16 => i64::from(unsigned as u16 as i16),
        IntWidth::W24 => {
            let shifted = (unsigned as u32) << 8;
            i64::from(shifted as i32) >> 8
        }
        IntWidth::W32 => i64::from(unsigned as u32 as i32),
        IntWidth::W64 => unsigned as i64,
    };
    Ok(Frame::Int {
        type_code,
        width,
        value: signed,
    })
}
