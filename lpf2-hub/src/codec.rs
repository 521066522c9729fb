//! Little-endian integer reads and writes on raw frames

use crate::error::HubError;

fn field<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], HubError> {
    offset
        .checked_add(N)
        .and_then(|end| buf.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(HubError::OutOfBounds {
            offset,
            width: N,
            len: buf.len(),
        })
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, HubError> {
    Ok(u8::from_le_bytes(field(buf, offset)?))
}

pub fn read_i8(buf: &[u8], offset: usize) -> Result<i8, HubError> {
    Ok(i8::from_le_bytes(field(buf, offset)?))
}

pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, HubError> {
    Ok(u16::from_le_bytes(field(buf, offset)?))
}

pub fn read_i16_le(buf: &[u8], offset: usize) -> Result<i16, HubError> {
    Ok(i16::from_le_bytes(field(buf, offset)?))
}

pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32, HubError> {
    Ok(u32::from_le_bytes(field(buf, offset)?))
}

pub fn read_i32_le(buf: &[u8], offset: usize) -> Result<i32, HubError> {
    Ok(i32::from_le_bytes(field(buf, offset)?))
}

#[inline]
pub fn i16_to_bytes(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

#[inline]
pub fn i32_to_bytes(value: i32) -> [u8; 4] {
    value.to_le_bytes()
}
