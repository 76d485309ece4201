//! Conversion between Rust strings and the SDK's nul-terminated wide
//! strings. `AT_WC` is `wchar_t`: UTF-16 on Windows, UTF-32 elsewhere.

use crate::{
    error::{Error, Result},
    sdk::AtWc,
};

/// Upper bound when scanning a wide string of unknown length.
const MAX_SCAN_LEN: usize = 4096;

/// Encode `s` as a nul-terminated wide string.
pub fn to_wide(s: &str) -> Result<Vec<AtWc>> {
    if s.contains('\0') {
        return Err(Error::InteriorNul {
            value: s.to_string(),
        });
    }
    let mut result = encode(s);
    result.push(0);
    Ok(result)
}

#[cfg(windows)]
fn encode(s: &str) -> Vec<AtWc> {
    s.encode_utf16().collect()
}

#[cfg(not(windows))]
fn encode(s: &str) -> Vec<AtWc> {
    s.chars().map(|c| c as u32 as AtWc).collect()
}

/// Decode the wide string in `buf`, stopping at the first nul or at the end
/// of the buffer, whichever comes first.
pub fn from_wide(buf: &[AtWc]) -> String {
    let len = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
    decode(&buf[..len])
}

#[cfg(windows)]
fn decode(buf: &[AtWc]) -> String {
    String::from_utf16_lossy(buf)
}

#[cfg(not(windows))]
fn decode(buf: &[AtWc]) -> String {
    buf.iter()
        .map(|c| char::from_u32(*c as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Decode a nul-terminated wide string owned by the SDK.
///
/// # Safety
///
/// `ptr` must be null or point to a nul-terminated wide string.
pub unsafe fn from_wide_ptr(ptr: *const AtWc) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0;
    while len < MAX_SCAN_LEN && unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    let buf = unsafe { std::slice::from_raw_parts(ptr, len) };
    decode(buf)
}

/// Copy `s` into `buf` the way the SDK fills string buffers: truncated to
/// fit and nul-terminated when there is room.
pub fn copy_to_buf(s: &str, buf: &mut [AtWc]) {
    let encoded = encode(s);
    let n = encoded.len().min(buf.len());
    buf[..n].copy_from_slice(&encoded[..n]);
    if n < buf.len() {
        buf[n] = 0;
    }
}
