//! Cursor-based pagination for the session listing.

use serde::{Deserialize, Serialize};

/// Default page size when `count` is not specified.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    /// Opaque cursor from a previous response (base64-encoded offset).
    pub cursor: Option<String>,
    /// Number of items per page (default 100, max 1000).
    pub count: Option<u32>,
}

impl PaginationParams {
    /// Resolve effective page size, clamped to [1, MAX_PAGE_SIZE].
    pub fn effective_count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Decode the cursor to a session offset. An absent cursor starts at 0;
    /// a malformed one is `None`.
    pub fn offset(&self) -> Option<u64> {
        match self.cursor.as_deref() {
            None => Some(0),
            Some(c) => decode_cursor(c),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    /// Cursor to pass for the next page, or `None` if this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

pub fn encode_cursor(offset: u64) -> String {
    base64_encode(offset.to_string().as_bytes())
}

pub fn decode_cursor(cursor: &str) -> Option<u64> {
    let bytes = base64_decode(cursor)?;
    std::str::from_utf8(&bytes).ok()?.parse::<u64>().ok()
}

/// Next-page cursor, or `None` once the listing reaches `total`.
pub fn next_cursor(current_offset: u64, returned: usize, total: u64) -> Option<String> {
    let next = current_offset + returned as u64;
    (returned > 0 && next < total).then(|| encode_cursor(next))
}

// Minimal base64 helpers; cursors are short decimal strings.

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = ((chunk[0] as u32) << 16) | (b1 << 8) | b2;
        for i in 0..4 {
            if i <= chunk.len() {
                let sextet = (triple >> (18 - 6 * i)) & 0x3F;
                out.push(ALPHABET[sextet as usize] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

fn base64_decode(input: &str) -> Option<Vec<u8>> {
    let digits = input
        .trim_end_matches('=')
        .bytes()
        .map(|c| ALPHABET.iter().position(|&a| a == c).map(|v| v as u32))
        .collect::<Option<Vec<u32>>>()?;
    let mut out = Vec::with_capacity(digits.len() * 3 / 4);
    for chunk in digits.chunks(4) {
        if chunk.len() < 2 {
            return None;
        }
        let mut accum = 0u32;
        for &d in chunk {
            accum = (accum << 6) | d;
        }
        accum <<= 6 * (4 - chunk.len()) as u32;
        out.push((accum >> 16) as u8);
        if chunk.len() > 2 {
            out.push((accum >> 8) as u8);
        }
        if chunk.len() > 3 {
            out.push(accum as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_roundtrip() {
        for offset in [0u64, 1, 42, 100, 999, 123456789] {
            let encoded = encode_cursor(offset);
            assert_eq!(decode_cursor(&encoded), Some(offset), "roundtrip failed for {offset}");
        }
    }

    #[test]
    fn cursor_is_standard_base64() {
        assert_eq!(encode_cursor(100), "MTAw");
        assert_eq!(encode_cursor(42), "NDI=");
    }

    #[test]
    fn malformed_cursor_is_rejected() {
        let p = PaginationParams {
            cursor: Some("!!".into()),
            count: None,
        };
        assert_eq!(p.offset(), None);
        assert_eq!(decode_cursor("QQ=="), None); // "A" is not a number
    }

    #[test]
    fn next_cursor_stops_at_total() {
        assert!(next_cursor(0, 50, 50).is_none());
        assert!(next_cursor(10, 0, 5).is_none());
        let c = next_cursor(0, 100, 150).unwrap();
        assert_eq!(decode_cursor(&c), Some(100));
    }

    #[test]
    fn effective_count_defaults_and_clamps() {
        assert_eq!(PaginationParams::default().effective_count(), 100);
        let p = PaginationParams {
            cursor: None,
            count: Some(5000),
        };
        assert_eq!(p.effective_count(), 1000);
        let p = PaginationParams {
            cursor: None,
            count: Some(0),
        };
        assert_eq!(p.effective_count(), 1);
    }
}
