//! Single byte-range requests.
//!
//! Only one range per request is served. A list of ranges is refused with
//! 501, anything that is not a `bytes=` range is ignored.
use http::{HeaderMap, StatusCode};
use regex::Regex;

use crate::errors::DavError;
use crate::DavResult;

lazy_static! {
    static ref BYTES_RANGE: Regex = Regex::new(r"^(?i:bytes)\s*=\s*([0-9]*)\s*-\s*([0-9]*)\s*$").unwrap();
}

/// A parsed `Range: bytes=start-end` value. `end` is inclusive, as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ByteRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Parse the Range: header of a request.
    pub(crate) fn from_headers(headers: &HeaderMap) -> DavResult<Option<ByteRange>> {
        match headers.get(http::header::RANGE) {
            None => Ok(None),
            Some(v) => match v.to_str() {
                Ok(s) => ByteRange::parse(s),
                Err(_) => Ok(None),
            },
        }
    }

    pub(crate) fn parse(value: &str) -> DavResult<Option<ByteRange>> {
        let value = value.trim();
        if !value.get(..5).is_some_and(|u| u.eq_ignore_ascii_case("bytes")) {
            return Ok(None);
        }
        if value.contains(',') {
            return Err(DavError::new(
                StatusCode::NOT_IMPLEMENTED,
                "multiple ranges are not supported",
            ));
        }
        let Some(c) = BYTES_RANGE.captures(value) else {
            return Ok(None);
        };
        // a leading '-' is a suffix range, so start can never be negative.
        // numbers too large for u64 saturate, which no resource satisfies.
        let num = |i: usize| -> Option<u64> {
            match &c[i] {
                "" => None,
                s => Some(s.parse::<u64>().unwrap_or(u64::MAX)),
            }
        };
        let (start, end) = (num(1), num(2));
        if start.is_none() && end.is_none() {
            return Ok(None);
        }
        Ok(Some(ByteRange { start, end }))
    }

    /// Resolve against the total length. Returns `(start, end)` with `end`
    /// exclusive.
    pub(crate) fn resolve(&self, total: u64) -> DavResult<(u64, u64)> {
        let unsatisfiable = || DavError::Unsatisfiable(total);
        let (start, end) = match (self.start, self.end) {
            // last N bytes.
            (None, Some(n)) => {
                if n == 0 || n > total {
                    return Err(unsatisfiable());
                }
                (total - n, total)
            }
            // from start to the end.
            (Some(s), None) => (s, total),
            (Some(s), Some(e)) => {
                if e >= total || e < s {
                    return Err(unsatisfiable());
                }
                (s, e + 1)
            }
            (None, None) => (0, total),
        };
        if start >= total {
            return Err(unsatisfiable());
        }
        Ok((start, end))
    }
}
