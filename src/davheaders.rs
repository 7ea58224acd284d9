//! Typed WebDAV request headers.
use std::fmt;

use headers::Header;
use http::header::{HeaderName, HeaderValue};

lazy_static! {
    static ref DEPTH: HeaderName = HeaderName::from_static("depth");
    static ref DESTINATION: HeaderName = HeaderName::from_static("destination");
    static ref OVERWRITE: HeaderName = HeaderName::from_static("overwrite");
    static ref LOCK_TOKEN: HeaderName = HeaderName::from_static("lock-token");
    static ref IF: HeaderName = HeaderName::from_static("if");
    pub(crate) static ref DAV: HeaderName = HeaderName::from_static("dav");
    pub(crate) static ref MS_AUTHOR_VIA: HeaderName = HeaderName::from_static("ms-author-via");
}

// helper: the single value of a header, as a string.
fn one<'i, I>(values: &mut I) -> Result<&'i str, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let v = values.next().ok_or_else(headers::Error::invalid)?;
    if values.next().is_some() {
        return Err(headers::Error::invalid());
    }
    v.to_str().map(str::trim).map_err(|_| headers::Error::invalid())
}

// helper: encode a string that came from a header, or was built by us.
fn encode_str<E: Extend<HeaderValue>>(s: &str, values: &mut E) {
    if let Ok(v) = HeaderValue::from_str(s) {
        values.extend(std::iter::once(v));
    }
}

/// Depth: header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Depth {
    Zero,
    One,
    Infinity,
}

impl Header for Depth {
    fn name() -> &'static HeaderName {
        &DEPTH
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        match one(values)? {
            "0" => Ok(Depth::Zero),
            "1" => Ok(Depth::One),
            v if v.eq_ignore_ascii_case("infinity") => Ok(Depth::Infinity),
            _ => Err(headers::Error::invalid()),
        }
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        let s = match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        };
        values.extend(std::iter::once(HeaderValue::from_static(s)));
    }
}

/// Overwrite: header. Only `T` allows overwriting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Overwrite(pub bool);

impl Header for Overwrite {
    fn name() -> &'static HeaderName {
        &OVERWRITE
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        Ok(Overwrite(one(values)? == "T"))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        let s = if self.0 { "T" } else { "F" };
        values.extend(std::iter::once(HeaderValue::from_static(s)));
    }
}

/// Destination: header, an absolute URL or an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Destination(pub String);

impl Header for Destination {
    fn name() -> &'static HeaderName {
        &DESTINATION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?;
        if s.is_empty() {
            return Err(headers::Error::invalid());
        }
        Ok(Destination(s.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_str(&self.0, values);
    }
}

/// Lock-Token: header. The value is the token without the angle brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LockToken(pub String);

impl Header for LockToken {
    fn name() -> &'static HeaderName {
        &LOCK_TOKEN
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?;
        match s.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            Some(t) if !t.is_empty() && !t.contains(['<', '>']) => Ok(LockToken(t.to_string())),
            _ => Err(headers::Error::invalid()),
        }
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_str(&format!("<{}>", self.0), values);
    }
}

/// If: header, kept raw. See `conditional` for the parts we understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct If(pub String);

impl Header for If {
    fn name() -> &'static HeaderName {
        &IF
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        // multiple If: headers are one long list.
        let mut v = Vec::new();
        for value in values {
            v.push(value.to_str().map_err(|_| headers::Error::invalid())?);
        }
        if v.is_empty() {
            return Err(headers::Error::invalid());
        }
        Ok(If(v.join(" ")))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_str(&self.0, values);
    }
}

impl fmt::Display for If {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
