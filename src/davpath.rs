//! Utility module to handle the path part of an URL as a resource path.
//!
//! A [`DavPath`] is the result of resolving a request path against the
//! configured base prefix: percent-decoded, without repeated or trailing
//! slashes, without `..`, and with the prefix stripped. Storage backends
//! only ever see paths in this form.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::errors::DavError;

// Characters that get escaped when a path is turned back into an URL.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Resolved resource path, relative to the base prefix.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DavPath {
    // normalized prefix, always starts and ends with '/'.
    prefix: String,
    // relative path, no leading or trailing slash. empty for the root.
    rel: String,
}

impl fmt::Display for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.rel)
    }
}

impl fmt::Debug for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

// collapse "//" into "/".
fn collapse_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_slash = false;
    for c in s.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

/// Normalize a configured base prefix: leading and trailing slash, no "//".
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    collapse_slashes(&format!("/{}/", prefix.trim_matches('/')))
}

impl DavPath {
    /// The root of the tree served under `prefix`.
    pub fn root(prefix: &str) -> DavPath {
        DavPath {
            prefix: normalize_prefix(prefix),
            rel: String::new(),
        }
    }

    /// Resolve the path of a request URI.
    pub(crate) fn from_uri_and_prefix(uri: &http::Uri, prefix: &str) -> Result<DavPath, DavError> {
        DavPath::from_str_and_prefix(uri.path(), prefix)
    }

    /// Resolve a raw (percent-encoded) path against `prefix`.
    ///
    /// Fails when the path cannot be decoded, lies outside the prefix, or
    /// contains `..` anywhere.
    pub(crate) fn from_str_and_prefix(src: &str, prefix: &str) -> Result<DavPath, DavError> {
        let prefix = normalize_prefix(prefix);
        let decoded = percent_decode_str(src)
            .decode_utf8()
            .map_err(|_| DavError::InvalidPath(src.to_string()))?;
        if decoded.contains("..") || decoded.contains('\0') {
            return Err(DavError::InvalidPath(src.to_string()));
        }
        let path = collapse_slashes(&decoded);

        // With the trailing slash re-added, the base itself matches the prefix.
        let candidate = format!("{}/", path.trim_end_matches('/'));
        if !candidate.starts_with(&prefix) {
            debug!("path {src} is outside of {prefix}");
            return Err(DavError::InvalidPath(src.to_string()));
        }
        let rel = candidate[prefix.len()..].trim_end_matches('/').to_string();
        Ok(DavPath { prefix, rel })
    }

    /// Relative path, without leading slash. Empty for the root.
    pub fn as_rel_str(&self) -> &str {
        &self.rel
    }

    /// The base prefix this path was resolved against.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_root(&self) -> bool {
        self.rel.is_empty()
    }

    /// Last path segment. Empty for the root.
    pub fn file_name(&self) -> &str {
        match self.rel.rfind('/') {
            Some(i) => &self.rel[i + 1..],
            None => &self.rel,
        }
    }

    /// The parent collection. The root is its own parent.
    pub fn parent(&self) -> DavPath {
        let rel = match self.rel.rfind('/') {
            Some(i) => self.rel[..i].to_string(),
            None => String::new(),
        };
        DavPath {
            prefix: self.prefix.clone(),
            rel,
        }
    }

    /// Child `name` of this path.
    pub fn join(&self, name: &str) -> DavPath {
        let name = name.trim_matches('/');
        let rel = if self.rel.is_empty() {
            name.to_string()
        } else if name.is_empty() {
            self.rel.clone()
        } else {
            format!("{}/{}", self.rel, name)
        };
        DavPath {
            prefix: self.prefix.clone(),
            rel,
        }
    }

    /// Is this path equal to `other` or somewhere below it.
    pub fn is_within(&self, other: &DavPath) -> bool {
        other.rel.is_empty()
            || self.rel == other.rel
            || (self.rel.starts_with(&other.rel)
                && self.rel.as_bytes().get(other.rel.len()) == Some(&b'/'))
    }

    /// Percent-encoded URL path including the prefix. Collections get a
    /// trailing slash.
    pub fn as_url_string(&self, collection: bool) -> String {
        let mut s = utf8_percent_encode(&self.prefix, PATH_ENCODE_SET).to_string();
        s.push_str(&utf8_percent_encode(&self.rel, PATH_ENCODE_SET).to_string());
        if collection && !s.ends_with('/') {
            s.push('/');
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix() {
        let p = DavPath::from_str_and_prefix("/dav/a/b.txt", "/dav").unwrap();
        assert_eq!(p.as_rel_str(), "a/b.txt");
        assert_eq!(p.file_name(), "b.txt");
        assert_eq!(p.parent().as_rel_str(), "a");
        assert_eq!(p.to_string(), "/dav/a/b.txt");
    }

    #[test]
    fn base_itself_is_the_root() {
        for src in ["/dav", "/dav/", "/dav//"] {
            let p = DavPath::from_str_and_prefix(src, "/dav/").unwrap();
            assert!(p.is_root(), "{src}");
        }
        let p = DavPath::from_str_and_prefix("/", "").unwrap();
        assert!(p.is_root());
        assert_eq!(p.as_url_string(true), "/");
    }

    #[test]
    fn normalizes_slashes_and_decodes() {
        let p = DavPath::from_str_and_prefix("/dav//x%20y///z/", "dav").unwrap();
        assert_eq!(p.as_rel_str(), "x y/z");
        assert_eq!(p.as_url_string(false), "/dav/x%20y/z");
        assert_eq!(p.as_url_string(true), "/dav/x%20y/z/");
    }

    #[test]
    fn resolves_any_valid_suffix() {
        for rel in ["a", "a/b", "some dir/file.txt", "ünïcode/ß"] {
            let src = format!("/base/{rel}");
            let p = DavPath::from_str_and_prefix(&src, "/base/").unwrap();
            assert_eq!(p.as_rel_str(), rel);
        }
    }

    #[test]
    fn rejects_traversal() {
        for src in ["/dav/..", "/dav/a/../b", "/dav/%2e%2e/etc", "/dav/a..b"] {
            let e = DavPath::from_str_and_prefix(src, "/dav").unwrap_err();
            assert_eq!(e.statuscode().as_u16(), 400, "{src}");
        }
    }

    #[test]
    fn rejects_out_of_scope() {
        for src in ["/", "/other/a", "/davx", "/davx/a"] {
            let e = DavPath::from_str_and_prefix(src, "/dav").unwrap_err();
            assert_eq!(e.statuscode().as_u16(), 400, "{src}");
        }
    }

    #[test]
    fn join_and_within() {
        let root = DavPath::root("/dav");
        let a = root.join("a");
        let ab = a.join("b");
        assert_eq!(ab.as_rel_str(), "a/b");
        assert!(ab.is_within(&a));
        assert!(ab.is_within(&root));
        assert!(a.is_within(&a));
        assert!(!root.join("ab").is_within(&a));
        assert!(!a.is_within(&ab));
        assert!(root.parent().is_root());
    }
}
