//! Shared helpers for the integration tests.
//!
//! Requests are handed to a `DavHandler` in-process; there is no network
//! server involved.
#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http::{HeaderMap, Request, StatusCode};

use dav_engine::body::Body;
use dav_engine::{DavBuilder, DavHandler, FileSystem, LockSystem};

pub const PREFIX: &str = "/dav";

pub const LOCKINFO_EXCLUSIVE: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner>tests</D:owner>
</D:lockinfo>"#;

pub const LOCKINFO_SHARED: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:shared/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
</D:lockinfo>"#;

/// A fully read response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct TestServer {
    pub dh: DavHandler,
}

impl TestServer {
    /// Memory filesystem and locksystem under `/dav`.
    pub fn new() -> TestServer {
        TestServer::with(|b| b.locksystem(LockSystem::Mem))
    }

    /// Class 1 only.
    pub fn without_locks() -> TestServer {
        TestServer::with(|b| b)
    }

    pub fn with(f: impl FnOnce(DavBuilder) -> DavBuilder) -> TestServer {
        let _ = env_logger::builder().is_test(true).try_init();
        let builder = DavHandler::builder(FileSystem::Mem).strip_prefix(PREFIX);
        TestServer {
            dh: f(builder).build(),
        }
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: impl Into<Body>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let req = req.body(body.into()).unwrap();
        let resp = self.dh.handle(req).await;
        read_response(resp).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, &[], Body::empty()).await
    }

    pub async fn get_range(&self, path: &str, range: &str) -> TestResponse {
        self.request("GET", path, &[("Range", range)], Body::empty())
            .await
    }

    pub async fn put(&self, path: &str, content: impl Into<Body>) -> TestResponse {
        self.request("PUT", path, &[], content).await
    }

    pub async fn put_ok(&self, path: &str, content: impl Into<Body>) {
        let resp = self.put(path, content).await;
        assert!(
            resp.status == StatusCode::CREATED || resp.status == StatusCode::NO_CONTENT,
            "PUT {path} failed: {} {}",
            resp.status,
            resp.text()
        );
    }

    pub async fn mkcol_ok(&self, path: &str) {
        let resp = self.request("MKCOL", path, &[], Body::empty()).await;
        assert_eq!(resp.status, StatusCode::CREATED, "MKCOL {path}");
    }

    pub async fn propfind(&self, path: &str, depth: &str) -> TestResponse {
        self.request("PROPFIND", path, &[("Depth", depth)], Body::empty())
            .await
    }

    /// LOCK `path` and return the token, without angle brackets.
    pub async fn lock(&self, path: &str, lockinfo: &'static str) -> String {
        let resp = self.request("LOCK", path, &[], lockinfo).await;
        assert_eq!(resp.status, StatusCode::OK, "LOCK {path}: {}", resp.text());
        let token = resp.header("lock-token").expect("Lock-Token header");
        token
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string()
    }
}

pub async fn read_response(resp: http::Response<Body>) -> TestResponse {
    let (parts, mut body) = resp.into_parts();
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk.unwrap());
    }
    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body: buf.freeze(),
    }
}

/// `n` bytes of recognizable content.
pub fn content(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}

/// Number of `<D:response>` elements in a multistatus body.
pub fn responses(xml: &str) -> usize {
    xml.matches("<D:response>").count()
}
