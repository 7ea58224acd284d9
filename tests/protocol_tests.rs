//! End-to-end behaviour of the methods that do not involve locks.

mod common;

use common::{content, responses, TestServer};
use dav_engine::body::Body;
use dav_engine::DavMethodSet;
use http::StatusCode;

#[tokio::test]
async fn test_put_get_round_trip() {
    let server = TestServer::new();
    let data = content(70000);

    let resp = server.put("/dav/file.bin", data.clone()).await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let resp = server.put("/dav/file.bin", data.clone()).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = server.get("/dav/file.bin").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-length"), Some("70000"));
    assert_eq!(resp.header("accept-ranges"), Some("bytes"));
    assert!(resp.header("last-modified").is_some());
    assert_eq!(&resp.body[..], &data[..]);
}

#[tokio::test]
async fn test_head() {
    let server = TestServer::new();
    server.put_ok("/dav/page.html", "<p>hi</p>").await;

    let resp = server
        .request("HEAD", "/dav/page.html", &[], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("text/html"));
    assert_eq!(resp.header("content-length"), Some("9"));
    assert!(resp.body.is_empty());

    let resp = server
        .request("HEAD", "/dav/missing", &[], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_invalid_paths() {
    let server = TestServer::new();
    for path in [
        "/dav/a/../b",
        "/dav/..",
        "/dav/%2e%2e/etc/passwd",
        "/dav/x%2F..%2Fy",
        "/elsewhere/file",
        "/davfile",
    ] {
        let resp = server.get(path).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{path}");
    }
}

#[tokio::test]
async fn test_paths_are_normalized() {
    let server = TestServer::new();
    server.mkcol_ok("/dav/dir/").await;
    server.put_ok("/dav//dir///a%20b.txt", "x").await;

    let resp = server.get("/dav/dir/a%20b.txt").await;
    assert_eq!(resp.status, StatusCode::OK);
    let resp = server.get("/dav//dir/a%20b.txt/").await;
    assert_eq!(&resp.body[..], b"x");
}

#[tokio::test]
async fn test_put_preconditions() {
    let server = TestServer::new();

    let resp = server.put("/dav/nodir/file", "x").await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    server.mkcol_ok("/dav/dir").await;
    let resp = server.put("/dav/dir", "x").await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);

    let resp = server
        .request("PUT", "/dav/f", &[("Content-Range", "bytes 0-0/1")], "x")
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = server
        .request("PUT", "/dav/f", &[("Content-Encoding", "gzip")], "x")
        .await;
    assert_eq!(resp.status, StatusCode::NOT_IMPLEMENTED);

    let resp = server
        .request(
            "PUT",
            "/dav/f",
            &[("Content-Type", "multipart/form-data; boundary=x")],
            "x",
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_mkcol() {
    let server = TestServer::new();
    server.mkcol_ok("/dav/dir").await;

    let resp = server.request("MKCOL", "/dav/dir", &[], Body::empty()).await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);

    let resp = server.request("MKCOL", "/dav/a/b", &[], Body::empty()).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = server.request("MKCOL", "/dav/c", &[], "<x/>").await;
    assert_eq!(resp.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_delete() {
    let server = TestServer::new();
    server.mkcol_ok("/dav/dir").await;
    server.put_ok("/dav/dir/f", "f").await;

    let resp = server
        .request("DELETE", "/dav/dir", &[("Depth", "0")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = server
        .request("DELETE", "/dav/dir", &[("Depth", "infinity")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert_eq!(server.get("/dav/dir/f").await.status, StatusCode::NOT_FOUND);

    let resp = server.request("DELETE", "/dav/dir", &[], Body::empty()).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = server.request("DELETE", "/dav/", &[], Body::empty()).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_copy_overwrite() {
    let server = TestServer::new();
    server.put_ok("/dav/a", "aaa").await;
    server.put_ok("/dav/b", "bbb").await;

    let resp = server
        .request(
            "COPY",
            "/dav/a",
            &[("Destination", "/dav/b"), ("Overwrite", "F")],
            Body::empty(),
        )
        .await;
    assert_eq!(resp.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(&server.get("/dav/b").await.body[..], b"bbb");

    // no Overwrite header does not allow replacing b either.
    for method in ["COPY", "MOVE"] {
        let resp = server
            .request(method, "/dav/a", &[("Destination", "/dav/b")], Body::empty())
            .await;
        assert_eq!(resp.status, StatusCode::PRECONDITION_FAILED, "{method}");
    }
    assert_eq!(&server.get("/dav/a").await.body[..], b"aaa");
    assert_eq!(&server.get("/dav/b").await.body[..], b"bbb");

    let resp = server
        .request(
            "COPY",
            "/dav/a",
            &[("Destination", "http://localhost:4918/dav/b"), ("Overwrite", "T")],
            Body::empty(),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert_eq!(&server.get("/dav/b").await.body[..], b"aaa");

    let resp = server
        .request("COPY", "/dav/a", &[("Destination", "/dav/c")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(&server.get("/dav/a").await.body[..], b"aaa");
}

#[tokio::test]
async fn test_copy_preconditions() {
    let server = TestServer::new();
    server.put_ok("/dav/a", "a").await;

    let resp = server.request("COPY", "/dav/a", &[], Body::empty()).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = server
        .request("COPY", "/dav/nope", &[("Destination", "/dav/b")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = server
        .request("COPY", "/dav/a", &[("Destination", "/dav/x/y")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = server
        .request("COPY", "/dav/a", &[("Destination", "/dav/a")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = server
        .request("COPY", "/dav/a", &[("Destination", "/dav/../a")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = server
        .request("COPY", "/dav/a", &[("Destination", "/other/a")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_move_collection() {
    let server = TestServer::new();
    server.mkcol_ok("/dav/dir").await;
    server.put_ok("/dav/dir/f", "f").await;

    let resp = server
        .request("MOVE", "/dav/dir", &[("Destination", "/dav/moved")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(server.get("/dav/dir/f").await.status, StatusCode::NOT_FOUND);
    assert_eq!(&server.get("/dav/moved/f").await.body[..], b"f");
}

#[tokio::test]
async fn test_destination_root_uses_source_name() {
    let server = TestServer::new();
    server.mkcol_ok("/dav/dir").await;
    server.put_ok("/dav/dir/f", "f").await;

    let resp = server
        .request("COPY", "/dav/dir/f", &[("Destination", "/dav/")], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(&server.get("/dav/f").await.body[..], b"f");
}

#[tokio::test]
async fn test_propfind_depth() {
    let server = TestServer::new();
    server.mkcol_ok("/dav/dir").await;
    server.put_ok("/dav/dir/one.txt", "1").await;
    server.put_ok("/dav/dir/two.txt", "22").await;
    server.mkcol_ok("/dav/dir/sub").await;

    let resp = server.propfind("/dav/dir", "0").await;
    assert_eq!(resp.status, StatusCode::MULTI_STATUS);
    assert_eq!(
        resp.header("content-type"),
        Some("application/xml; charset=utf-8")
    );
    assert_eq!(responses(&resp.text()), 1);

    let resp = server.propfind("/dav/dir", "1").await;
    let xml = resp.text();
    assert_eq!(responses(&xml), 4);
    assert!(xml.contains("<D:href>/dav/dir/</D:href>"));
    assert!(xml.contains("<D:href>/dav/dir/sub/</D:href>"));
    assert!(xml.contains("<D:href>/dav/dir/two.txt</D:href>"));
    assert!(xml.contains("<D:getcontentlength>2</D:getcontentlength>"));
    assert!(xml.contains("<D:displayname>one.txt</D:displayname>"));

    // infinity is served as depth 1.
    let resp = server.propfind("/dav/", "infinity").await;
    assert_eq!(responses(&resp.text()), 2);

    let resp = server.propfind("/dav/nothing", "0").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_propfind_body() {
    let server = TestServer::new();
    let allprop = r#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:allprop/></D:propfind>"#;
    let resp = server.request("PROPFIND", "/dav/", &[("Depth", "0")], allprop).await;
    assert_eq!(resp.status, StatusCode::MULTI_STATUS);

    let resp = server
        .request("PROPFIND", "/dav/", &[("Depth", "0")], "<D:propfind")
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_proppatch() {
    let server = TestServer::new();
    server.put_ok("/dav/doc.txt", "doc").await;

    let probe = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:propertyupdate xmlns:D="DAV:" xmlns:Z="urn:schemas-microsoft-com:">
<D:set><D:prop><Z:Win32LastModifiedTime>Wed, 01 Jan 2020 00:00:00 GMT</Z:Win32LastModifiedTime></D:prop></D:set>
</D:propertyupdate>"#;
    let resp = server.request("PROPPATCH", "/dav/doc.txt", &[], probe).await;
    assert_eq!(resp.status, StatusCode::MULTI_STATUS);
    let xml = resp.text();
    assert_eq!(responses(&xml), 1);
    assert!(xml.contains("<Z:Win32LastModifiedTime />"));
    assert!(xml.contains("<D:status>HTTP/1.1 200 OK</D:status>"));

    let other = r#"<D:propertyupdate xmlns:D="DAV:">
<D:set><D:prop><D:displayname>x</D:displayname></D:prop></D:set>
</D:propertyupdate>"#;
    let resp = server.request("PROPPATCH", "/dav/doc.txt", &[], other).await;
    assert_eq!(resp.status, StatusCode::NOT_IMPLEMENTED);

    let resp = server.request("PROPPATCH", "/dav/gone", &[], probe).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_options() {
    let server = TestServer::new();
    let resp = server.request("OPTIONS", "/dav/", &[], Body::empty()).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("dav"), Some("1, 2"));
    assert_eq!(resp.header("ms-author-via"), Some("DAV"));
    let allow = resp.header("allow").unwrap();
    assert!(allow.contains("PROPFIND"));
    assert!(allow.contains("LOCK") && allow.contains("UNLOCK"));

    // no storage access, so unmapped paths are fine too.
    let server = TestServer::without_locks();
    let resp = server
        .request("OPTIONS", "/dav/not/there", &[], Body::empty())
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("dav"), Some("1"));
    let allow = resp.header("allow").unwrap();
    assert!(allow.contains("MKCOL"));
    assert!(!allow.contains("LOCK"));
}

#[tokio::test]
async fn test_methods_restricted() {
    let server = TestServer::with(|b| b.methods(DavMethodSet::WEBDAV_RO));

    let resp = server.put("/dav/f", "x").await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.header("connection"), Some("close"));

    let resp = server.propfind("/dav/", "0").await;
    assert_eq!(resp.status, StatusCode::MULTI_STATUS);

    let resp = server.request("OPTIONS", "/dav/", &[], Body::empty()).await;
    assert_eq!(resp.header("allow"), Some("OPTIONS, GET, HEAD, PROPFIND"));
}

#[tokio::test]
async fn test_unknown_method() {
    let server = TestServer::new();
    let resp = server.request("PATCH", "/dav/f", &[], Body::empty()).await;
    assert_eq!(resp.status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_body_not_accepted() {
    let server = TestServer::new();
    server.put_ok("/dav/f", "f").await;
    let resp = server.request("GET", "/dav/f", &[], "body").await;
    assert_eq!(resp.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(
        resp.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
    assert!(resp.text().contains("does not take a request body"));
}

#[tokio::test]
async fn test_collection_listing() {
    let server = TestServer::new();
    server.mkcol_ok("/dav/dir").await;

    let resp = server.get("/dav/dir").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("This collection is empty."));

    server.put_ok("/dav/dir/b.txt", "b").await;
    server.mkcol_ok("/dav/dir/a").await;
    let resp = server.get("/dav/dir/").await;
    assert_eq!(resp.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(resp.text(), "a/\nb.txt\n");

    let resp = server
        .request("GET", "/dav/dir", &[("Accept", "text/html,*/*")], Body::empty())
        .await;
    assert_eq!(resp.header("content-type"), Some("text/html; charset=utf-8"));
    assert!(resp.text().contains("<a href=\"/dav/dir/b.txt\">b.txt</a>"));

    let server = TestServer::with(|b| b.autoindex(false));
    let resp = server.get("/dav/").await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_handle_with_prefix() {
    let server = TestServer::new();
    server.put_ok("/dav/f", "f").await;

    let req = http::Request::builder()
        .method("GET")
        .uri("/dav/mount/f")
        .body(Body::empty())
        .unwrap();
    let resp = server.dh.handle_with(req, Some("/mount".to_string())).await;
    let resp = common::read_response(resp).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(&resp.body[..], b"f");
}
