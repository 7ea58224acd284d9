use std::io;
use std::io::SeekFrom;

use async_stream::stream;
use bytes::Bytes;
use headers::HeaderMapExt;
use htmlescape::encode_minimal;
use http::{header, Request, Response, StatusCode};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::fs::*;
use crate::range::ByteRange;
use crate::DavResult;

pub(crate) const READ_BUF_SIZE: usize = 16384;

const EMPTY_COLLECTION: &str = "This collection is empty.";

impl crate::DavHandler {
    pub(crate) async fn handle_get(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let head = req.method() == http::Method::HEAD;
        let path = self.path(req)?;

        let meta = self.existing(&path, false).await?;
        if meta.is_collection {
            return self.handle_index(req, &path, &meta, head).await;
        }

        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        h.typed_insert(headers::LastModified::from(meta.modified));
        h.typed_insert(headers::AcceptRanges::bytes());
        if let Ok(ct) = header::HeaderValue::from_str(&meta.content_type) {
            h.insert(header::CONTENT_TYPE, ct);
        }

        // the total length may have to be found by seeking.
        let range = ByteRange::from_headers(req.headers())?;
        let mut file = None;
        let total = match meta.len() {
            Some(len) => len,
            None => {
                let mut f = self.fs.get(&path).await?;
                let len = f.seek(SeekFrom::End(0)).await?;
                file = Some(f);
                len
            }
        };

        let (start, end) = match range {
            Some(r) => {
                let (start, end) = r.resolve(total)?;
                debug!("range {start}-{end} of {total} for {path}");
                let h = res.headers_mut();
                h.typed_insert(
                    headers::ContentRange::bytes(start..end, total)
                        .map_err(|_| DavError::Unsatisfiable(total))?,
                );
                *res.status_mut() = StatusCode::PARTIAL_CONTENT;
                (start, end)
            }
            None => (0, total),
        };
        res.headers_mut()
            .typed_insert(headers::ContentLength(end - start));

        if head {
            return Ok(res);
        }

        let mut file = match file {
            Some(f) => f,
            None => self.fs.get(&path).await?,
        };
        file.seek(SeekFrom::Start(start)).await?;

        let bufsize = self.read_buf_size;
        *res.body_mut() = Body::stream(stream! {
            let mut left = end - start;
            while left > 0 {
                let n = if left < bufsize as u64 { left as usize } else { bufsize };
                let buf = match file.read_bytes(n).await {
                    Ok(buf) => buf,
                    Err(e) => {
                        yield Err(io::Error::from(e));
                        break;
                    }
                };
                if buf.is_empty() {
                    // file shrunk underneath us.
                    yield Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"));
                    break;
                }
                left -= buf.len() as u64;
                yield Ok::<Bytes, io::Error>(buf);
            }
        });

        Ok(res)
    }

    // GET on a collection: a list of its children.
    async fn handle_index(
        &self,
        req: &Request<()>,
        path: &DavPath,
        meta: &DavMetaData,
        head: bool,
    ) -> DavResult<Response<Body>> {
        if !self.autoindex {
            return Err(DavError::new(
                StatusCode::METHOD_NOT_ALLOWED,
                "GET on a collection is not allowed",
            ));
        }

        let mut names = Vec::new();
        for name in self.fs.list(path).await? {
            let child = path.join(&name);
            match self.fs.metadata(&child, false).await {
                Ok(Some(m)) => names.push((name, m.is_collection)),
                Ok(None) => {}
                Err(e) => debug!("index: metadata of {child} failed: {e}"),
            }
        }
        names.sort();

        let html = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false);

        let text = if html {
            html_index(path, &names)
        } else {
            let mut w = String::new();
            for (name, coll) in &names {
                w.push_str(name);
                if *coll {
                    w.push('/');
                }
                w.push('\n');
            }
            if names.is_empty() {
                w.push_str(EMPTY_COLLECTION);
                w.push('\n');
            }
            w
        };

        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        h.typed_insert(headers::LastModified::from(meta.modified));
        h.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(if html {
                "text/html; charset=utf-8"
            } else {
                "text/plain; charset=utf-8"
            }),
        );
        h.typed_insert(headers::ContentLength(text.len() as u64));
        if !head {
            *res.body_mut() = Body::from(text);
        }
        Ok(res)
    }
}

fn html_index(path: &DavPath, names: &[(String, bool)]) -> String {
    let title = encode_minimal(&path.to_string());
    let mut w = String::new();
    w.push_str("<!DOCTYPE html>\n<html><head>\n");
    w.push_str(&format!("<title>Index of {title}</title>\n"));
    w.push_str("</head><body>\n");
    w.push_str(&format!("<h1>Index of {title}</h1>\n"));
    if names.is_empty() {
        w.push_str(&format!("<p>{EMPTY_COLLECTION}</p>\n"));
    } else {
        w.push_str("<ul>\n");
        if !path.is_root() {
            let up = path.parent().as_url_string(true);
            w.push_str(&format!("<li><a href=\"{}\">../</a></li>\n", encode_minimal(&up)));
        }
        for (name, coll) in names {
            let href = path.join(name).as_url_string(*coll);
            let slash = if *coll { "/" } else { "" };
            w.push_str(&format!(
                "<li><a href=\"{}\">{}{}</a></li>\n",
                encode_minimal(&href),
                encode_minimal(name),
                slash
            ));
        }
        w.push_str("</ul>\n");
    }
    w.push_str("</body></html>\n");
    w
}
