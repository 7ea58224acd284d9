use std::error::Error as StdError;

use bytes::{Buf, Bytes};
use headers::HeaderMapExt;
use http::{header, Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::errors::DavError;
use crate::fs::*;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_put<ReqBody, ReqData, ReqError>(
        &self,
        req: &Request<()>,
        body: ReqBody,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let path = self.path(req)?;

        // only a single, plain body is accepted.
        let hdr = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_ascii_lowercase())
        };
        if hdr(header::CONTENT_TYPE).is_some_and(|ct| ct.starts_with("multipart/")) {
            return Err(DavError::new(
                StatusCode::NOT_IMPLEMENTED,
                "multipart PUT is not supported",
            ));
        }
        if hdr(header::CONTENT_ENCODING).is_some_and(|ce| ce != "identity") {
            return Err(DavError::new(
                StatusCode::NOT_IMPLEMENTED,
                "content-encoded PUT is not supported",
            ));
        }
        if req.headers().contains_key(header::CONTENT_RANGE) {
            return Err(DavError::new(
                StatusCode::BAD_REQUEST,
                "partial PUT is not supported",
            ));
        }

        if let Some(meta) = self.fs.metadata(&path, false).await? {
            if meta.is_collection {
                return Err(DavError::new(
                    StatusCode::METHOD_NOT_ALLOWED,
                    format!("{path} is a collection"),
                ));
            }
        }
        if !self.has_parent(&path).await {
            return Err(DavError::new(
                StatusCode::CONFLICT,
                format!("parent of {path} does not exist"),
            ));
        }

        self.check_lock(req, &path, None)?;

        let strm = async_stream::stream! {
            pin_utils::pin_mut!(body);
            while let Some(res) = body.data().await {
                match res {
                    Ok(mut buf) => {
                        let n = buf.remaining();
                        yield Ok::<Bytes, FsError>(buf.copy_to_bytes(n));
                    }
                    Err(e) => {
                        debug!("PUT: error reading request body: {e}");
                        yield Err(FsError::GeneralFailure);
                        break;
                    }
                }
            }
        };
        let created = self.fs.put(&path, Box::pin(strm)).await?;

        self.release_lock(req, &path);

        let mut res = Response::new(Body::empty());
        *res.status_mut() = if created {
            StatusCode::CREATED
        } else {
            StatusCode::NO_CONTENT
        };
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
