use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::errors::DavError;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_mkcol(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let path = self.path(req)?;

        if self.fs.exists(&path).await? {
            return Err(DavError::new(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("{path} already exists"),
            ));
        }
        if !self.has_parent(&path).await {
            return Err(DavError::new(
                StatusCode::CONFLICT,
                format!("parent of {path} is not a collection"),
            ));
        }

        // a new member changes the parent collection.
        self.check_lock(req, &path.parent(), None)?;
        self.fs.mkcol(&path).await?;

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::CREATED;
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
