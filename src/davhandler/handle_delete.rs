use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davheaders::Depth;
use crate::errors::DavError;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_delete(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        // RFC4918 9.6.1 DELETE on a collection always means infinity.
        let depth = req.headers().get("depth").map(|_| req.headers().typed_get::<Depth>());
        match depth {
            None | Some(Some(Depth::Infinity)) => {}
            _ => {
                return Err(DavError::new(
                    StatusCode::BAD_REQUEST,
                    "DELETE requires Depth: infinity",
                ))
            }
        }

        let path = self.path(req)?;
        self.existing(&path, false).await?;
        if path.is_root() {
            return Err(DavError::new(
                StatusCode::FORBIDDEN,
                "the root collection cannot be deleted",
            ));
        }

        self.check_lock(req, &path, None)?;
        self.fs.delete(&path).await?;
        self.release_lock(req, &path);

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::NO_CONTENT;
        Ok(res)
    }
}
