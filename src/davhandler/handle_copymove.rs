use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::conditional::LockRef;
use crate::davheaders;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::util::DavMethod;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_copymove(
        &self,
        req: &Request<()>,
        method: DavMethod,
    ) -> DavResult<Response<Body>> {
        let path = self.path(req)?;

        let dest = match req.headers().typed_get::<davheaders::Destination>() {
            Some(d) => d.0,
            None => {
                return Err(DavError::new(
                    StatusCode::BAD_REQUEST,
                    "missing or invalid Destination header",
                ))
            }
        };
        let mut dest = self.resolve_url(&dest)?;
        // some clients send the bare base URL.
        if dest.is_root() {
            dest = dest.join(path.file_name());
        }

        // only an explicit "Overwrite: T" allows replacing the destination.
        let overwrite = req
            .headers()
            .typed_get::<davheaders::Overwrite>()
            .map(|o| o.0)
            .unwrap_or(false);

        self.existing(&path, false).await?;
        if dest.is_within(&path) {
            return Err(DavError::new(
                StatusCode::FORBIDDEN,
                format!("cannot {} {path} onto itself", method.as_str()),
            ));
        }
        if !self.has_parent(&dest).await {
            return Err(DavError::new(
                StatusCode::CONFLICT,
                format!("parent of {dest} does not exist"),
            ));
        }
        if !overwrite && self.fs.exists(&dest).await? {
            return Err(DavError::new(
                StatusCode::PRECONDITION_FAILED,
                format!("{dest} exists and Overwrite is not T"),
            ));
        }

        if method == DavMethod::Move {
            self.check_lock(req, &path, None)?;
        }
        let dest_ref = self.dest_lock_ref(req, &dest)?;
        self.check_lock_ref(&dest, dest_ref.as_ref())?;

        let overwritten = match method {
            DavMethod::Move => {
                let o = self.fs.rename(&path, &dest).await?;
                self.release_lock(req, &path);
                o
            }
            _ => self.fs.copy(&path, &dest).await?,
        };
        debug!(
            "{} {path} -> {dest}: {}",
            method.as_str(),
            if overwritten { "overwritten" } else { "created" }
        );

        let mut res = Response::new(Body::empty());
        *res.status_mut() = if overwritten {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::CREATED
        };
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }

    // The lock reference that applies to the destination. Untagged tokens
    // belong to the request URI; only a tagged If: list whose resource
    // covers the destination speaks for it.
    fn dest_lock_ref(&self, req: &Request<()>, dest: &DavPath) -> DavResult<Option<LockRef>> {
        match self.lock_ref(req) {
            Some(LockRef::Tagged { resource, token }) => {
                let locked = self.tagged_resource(&resource)?;
                if dest.is_within(&locked) {
                    Ok(Some(LockRef::Tagged { resource, token }))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }
}
