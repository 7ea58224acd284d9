use headers::HeaderMapExt;
use http::{header, Request, Response, StatusCode};
use regex::Regex;
use xmltree::Element;

use crate::body::Body;
use crate::davheaders;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::ls::{DavLockSystem, LockScope};
use crate::multistatus;
use crate::DavResult;

lazy_static! {
    static ref EXCLUSIVE: Regex = Regex::new(r"(?i)<(?:[a-z0-9_-]+:)?exclusive\b").unwrap();
}

// Scope asked for in a LOCK body. Anything we cannot make sense of is a
// shared lock; a body never makes the request fail.
fn requested_scope(xmldata: &[u8]) -> LockScope {
    let exclusive = match Element::parse(xmldata) {
        Ok(root) => root
            .get_child("lockscope")
            .map(|s| s.get_child("exclusive").is_some())
            .unwrap_or(false),
        Err(_) => EXCLUSIVE.is_match(&String::from_utf8_lossy(xmldata)),
    };
    if exclusive {
        LockScope::Exclusive
    } else {
        LockScope::Shared
    }
}

impl crate::DavHandler {
    fn locksystem(&self) -> DavResult<&dyn DavLockSystem> {
        self.ls
            .as_deref()
            .ok_or(DavError::StatusClose(StatusCode::METHOD_NOT_ALLOWED))
    }

    // lockdiscovery response.
    fn lock_response(
        &self,
        path: &DavPath,
        token: &str,
        scope: LockScope,
        new_token: bool,
    ) -> DavResult<Response<Body>> {
        let xml = multistatus::lockdiscovery(path, token, scope, self.lock_timeout.as_secs())?;
        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        h.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/xml; charset=utf-8"),
        );
        h.typed_insert(headers::ContentLength(xml.len() as u64));
        if new_token {
            h.typed_insert(davheaders::LockToken(token.to_string()));
        }
        *res.body_mut() = Body::from(xml);
        Ok(res)
    }

    pub(crate) async fn handle_lock(
        &self,
        req: &Request<()>,
        xmldata: &[u8],
    ) -> DavResult<Response<Body>> {
        let ls = self.locksystem()?;
        let path = self.path(req)?;

        // no body: refresh of a lock we handed out earlier.
        if xmldata.is_empty() {
            let lref = self.lock_ref(req).ok_or_else(|| {
                DavError::new(
                    StatusCode::BAD_REQUEST,
                    "LOCK without a body needs an If header",
                )
            })?;
            self.check_lock_ref(&path, Some(&lref))?;
            let scope = self.lock_scope(&path, &lref)?;
            debug!("refresh lock {} on {path}", lref.token());
            return self.lock_response(&path, lref.token(), scope, false);
        }

        // the new lock covers all members, so their locks conflict too.
        let scope = requested_scope(xmldata);
        let held = [ls.get_lock(&path, None), ls.get_member_lock(&path)];
        if held.contains(&Some(LockScope::Exclusive)) {
            return Err(DavError::new(
                StatusCode::LOCKED,
                format!("{path} or a member is exclusively locked"),
            ));
        }
        if scope == LockScope::Exclusive && held.contains(&Some(LockScope::Shared)) {
            return Err(DavError::new(
                StatusCode::LOCKED,
                format!("{path} or a member already has a shared lock"),
            ));
        }

        let token = format!("opaquelocktoken:{}", uuid::Uuid::new_v4());
        ls.lock(&path, &token, scope)?;
        debug!("new {} lock {token} on {path}", scope.as_str());

        self.lock_response(&path, &token, scope, true)
    }

    pub(crate) async fn handle_unlock(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let ls = self.locksystem()?;
        let path = self.path(req)?;

        let token = match req.headers().typed_get::<davheaders::LockToken>() {
            Some(t) => t.0,
            None => {
                return Err(DavError::new(
                    StatusCode::BAD_REQUEST,
                    "missing or invalid Lock-Token header",
                ))
            }
        };

        self.check_lock(req, &path, Some(&token))?;
        if ls.get_lock(&path, Some(&token)).is_none() {
            return Err(DavError::new(
                StatusCode::LOCKED,
                format!("{path} is not locked with {token}"),
            ));
        }
        ls.unlock(&path, &token)?;

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::NO_CONTENT;
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_from_lockinfo() {
        let body = br#"<?xml version="1.0" encoding="utf-8" ?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
</D:lockinfo>"#;
        assert_eq!(requested_scope(body), LockScope::Exclusive);

        let body = br#"<lockinfo xmlns="DAV:"><lockscope><shared/></lockscope></lockinfo>"#;
        assert_eq!(requested_scope(body), LockScope::Shared);
    }

    #[test]
    fn malformed_body_still_locks() {
        assert_eq!(
            requested_scope(b"<D:lockinfo><D:lockscope><D:exclusive/>"),
            LockScope::Exclusive
        );
        assert_eq!(requested_scope(b"whatever"), LockScope::Shared);
    }
}
