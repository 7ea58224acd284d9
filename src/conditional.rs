//
// Lock checks for mutating requests.
//
// A request can present a lock token in three ways: as an explicit argument
// (UNLOCK), in the Lock-Token: header, or in the If: header. The If: header
// is either a plain list "(<token>)" or a tagged list "<url> (<token>)"
// that names the locked resource the token belongs to.
//
use headers::HeaderMapExt;
use http::{Request, StatusCode};
use regex::Regex;

use crate::davheaders;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::ls::LockScope;
use crate::{DavHandler, DavResult};

/// The token a client sends to say "I hold no lock".
pub(crate) const NO_LOCK: &str = "DAV:no-lock";

lazy_static! {
    static ref TAGGED_LIST: Regex = Regex::new(r"^\s*<([^>]+)>\s*\(\s*<([^>]+)>").unwrap();
    static ref UNTAGGED_LIST: Regex = Regex::new(r"\(\s*<([^>]+)>").unwrap();
}

/// A lock token as presented by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LockRef {
    Token(String),
    // token for a lock on `resource`, raw URL as sent.
    Tagged { resource: String, token: String },
}

impl LockRef {
    pub(crate) fn token(&self) -> &str {
        match self {
            LockRef::Token(t) => t,
            LockRef::Tagged { token, .. } => token,
        }
    }
}

/// Pick the lock reference out of an If: header value.
pub(crate) fn parse_if(value: &str) -> Option<LockRef> {
    if let Some(c) = TAGGED_LIST.captures(value) {
        return Some(LockRef::Tagged {
            resource: c[1].to_string(),
            token: c[2].to_string(),
        });
    }
    UNTAGGED_LIST
        .captures(value)
        .map(|c| LockRef::Token(c[1].to_string()))
}

impl DavHandler {
    /// The lock reference presented in the request headers, if any.
    pub(crate) fn lock_ref(&self, req: &Request<()>) -> Option<LockRef> {
        if let Some(t) = req.headers().typed_get::<davheaders::LockToken>() {
            return Some(LockRef::Token(t.0));
        }
        req.headers()
            .typed_get::<davheaders::If>()
            .and_then(|h| parse_if(&h.0))
    }

    // Resolve the resource of a tagged If: list.
    pub(crate) fn tagged_resource(&self, url: &str) -> DavResult<DavPath> {
        self.resolve_url(url).map_err(|_| {
            DavError::new(
                StatusCode::BAD_REQUEST,
                format!("invalid resource in If header: {url}"),
            )
        })
    }

    /// Can `path` be modified by this request.
    ///
    /// `token` overrides whatever the request headers carry.
    pub(crate) fn check_lock(
        &self,
        req: &Request<()>,
        path: &DavPath,
        token: Option<&str>,
    ) -> DavResult<()> {
        if self.ls.is_none() {
            return Ok(());
        }
        let lref = match token {
            Some(t) => Some(LockRef::Token(t.to_string())),
            None => self.lock_ref(req),
        };
        self.check_lock_ref(path, lref.as_ref())
    }

    pub(crate) fn check_lock_ref(&self, path: &DavPath, lref: Option<&LockRef>) -> DavResult<()> {
        let Some(ls) = &self.ls else {
            return Ok(());
        };

        if lref.map(LockRef::token) == Some(NO_LOCK) {
            return Err(DavError::new(
                StatusCode::PRECONDITION_FAILED,
                "resource is locked",
            ));
        }

        match lref {
            Some(LockRef::Tagged { resource, token }) => {
                let locked = self.tagged_resource(resource)?;
                if !path.is_within(&locked) {
                    return Err(DavError::new(
                        StatusCode::BAD_REQUEST,
                        format!("{path} is not covered by the lock on {locked}"),
                    ));
                }
                if ls.get_lock(&locked, Some(token)).is_none()
                    || ls.get_lock(path, Some(token)).is_none()
                {
                    debug!("lock token {token} does not match {locked}");
                    return Err(DavError::new(StatusCode::LOCKED, "lock token does not match"));
                }
                Ok(())
            }
            Some(LockRef::Token(token)) => {
                if ls.get_lock(path, Some(token)).is_none() {
                    debug!("lock token {token} does not match {path}");
                    return Err(DavError::new(StatusCode::LOCKED, "lock token does not match"));
                }
                Ok(())
            }
            None => match ls.get_lock(path, None) {
                Some(scope) => {
                    debug!("{path} is locked ({}), no token", scope.as_str());
                    Err(DavError::new(StatusCode::LOCKED, "resource is locked"))
                }
                None => Ok(()),
            },
        }
    }

    /// Scope of the lock a (valid) reference points to.
    pub(crate) fn lock_scope(&self, path: &DavPath, lref: &LockRef) -> DavResult<LockScope> {
        let Some(ls) = &self.ls else {
            return Err(StatusCode::METHOD_NOT_ALLOWED.into());
        };
        let scope = match lref {
            LockRef::Tagged { resource, token } => {
                let locked = self.tagged_resource(resource)?;
                ls.get_lock(&locked, Some(token))
            }
            LockRef::Token(token) => ls.get_lock(path, Some(token)),
        };
        scope.ok_or_else(|| DavError::new(StatusCode::LOCKED, "lock token does not match"))
    }

    /// A successful write consumes the caller's lock on `path`.
    pub(crate) fn release_lock(&self, req: &Request<()>, path: &DavPath) {
        let (Some(ls), Some(lref)) = (&self.ls, self.lock_ref(req)) else {
            return;
        };
        if lref.token() == NO_LOCK {
            return;
        }
        if let Err(e) = ls.unlock(path, lref.token()) {
            debug!("release of lock {} on {path} failed: {e}", lref.token());
        }
    }
}
