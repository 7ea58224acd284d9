//! Contains the trait for the lock oracle.
//!
//! The engine does not keep locks itself. It asks the lock system whether a
//! path is locked (optionally under a given token) and forwards LOCK and
//! UNLOCK. Expiry, persistence and depth semantics belong to the
//! implementation.
use std::fmt::Debug;

use crate::davpath::DavPath;
use crate::fs::FsResult;

pub mod memls;

/// Scope of a WebDAV write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockScope {
    Shared,
    Exclusive,
}

impl LockScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockScope::Shared => "shared",
            LockScope::Exclusive => "exclusive",
        }
    }
}

/// The trait that defines a locksystem.
pub trait DavLockSystem: Debug + Send + Sync {
    /// Record a lock on `path` under `token`.
    fn lock(&self, path: &DavPath, token: &str, scope: LockScope) -> FsResult<()>;

    /// Drop the lock `token` on `path`. Unknown tokens are not an error.
    fn unlock(&self, path: &DavPath, token: &str) -> FsResult<()>;

    /// Scope of the lock that applies to `path`.
    ///
    /// With a token, only a lock carrying that token counts, and only if no
    /// exclusive lock under another token covers `path`. Without a token,
    /// any lock does and an exclusive lock wins over a shared one.
    fn get_lock(&self, path: &DavPath, token: Option<&str>) -> Option<LockScope>;

    /// Strongest lock held on a member somewhere below `path`.
    fn get_member_lock(&self, path: &DavPath) -> Option<LockScope>;
}
