//! Simple in-memory locksystem.
//!
//! A lock on a collection also covers everything below it. Locks never
//! expire, so this is for tests and ephemeral servers only.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::davpath::DavPath;
use crate::fs::{FsError, FsResult};
use crate::ls::{DavLockSystem, LockScope};

#[derive(Debug, Clone)]
struct MemLock {
    token: String,
    scope: LockScope,
}

/// Ephemeral in-memory LockSystem.
#[derive(Debug, Default)]
pub struct MemLs {
    // relative path -> locks held directly on it.
    locks: Mutex<HashMap<String, Vec<MemLock>>>,
}

impl MemLs {
    /// Create a new "memls" locksystem.
    pub fn new() -> Arc<MemLs> {
        Arc::new(MemLs::default())
    }
}

// the path itself, then every ancestor up to the root.
fn self_and_ancestors(path: &DavPath) -> Vec<String> {
    let mut v = Vec::new();
    let mut p = path.clone();
    loop {
        v.push(p.as_rel_str().to_string());
        if p.is_root() {
            break;
        }
        p = p.parent();
    }
    v
}

impl DavLockSystem for MemLs {
    fn lock(&self, path: &DavPath, token: &str, scope: LockScope) -> FsResult<()> {
        let mut locks = self.locks.lock();
        let held = locks.entry(path.as_rel_str().to_string()).or_default();
        if held.iter().any(|l| l.token == token) {
            return Err(FsError::Exists);
        }
        trace!("LS: lock {path:?} {token} {}", scope.as_str());
        held.push(MemLock {
            token: token.to_string(),
            scope,
        });
        Ok(())
    }

    fn unlock(&self, path: &DavPath, token: &str) -> FsResult<()> {
        let mut locks = self.locks.lock();
        let key = path.as_rel_str();
        if let Some(held) = locks.get_mut(key) {
            held.retain(|l| l.token != token);
            if held.is_empty() {
                locks.remove(key);
            }
            trace!("LS: unlock {path:?} {token}");
        }
        Ok(())
    }

    fn get_lock(&self, path: &DavPath, token: Option<&str>) -> Option<LockScope> {
        let locks = self.locks.lock();
        let held = self_and_ancestors(path)
            .into_iter()
            .filter_map(|key| locks.get(&key))
            .flatten();
        let mut found = None;
        for l in held {
            match token {
                Some(t) if l.token == t => {
                    found.get_or_insert(l.scope);
                }
                Some(_) if l.scope == LockScope::Exclusive => return None,
                Some(_) => {}
                None if l.scope == LockScope::Exclusive => return Some(l.scope),
                None => {
                    found.get_or_insert(l.scope);
                }
            }
        }
        found
    }

    fn get_member_lock(&self, path: &DavPath) -> Option<LockScope> {
        let locks = self.locks.lock();
        let rel = path.as_rel_str();
        let below = locks
            .iter()
            .filter(|(key, _)| {
                (rel.is_empty() && !key.is_empty())
                    || key.strip_prefix(rel).is_some_and(|rest| rest.starts_with('/'))
            })
            .flat_map(|(_, held)| held);
        let mut found = None;
        for l in below {
            if l.scope == LockScope::Exclusive {
                return Some(l.scope);
            }
            found = Some(l.scope);
        }
        found
    }
}
