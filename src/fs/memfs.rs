//! Simple in-memory filesystem.
//!
//! This implementation has state, so if you create a
//! new instance in a handler(), it will be empty every time.
//!
//! This means you have to create the instance once, using `MemFs::new`, store
//! it in your handler struct, and clone() it every time you pass
//! it to the DavHandler. As a MemFs struct is just a handle, cloning is cheap.
use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use futures_util::{FutureExt, StreamExt};
use parking_lot::Mutex;

use crate::davpath::DavPath;
use crate::fs::*;

const DIR_CONTENT_TYPE: &str = "httpd/unix-directory";

#[derive(Debug, Clone)]
struct MemNode {
    // None for collections.
    data: Option<Bytes>,
    created: SystemTime,
    modified: SystemTime,
    accessed: SystemTime,
}

impl MemNode {
    fn new(data: Option<Bytes>) -> MemNode {
        let now = SystemTime::now();
        MemNode {
            data,
            created: now,
            modified: now,
            accessed: now,
        }
    }

    fn is_collection(&self) -> bool {
        self.data.is_none()
    }
}

/// Ephemeral in-memory filesystem.
#[derive(Debug, Clone)]
pub struct MemFs {
    // relative path -> node. the root is "".
    tree: Arc<Mutex<BTreeMap<String, MemNode>>>,
}

#[derive(Debug)]
struct MemFsFile {
    data: Bytes,
    pos: usize,
}

fn parent_of(rel: &str) -> &str {
    match rel.rfind('/') {
        Some(i) => &rel[..i],
        None => "",
    }
}

fn is_below(rel: &str, top: &str) -> bool {
    rel.len() > top.len()
        && rel.starts_with(top)
        && (top.is_empty() || rel.as_bytes()[top.len()] == b'/')
}

impl MemFs {
    /// Create a new "memfs" filesystem.
    pub fn new() -> Arc<MemFs> {
        let mut tree = BTreeMap::new();
        tree.insert(String::new(), MemNode::new(None));
        Arc::new(MemFs {
            tree: Arc::new(Mutex::new(tree)),
        })
    }

    fn meta(rel: &str, node: &MemNode) -> DavMetaData {
        let name = rel.rsplit('/').next().unwrap_or_default();
        let content_type = if node.is_collection() {
            DIR_CONTENT_TYPE.to_string()
        } else {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .to_string()
        };
        DavMetaData {
            modified: node.modified,
            size: node.data.as_ref().map(|d| d.len() as u64),
            content_type,
            is_collection: node.is_collection(),
            created: Some(node.created),
            accessed: Some(node.accessed),
            hidden: name.starts_with('.'),
        }
    }

    // copy the subtree at `from` to `to`, replacing whatever was at `to`.
    // returns true if `to` existed.
    fn copy_tree(tree: &mut BTreeMap<String, MemNode>, from: &str, to: &str) -> FsResult<bool> {
        let src: Vec<(String, MemNode)> = tree
            .iter()
            .filter(|(k, _)| k.as_str() == from || is_below(k, from))
            .map(|(k, v)| (format!("{}{}", to, &k[from.len()..]), v.clone()))
            .collect();
        if src.is_empty() {
            return Err(FsError::NotFound);
        }
        let overwritten = MemFs::remove_tree(tree, to);
        let now = SystemTime::now();
        for (k, mut node) in src {
            node.created = now;
            tree.insert(k, node);
        }
        Ok(overwritten)
    }

    // returns true if something was removed.
    fn remove_tree(tree: &mut BTreeMap<String, MemNode>, top: &str) -> bool {
        let existed = tree.remove(top).is_some();
        tree.retain(|k, _| !is_below(k, top));
        existed
    }

    fn check_parent(tree: &BTreeMap<String, MemNode>, rel: &str) -> FsResult<()> {
        match tree.get(parent_of(rel)) {
            Some(n) if n.is_collection() => Ok(()),
            _ => Err(FsError::Conflict),
        }
    }
}

impl DavFileSystem for MemFs {
    fn metadata<'a>(
        &'a self,
        path: &'a DavPath,
        _extended: bool,
    ) -> FsFuture<'a, Option<DavMetaData>> {
        async move {
            let tree = self.tree.lock();
            let rel = path.as_rel_str();
            Ok(tree.get(rel).map(|node| MemFs::meta(rel, node)))
        }
        .boxed()
    }

    fn get<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>> {
        async move {
            trace!("FS: get {path:?}");
            let mut tree = self.tree.lock();
            let node = tree.get_mut(path.as_rel_str()).ok_or(FsError::NotFound)?;
            let data = node.data.clone().ok_or(FsError::Forbidden)?;
            node.accessed = SystemTime::now();
            Ok(Box::new(MemFsFile { data, pos: 0 }) as Box<dyn DavFile>)
        }
        .boxed()
    }

    fn put<'a>(
        &'a self,
        path: &'a DavPath,
        mut body: FsStream<'a, FsResult<Bytes>>,
    ) -> FsFuture<'a, bool> {
        async move {
            trace!("FS: put {path:?}");
            let rel = path.as_rel_str();
            {
                let tree = self.tree.lock();
                MemFs::check_parent(&tree, rel)?;
                if tree.get(rel).map(|n| n.is_collection()).unwrap_or(false) {
                    return Err(FsError::Exists);
                }
            }
            let mut buf = BytesMut::new();
            while let Some(chunk) = body.next().await {
                buf.extend_from_slice(&chunk?);
            }
            let mut tree = self.tree.lock();
            // the parent might have gone away while we were reading.
            MemFs::check_parent(&tree, rel)?;
            match tree.get_mut(rel) {
                Some(node) if node.is_collection() => Err(FsError::Exists),
                Some(node) => {
                    node.data = Some(buf.freeze());
                    node.modified = SystemTime::now();
                    Ok(false)
                }
                None => {
                    tree.insert(rel.to_string(), MemNode::new(Some(buf.freeze())));
                    Ok(true)
                }
            }
        }
        .boxed()
    }

    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: delete {path:?}");
            if path.is_root() {
                return Err(FsError::Forbidden);
            }
            let mut tree = self.tree.lock();
            if MemFs::remove_tree(&mut tree, path.as_rel_str()) {
                Ok(())
            } else {
                Err(FsError::NotFound)
            }
        }
        .boxed()
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, bool> {
        async move {
            trace!("FS: copy {from:?} {to:?}");
            let (from, to) = (from.as_rel_str(), to.as_rel_str());
            if to.is_empty() || to == from || is_below(to, from) {
                return Err(FsError::Forbidden);
            }
            let mut tree = self.tree.lock();
            MemFs::check_parent(&tree, to)?;
            MemFs::copy_tree(&mut tree, from, to)
        }
        .boxed()
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, bool> {
        async move {
            trace!("FS: rename {from:?} {to:?}");
            let (from, to) = (from.as_rel_str(), to.as_rel_str());
            if from.is_empty() || to.is_empty() || to == from || is_below(to, from) {
                return Err(FsError::Forbidden);
            }
            let mut tree = self.tree.lock();
            MemFs::check_parent(&tree, to)?;
            let overwritten = MemFs::copy_tree(&mut tree, from, to)?;
            MemFs::remove_tree(&mut tree, from);
            Ok(overwritten)
        }
        .boxed()
    }

    fn mkcol<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: mkcol {path:?}");
            let rel = path.as_rel_str();
            let mut tree = self.tree.lock();
            if tree.contains_key(rel) {
                return Err(FsError::Exists);
            }
            MemFs::check_parent(&tree, rel)?;
            tree.insert(rel.to_string(), MemNode::new(None));
            Ok(())
        }
        .boxed()
    }

    fn list<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Vec<String>> {
        async move {
            let rel = path.as_rel_str();
            let tree = self.tree.lock();
            match tree.get(rel) {
                Some(n) if n.is_collection() => {}
                Some(_) => return Err(FsError::Forbidden),
                None => return Err(FsError::NotFound),
            }
            Ok(tree
                .keys()
                .filter(|k| is_below(k, rel) && parent_of(k) == rel)
                .map(|k| k.rsplit('/').next().unwrap_or_default().to_string())
                .collect())
        }
        .boxed()
    }
}

impl DavFile for MemFsFile {
    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        async move {
            let start = self.pos.min(self.data.len());
            let end = start.saturating_add(count).min(self.data.len());
            self.pos = end;
            Ok(self.data.slice(start..end))
        }
        .boxed()
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        async move {
            let (base, offset) = match pos {
                SeekFrom::Start(n) => {
                    self.pos = n as usize;
                    return Ok(n);
                }
                SeekFrom::Current(n) => (self.pos as u64, n),
                SeekFrom::End(n) => (self.data.len() as u64, n),
            };
            if offset < 0 && (-offset) as u64 > base {
                return Err(FsError::GeneralFailure);
            }
            let newpos = (base as i64 + offset) as u64;
            self.pos = newpos as usize;
            Ok(newpos)
        }
        .boxed()
    }
}
