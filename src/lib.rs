//! ## Async WebDAV protocol engine
//!
//! [`Webdav`] (RFC4918) is defined as
//! HTTP (GET/HEAD/PUT/DELETE) plus a bunch of extension methods (PROPFIND, etc).
//! These extension methods are used to manage collections (like unix directories),
//! get information on collections (like unix `ls` or `readdir`), rename and
//! copy items, lock/unlock items, etc.
//!
//! This crate is a `handler`: it takes a `http::Request`, maps the WebDAV
//! verb onto a storage backend, and produces a `http::Response`. It speaks
//! class 1, and class 2 when a lock system is configured.
//!
//! ## Backend interfaces.
//!
//! - the library contains a [HTTP handler][DavHandler].
//! - you supply a [filesystem][fs::DavFileSystem] for backend storage.
//! - you can supply a [locksystem][ls::DavLockSystem] that keeps track of locks.
//!   The engine itself never stores locks, it only asks the locksystem.
//!
//! Every path handed to a backend has been normalized by [`davpath`]: no `..`,
//! no repeated slashes, and confined to the configured prefix.
//!
//! ## What is implemented.
//!
//! - GET/HEAD with single byte ranges (`Range: bytes=...`), and a plain text
//!   or HTML index for collections.
//! - PUT, DELETE, MKCOL, COPY and MOVE with the RFC4918 preconditions.
//! - PROPFIND with depth 0 and 1 (the live properties only).
//! - LOCK/UNLOCK, lock tokens via `Lock-Token:` and `If:`.
//! - PROPPATCH only acknowledges the timestamp updates Windows clients send,
//!   there is no property storage.
//!
//! ## Backends.
//!
//! - [`MemFs`](fs::memfs::MemFs): ephemeral in-memory filesystem.
//! - [`MemLs`](ls::memls::MemLs): ephemeral in-memory locksystem.
//!
//! ## Example.
//!
//! Example server using [hyper] that serves an in-memory filesystem:
//!
//! ```no_run
//! use std::convert::Infallible;
//! use dav_engine::{DavHandler, FileSystem, LockSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let addr = ([127, 0, 0, 1], 4918).into();
//!
//!     let dav_server = DavHandler::builder(FileSystem::Mem)
//!         .locksystem(LockSystem::Mem)
//!         .build();
//!
//!     let make_service = hyper::service::make_service_fn(move |_| {
//!         let dav_server = dav_server.clone();
//!         async move {
//!             let func = move |req| {
//!                 let dav_server = dav_server.clone();
//!                 async move {
//!                     Ok::<_, Infallible>(dav_server.handle(req).await)
//!                 }
//!             };
//!             Ok::<_, Infallible>(hyper::service::service_fn(func))
//!         }
//!     });
//!
//!     println!("Serving on {}", addr);
//!     let _ = hyper::Server::bind(&addr)
//!         .serve(make_service)
//!         .await
//!         .map_err(|e| eprintln!("server error: {}", e));
//! }
//! ```
//!
//! [`Webdav`]: https://tools.ietf.org/html/rfc4918
//! [hyper]: https://hyper.rs/

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod conditional;
mod davhandler;
mod davheaders;
mod errors;
mod multistatus;
mod range;
mod util;

pub mod body;
pub mod davpath;
pub mod fs;
pub mod ls;

use crate::errors::DavResult;

pub use crate::davhandler::{DavBuilder, DavHandler, FileSystem, LockSystem, LOCK_TIMEOUT};
pub use crate::util::{DavMethod, DavMethodSet};
