//
//  Sample application.
//
//  Serves an in-memory tree over plain http, no ssl.
//  Connect to http://localhost:4918/
//

use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::str::FromStr;

use clap::Parser;
use futures_util::future::TryFutureExt;

use dav_engine::{body::Body, DavHandler, DavMethodSet, FileSystem, LockSystem};

#[derive(Clone)]
struct Server {
    dh: DavHandler,
}

impl Server {
    pub fn new(prefix: &str, locks: bool, read_only: bool) -> Self {
        let mut config = DavHandler::builder(FileSystem::Mem).strip_prefix(prefix);
        if locks {
            config = config.locksystem(LockSystem::Mem);
        }
        if read_only {
            config = config.methods(DavMethodSet::WEBDAV_RO);
        }
        Server { dh: config.build() }
    }

    async fn handle(
        &self,
        req: hyper::Request<hyper::Body>,
    ) -> Result<hyper::Response<Body>, Infallible> {
        Ok(self.dh.handle(req).await)
    }
}

#[derive(Debug, clap::Parser)]
#[command(about, version)]
struct Cli {
    /// port to listen on
    #[arg(short, long, default_value = "4918")]
    port: u16,
    /// base path the tree is served under
    #[arg(long, default_value = "/")]
    prefix: String,
    /// class 1 only, no LOCK/UNLOCK
    #[arg(long)]
    no_locks: bool,
    /// only allow read-only methods
    #[arg(short, long)]
    read_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let Cli {
        port,
        prefix,
        no_locks,
        read_only,
    } = Cli::parse();

    let dav_server = Server::new(&prefix, !no_locks, read_only);
    let make_service = hyper::service::make_service_fn(|_| {
        let dav_server = dav_server.clone();
        async move {
            let func = move |req| {
                let dav_server = dav_server.clone();
                async move { dav_server.handle(req).await }
            };
            Ok::<_, hyper::Error>(hyper::service::service_fn(func))
        }
    });

    let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))?;
    let server = hyper::Server::try_bind(&addr)?
        .serve(make_service)
        .map_err(|e| eprintln!("server error: {}", e));

    println!("Serving memory filesystem under {} on {}", prefix, port);
    let _ = server.await;
    Ok(())
}
