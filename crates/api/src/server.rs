//! Running the fixture server from test code.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::FixtureConfig;
use crate::app::build_app;

/// A fixture server bound and serving on a background task.
///
/// The task is aborted when the handle is dropped. Bind to port 0 to get an
/// ephemeral port; [`addr`](Self::addr) reports the one actually bound.
#[derive(Debug)]
pub struct FixtureServer {
    addr: SocketAddr,
    handle: JoinHandle<io::Result<()>>,
}

impl FixtureServer {
    pub async fn spawn(config: FixtureConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.addr).await?;
        let addr = listener.local_addr()?;
        tracing::info!(root = %config.root.display(), %addr, "fixture server listening");

        let app = build_app(config);
        let handle = tokio::spawn(async move { axum::serve(listener, app).await });

        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL for `path`. A missing leading `/` is added; an empty path
    /// gives the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url();
        match path {
            "" => base,
            p if p.starts_with('/') => format!("{base}{p}"),
            p => format!("{base}/{p}"),
        }
    }

    /// Serve until the server task ends.
    pub async fn wait(mut self) -> io::Result<()> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
