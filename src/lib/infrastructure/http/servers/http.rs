//! The site's HTTP server.

use std::net::{SocketAddr, TcpListener};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::Router;
use axum_server::Handle;
use tracing::{debug, info};

use crate::infrastructure::http::{shutdown_signal, ListenAddress, Server};

/// The site's HTTP server
#[derive(Debug)]
pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    /// Returns a new HTTP server bound to `address`.
    pub fn new(address: &ListenAddress, router: Router) -> Result<Self> {
        let listener = TcpListener::bind((address.bind_host(), address.port))
            .with_context(|| format!("failed to listen on {address}"))?;

        listener
            .set_nonblocking(true)
            .context("failed to configure listener")?;

        Ok(Self { router, listener })
    }

    /// The address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to get local address")
    }
}

#[async_trait]
impl Server for HttpServer {
    /// Runs the HTTP server.
    #[mutants::skip]
    async fn run(self) -> Result<()> {
        debug!("HTTP Server listening on {}", self.local_addr()?);

        let handle = Handle::new();

        let server = axum_server::from_tcp(self.listener)
            .handle(handle.clone())
            .serve(self.router.into_make_service());

        tokio::select! {
            result = server => result.context("server error")?,
            _ = shutdown_signal(Some(handle)) => {
                info!("Shutting down HTTP server");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use testresult::TestResult;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    use crate::infrastructure::http::site_router;

    use super::*;

    #[tokio::test]
    async fn test_serves_files_over_tcp() -> TestResult {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("index.html"), "<h1>over the wire</h1>")?;

        let server = HttpServer::new(
            &ListenAddress::new("127.0.0.1", 0),
            site_router(dir.path(), None, None)?,
        )?;
        let address = server.local_addr()?;

        let running = tokio::spawn(server.run());

        let mut stream = TcpStream::connect(address).await?;
        stream
            .write_all(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await?;

        let mut response = String::new();
        stream.read_to_string(&mut response).await?;

        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("<h1>over the wire</h1>"), "{response}");

        running.abort();

        Ok(())
    }

    #[test]
    fn test_port_already_bound() -> TestResult {
        let taken = TcpListener::bind("127.0.0.1:0")?;
        let port = taken.local_addr()?.port();

        let result = HttpServer::new(&ListenAddress::new("127.0.0.1", port), Router::new());

        let err = result.expect_err("binding a taken port should fail");
        assert!(err.to_string().contains("failed to listen on 127.0.0.1:"));

        Ok(())
    }
}
