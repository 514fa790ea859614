//! HTTP Server

use std::{fmt, path::Path, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    Router,
};
use axum_server::Handle;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info_span, warn};

use crate::infrastructure::config::BridgeConfig;

pub mod bridge;
mod errors;
pub mod files;
mod handlers;
pub mod servers;
mod state;

/// Address the HTTP server listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    /// Host name or IP, empty means every interface
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl ListenAddress {
    /// Creates a new listen address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host handed to the socket
    pub fn bind_host(&self) -> &str {
        match self.host.trim() {
            "" => "0.0.0.0",
            host => host,
        }
    }

    /// Host shown in log messages; the bind address is left alone
    pub fn display_host(&self) -> &str {
        match self.host.trim() {
            "" | "0.0.0.0" => "127.0.0.1",
            host => host,
        }
    }

    /// Browsable URL of the site
    pub fn link(&self) -> String {
        format!("http://{}:{}", self.display_host(), self.port)
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bind_host(), self.port)
    }
}

/// A runnable server
#[async_trait]
pub trait Server {
    /// Serves until the listener fails or a shutdown signal arrives.
    async fn run(self) -> Result<()>;
}

/// Builds the router of a site: the email bridge when configured, the static
/// files of `root` for everything else.
pub fn site_router(
    root: &Path,
    cors: Option<&str>,
    bridge: Option<&BridgeConfig>,
) -> Result<Router> {
    files::ensure_root(root)?;

    let mut router = Router::new();

    if let Some(config) = bridge {
        router = bridge::new_bridge(config, router).context("failed to set up email support")?;
    }

    router = files::register(router, root);

    layers(router, cors)
}

/// Wraps `router` in the layers every response goes through.
pub fn layers(router: Router, cors: Option<&str>) -> Result<Router> {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        let uri = request.uri().to_string();
        info_span!("http_request", method = ?request.method(), uri)
    });

    let mut router = router
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::custom(handlers::panic_handler));

    if let Some(pattern) = cors {
        router = router.layer(cors_layer(pattern)?);
    }

    Ok(router.layer(trace_layer))
}

/// `*` allows every origin, anything else is the one allowed origin.
fn cors_layer(pattern: &str) -> Result<CorsLayer> {
    let origin = match pattern.trim() {
        "*" => AllowOrigin::any(),
        origin => AllowOrigin::exact(
            HeaderValue::from_str(origin)
                .with_context(|| format!("invalid CORS origin {origin:?}"))?,
        ),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

#[mutants::skip]
pub(crate) async fn shutdown_signal(handle: Option<Handle>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    if let Some(handle) = handle {
        debug!("shutting down gracefully");
        handle.graceful_shutdown(Some(Duration::from_secs(10)));
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::http::{HeaderName, StatusCode};
    use axum_test::TestServer;
    use serde_json::json;
    use tempfile::TempDir;
    use testresult::TestResult;

    use crate::infrastructure::config::build_default;

    use super::*;

    fn public_dir() -> TestResult<TempDir> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("index.html"), "<h1>hello</h1>")?;
        Ok(dir)
    }

    #[test]
    fn test_listen_address_display_fallback() {
        let any = ListenAddress::new("", 8080);
        assert_eq!(any.bind_host(), "0.0.0.0");
        assert_eq!(any.display_host(), "127.0.0.1");
        assert_eq!(any.link(), "http://127.0.0.1:8080");
        assert_eq!(any.to_string(), "0.0.0.0:8080");

        let unspecified = ListenAddress::new("0.0.0.0", 80);
        assert_eq!(unspecified.bind_host(), "0.0.0.0");
        assert_eq!(unspecified.display_host(), "127.0.0.1");

        let named = ListenAddress::new("example.local", 7070);
        assert_eq!(named.bind_host(), "example.local");
        assert_eq!(named.link(), "http://example.local:7070");
    }

    #[tokio::test]
    async fn test_site_router_serves_index() -> TestResult {
        let dir = public_dir()?;

        let server = TestServer::new(site_router(dir.path(), None, None)?)?;

        let response = server.get("/index.html").await;
        response.assert_status_ok();
        response.assert_text("<h1>hello</h1>");

        Ok(())
    }

    #[tokio::test]
    async fn test_site_router_without_bridge_has_no_email_endpoint() -> TestResult {
        let dir = public_dir()?;

        let server = TestServer::new(site_router(dir.path(), None, None)?)?;

        let response = server.get("/_api/email").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        Ok(())
    }

    #[test]
    fn test_site_router_requires_root_directory() -> TestResult {
        let dir = public_dir()?;

        assert!(site_router(&dir.path().join("missing"), None, None).is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_site_router_with_bridge() -> TestResult {
        let dir = public_dir()?;
        let mut config = build_default();
        config.routes.prefix = "_api/".to_string();

        let server = TestServer::new(site_router(dir.path(), None, Some(&config))?)?;

        let response = server
            .post("/_api/email")
            .json(&json!({ "subject": "no body" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        server.get("/").await.assert_status_ok();

        Ok(())
    }

    #[tokio::test]
    async fn test_site_router_with_invalid_bridge_config() -> TestResult {
        let dir = public_dir()?;
        let mut config = build_default();
        config.sender.email = String::new();

        assert!(site_router(dir.path(), None, Some(&config)).is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_cors_origin() -> TestResult {
        let dir = public_dir()?;

        let server = TestServer::new(site_router(
            dir.path(),
            Some("https://example.com"),
            None,
        )?)?;

        let response = server
            .get("/index.html")
            .add_header(
                HeaderName::from_static("origin"),
                HeaderValue::from_static("https://example.com"),
            )
            .await;

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("https://example.com")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_cors_any_origin() -> TestResult {
        let dir = public_dir()?;

        let server = TestServer::new(site_router(dir.path(), Some("*"), None)?)?;

        let response = server
            .get("/index.html")
            .add_header(
                HeaderName::from_static("origin"),
                HeaderValue::from_static("https://elsewhere.org"),
            )
            .await;

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );

        Ok(())
    }

    #[test]
    fn test_invalid_cors_origin() {
        assert!(cors_layer("bad\norigin").is_err());
    }
}
