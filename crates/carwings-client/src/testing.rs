//! Test utilities for carwings-client
//!
//! Runs a stand-in gateway on an ephemeral local port so sessions can be
//! exercised end to end.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::Credentials;

/// Password encryption as the login endpoint expects it, for stand-in gateways
/// that check the submitted `Password` field
pub use crate::password::encrypt_password;

/// A test gateway that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum Router standing in for the gateway
    ///
    /// # Example
    ///
    /// ```ignore
    /// use carwings_client::testing::TestServer;
    ///
    /// let router = axum::Router::new()
    ///     .route("/UserLoginRequest.php", post(login));
    /// let server = TestServer::start(router).await?;
    ///
    /// let session = Session::open(&server.credentials("user", "pw", "US")).await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> std::io::Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Base URL of the test gateway
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Credentials pointed at this server through the base URL override
    pub fn credentials(&self, username: &str, password: &str, region: &str) -> Credentials {
        Credentials::new(username, password, region).with_base_url(self.base_url())
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let router = axum::Router::new().route("/ping", get(|| async { "pong" }));
        let server = TestServer::start(router).await.unwrap();

        assert_eq!(
            server.base_url(),
            format!("http://127.0.0.1:{}/", server.addr.port())
        );

        let url = format!("{}ping", server.base_url());
        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert_eq!(body, "pong");

        server.shutdown().await;
        assert!(reqwest::Client::new().get(&url).send().await.is_err());
    }

    #[tokio::test]
    async fn test_credentials_point_at_server() {
        let server = TestServer::start(axum::Router::new()).await.unwrap();
        let creds = server.credentials("user", "pw", "US");
        let (_, base_url) = creds.resolve().unwrap();
        assert_eq!(base_url, server.base_url());
    }
}
