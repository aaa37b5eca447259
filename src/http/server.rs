//! HTTP server for the demo time service.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::handler;
use crate::error::Result;
use crate::ratelimit::RateLimiter;

/// HTTP front end that runs every request through the rate limiter.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter instance
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server around a shared rate limiter.
    pub fn new(addr: SocketAddr, limiter: Arc<RateLimiter>) -> Self {
        Self { addr, limiter }
    }

    /// Start the server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server with graceful shutdown.
    ///
    /// The accept loop stops when the provided signal resolves.
    /// Per-connection failures are logged and never end the loop.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "HTTP server listening");

        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("HTTP server shutting down");
                    break;
                }
                result = listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Accept error");
                            continue;
                        }
                    };

                    let limiter = Arc::clone(&self.limiter);
                    tokio::spawn(async move {
                        let service = service_fn(move |request: Request<Incoming>| {
                            let limiter = Arc::clone(&limiter);
                            async move {
                                Ok::<_, Infallible>(handler::handle(
                                    &limiter,
                                    peer,
                                    request.uri().path(),
                                ))
                            }
                        });

                        let builder = ConnBuilder::new(TokioExecutor::new());
                        if let Err(e) = builder
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            warn!(%peer, error = %e, "Connection error");
                        }
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::RateLimitPolicy;

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:9980".parse().unwrap();
        let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::default()));
        let _server = HttpServer::new(addr, limiter);
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_accept_loop() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::default()));
        let server = HttpServer::new(addr, limiter);

        // An already-resolved signal makes serve return immediately
        // after binding.
        server
            .serve_with_shutdown(std::future::ready(()))
            .await
            .unwrap();
    }
}
