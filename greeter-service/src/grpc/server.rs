//! gRPC server bootstrap with graceful shutdown

use std::future::Future;
use std::net::SocketAddr;

use tokio::signal;
use tonic::transport::Server;

use crate::config::{Config, GrpcConfig};
use crate::error::{Error, Result};
use crate::proto::greeter_server::GreeterServer as GreeterRpcServer;
use crate::proto::FILE_DESCRIPTOR_SET;
use crate::service::GreeterService;
use crate::store::GreetingStore;

/// HTTP/2 frame size bounds (RFC 9113 section 4.2)
const MIN_FRAME_SIZE: u32 = 16_384;
const MAX_FRAME_SIZE: u32 = 16_777_215;

/// Frame size for a message limit, clamped to what HTTP/2 allows
fn http2_frame_size(max_message_size: usize) -> u32 {
    u32::try_from(max_message_size)
        .unwrap_or(u32::MAX)
        .clamp(MIN_FRAME_SIZE, MAX_FRAME_SIZE)
}

/// Serves the greeter service plus the optional health and reflection services
#[derive(Debug)]
pub struct GreeterServer {
    name: String,
    bind_address: String,
    grpc: GrpcConfig,
}

impl GreeterServer {
    pub fn new(config: &Config) -> Self {
        Self {
            name: config.service.name.clone(),
            bind_address: config.bind_address(),
            grpc: config.grpc.clone(),
        }
    }

    /// Socket address parsed from `service.host` and `service.port`
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            Error::config(format!(
                "Invalid bind address '{}': {}",
                self.bind_address, e
            ))
        })
    }

    /// Serve until SIGINT or SIGTERM
    pub async fn serve<S: GreetingStore>(self, service: GreeterService<S>) -> Result<()> {
        self.serve_with_shutdown(service, shutdown_signal()).await
    }

    /// Serve until `shutdown` completes, then drain in-flight calls
    pub async fn serve_with_shutdown<S, F>(
        self,
        service: GreeterService<S>,
        shutdown: F,
    ) -> Result<()>
    where
        S: GreetingStore,
        F: Future<Output = ()> + Send,
    {
        let addr = self.socket_addr()?;
        let max_message_size = self.grpc.max_message_size_bytes();

        let greeter = service
            .into_server()
            .max_decoding_message_size(max_message_size)
            .max_encoding_message_size(max_message_size);

        let health = if self.grpc.health_check_enabled {
            let (reporter, health_service) = tonic_health::server::health_reporter();
            reporter
                .set_serving::<GreeterRpcServer<GreeterService<S>>>()
                .await;
            Some(health_service)
        } else {
            None
        };

        let reflection = if self.grpc.reflection_enabled {
            let reflection_service = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
                .build_v1()
                .map_err(|e| Error::Internal(format!("Failed to build reflection service: {}", e)))?;
            Some(reflection_service)
        } else {
            None
        };

        tracing::info!("Starting {} on {}", self.name, addr);
        tracing::info!("gRPC configuration:");
        tracing::info!("  - Max message size: {} MB", self.grpc.max_message_size_mb);
        tracing::info!("  - Request timeout: {} seconds", self.grpc.timeout_secs);
        tracing::info!("  - Health service: {}", self.grpc.health_check_enabled);
        tracing::info!("  - Reflection service: {}", self.grpc.reflection_enabled);

        Server::builder()
            .max_frame_size(Some(http2_frame_size(max_message_size)))
            .timeout(self.grpc.timeout())
            .tcp_keepalive(Some(self.grpc.tcp_keepalive()))
            .add_optional_service(health)
            .add_optional_service(reflection)
            .add_service(greeter)
            .serve_with_shutdown(addr, shutdown)
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_from_config() {
        let mut config = Config::default();
        config.service.host = "127.0.0.1".to_string();
        config.service.port = 50099;

        let server = GreeterServer::new(&config);
        assert_eq!(
            server.socket_addr().unwrap(),
            "127.0.0.1:50099".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_frame_size_stays_within_http2_bounds() {
        assert_eq!(http2_frame_size(4 * 1024 * 1024), 4 * 1024 * 1024);
        assert_eq!(http2_frame_size(16 * 1024 * 1024), MAX_FRAME_SIZE);
        assert_eq!(http2_frame_size(usize::MAX), MAX_FRAME_SIZE);
        assert_eq!(http2_frame_size(0), MIN_FRAME_SIZE);
    }

    #[test]
    fn test_invalid_host_rejected() {
        let mut config = Config::default();
        config.service.host = "not a host".to_string();

        let err = GreeterServer::new(&config).socket_addr().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
