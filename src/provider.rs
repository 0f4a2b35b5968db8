//! Provider lifecycle: configure, connect, register, serve.

use tokio::net::TcpStream;

use crate::codec::{TypeDesc, Value};
use crate::config::Config;
use crate::connection::Connection;
use crate::error::Result;
use crate::registry::{CallRegistry, CallResult, Capability, RegistryError};
use crate::reporter::CallContext;

/// Fluent registration surface for building a [`Provider`].
#[derive(Default)]
pub struct ProviderBuilder {
    registry: CallRegistry,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a computation. Duplicate and over-long names fail here, at
    /// startup, never at request time.
    pub fn register<F, Fut>(
        mut self,
        name: &str,
        params: Vec<TypeDesc>,
        returns: TypeDesc,
        capability: Capability,
        invoker: F,
    ) -> std::result::Result<Self, RegistryError>
    where
        F: Fn(Vec<Value>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = CallResult> + Send + 'static,
    {
        self.registry
            .register(name, params, returns, capability, invoker)?;
        Ok(self)
    }

    pub fn build(self) -> Provider {
        Provider {
            registry: self.registry,
        }
    }
}

/// A configured provider, ready to serve one supervisor connection.
pub struct Provider {
    registry: CallRegistry,
}

impl Provider {
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::new()
    }

    /// Connect to the supervisor named by the environment and serve
    /// requests until a fatal error or the supervisor closes the
    /// connection. The embedding application decides the exit code.
    pub async fn start(self) -> Result<()> {
        let config = Config::from_env()?;
        self.serve(config).await
    }

    /// Serve with explicit endpoint parameters.
    pub async fn serve(self, config: Config) -> Result<()> {
        tracing::info!(host = %config.host, port = config.port, "connecting to supervisor");
        let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
        tracing::info!("connected");

        let (reader, writer) = stream.into_split();
        let connection = Connection::new(reader, writer, self.registry);
        connection.register(&config.pid).await?;
        tracing::info!("registered, entering receive loop");
        connection.run().await
    }
}
