//! Client configuration and its builder.

use std::time::Duration;

use weerelay_protocol::DecodeLimits;

use crate::client::RelayClient;
use crate::ClientError;

/// Default relay address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9000";

/// Default capacity of the inbound message queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Settings for one relay connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the relay.
    pub address: String,
    /// Password sent with `init`.
    pub password: String,
    /// Whether to ask the relay for zlib-compressed frames.
    pub compression: bool,
    /// Frame and inflate size limits.
    pub limits: DecodeLimits,
    /// Longest wait for the next frame before the reader gives up.
    /// `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Messages buffered before the reader task applies backpressure.
    pub queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            password: String::new(),
            compression: true,
            limits: DecodeLimits::default(),
            read_timeout: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Builder for configuring and connecting a [`RelayClient`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use weerelay::RelayClient;
///
/// # async fn run() -> Result<(), weerelay::ClientError> {
/// let mut client = RelayClient::builder()
///     .address("127.0.0.1:9000")
///     .password("secret")
///     .read_timeout(Duration::from_secs(30))
///     .connect()
///     .await?;
/// client.ping(Some("hello")).await?;
/// while let Some(msg) = client.recv().await {
///     println!("{}", msg?.identifier);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelayClientBuilder {
    config: ClientConfig,
}

impl RelayClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Sets the relay address.
    pub fn address(mut self, addr: &str) -> Self {
        self.config.address = addr.to_string();
        self
    }

    /// Sets the relay password.
    pub fn password(mut self, password: &str) -> Self {
        self.config.password = password.to_string();
        self
    }

    /// Turns frame compression on or off.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    /// Sets the frame and inflate size limits.
    pub fn limits(mut self, limits: DecodeLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Sets how long the reader waits for a frame.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Sets the inbound queue capacity. Zero is raised to one.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity.max(1);
        self
    }

    /// Returns the configuration built so far.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects, sends `init`, and starts the reader task.
    pub async fn connect(self) -> Result<RelayClient, ClientError> {
        RelayClient::connect(self.config).await
    }
}
