//! AWS Session Management
//!
//! Region resolution, retry policy and session caching for tools that query
//! many AWS services across many regions through one connection.
//!
//! # Features
//!
//! - **Region Resolution**: Wildcard region patterns, default-region lookup, partitions
//! - **Credentials**: Static keys, environment, shared profiles, instance metadata
//! - **Retry**: Exponential backoff with jitter, connection-reset handling, cancellation
//! - **Session Cache**: Per-region sessions with a TTL, shared across queries
//! - **Service Scopes**: Global, pinned and region-restricted services
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use aws_session::{ConnectionConfig, ConnectionManager, ServiceId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aws_session::SessionError> {
//!     let config = ConnectionConfig::builder()
//!         .regions(["us-*", "eu-west-1"])
//!         .build()?;
//!     let manager = ConnectionManager::new(config);
//!
//!     for region in manager.regions().expand_regions()? {
//!         if let Some(client) = manager.client(ServiceId::DynamoDb, Some(&region)).await?.ready() {
//!             println!("{}", client.endpoint()?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mocks;
pub mod region;
pub mod retry;
pub mod session;

// Re-export main types at crate root
pub use client::{
    ConnectionManager, ConnectionManagerBuilder, ServiceClient, ServiceId, ServiceScope,
    SessionOutcome, StaticSupportedRegions, SupportedRegions,
};
pub use config::{ConnectionConfig, ConnectionConfigBuilder, EnvOverrides, RetrySettings};
pub use credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialsProvider, EnvCredentialsProvider,
    MetadataCredentialsProvider, ProfileCredentialsProvider, StaticCredentialsProvider,
};
pub use error::{
    map_service_error, ConfigurationError, CredentialsError, NetworkError, ServiceError,
    ServiceErrorResponse, SessionError,
};
pub use region::{Partition, RegionResolver, KNOWN_REGIONS};
pub use retry::{execute, ConnectionRetryPolicy, RetryStrategy};
pub use session::{Session, SessionCache, SessionFactory};

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
