//! Mock implementations for testing.
//!
//! These stand in for the ambient credentials chain and the service
//! availability lookup so sessions can be built without touching the
//! environment, the filesystem or the network.

mod credentials;
mod regions;

pub use credentials::MockCredentialsProvider;
pub use regions::MockSupportedRegions;
