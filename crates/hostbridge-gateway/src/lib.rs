//! Capability gateway for the host bridge.
//!
//! Exposes the native host's operations as async methods:
//! - Daemon lifecycle with readiness polling
//! - Nested daemon and binder RPC sessions
//! - Account sync projections
//! - Capability flags and the native platform descriptor

pub mod account;
pub mod capabilities;
pub mod gateway;
pub mod native_info;
pub mod protocol;
pub mod startup;

pub use account::{Credentials, SubscriptionInfo};
pub use capabilities::CapabilityFlags;
pub use gateway::{CapabilityGateway, GatewayOptions};
pub use native_info::NativeInfo;
pub use protocol::{ProtocolFeatures, ProtocolVersion};
pub use startup::{DaemonStartup, StartupPolicy, StartupState};
