//! The capability gateway: named native operations as async methods.

use std::sync::Arc;
use std::time::Duration;

use hostbridge_common::BridgeError;
use hostbridge_config::schema::PlatformConfig;
use hostbridge_config::BridgeConfig;
use hostbridge_rpc::{decode_nested, encode_nested, HostRpc};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::account::{exits_from_sync_payload, parse_sync_payload, Credentials, SubscriptionInfo};
use crate::capabilities::CapabilityFlags;
use crate::native_info::NativeInfo;
use crate::protocol::ProtocolVersion;
use crate::startup::{DaemonStartup, StartupPolicy, StartupState};

#[cfg(test)]
mod tests;

/// Host method that reports capability flags, when the host offers one.
pub const HOST_CAPABILITIES_METHOD: &str = "capabilities";

/// How long to wait for the daemon to acknowledge `kill`. It usually exits
/// without replying.
const KILL_REPLY_GRACE: Duration = Duration::from_secs(2);

/// Everything the gateway fixes at construction.
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub protocol: ProtocolVersion,
    pub startup: StartupPolicy,
    pub capabilities: CapabilityFlags,
    pub platform: PlatformConfig,
}

impl GatewayOptions {
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self {
            protocol: ProtocolVersion::try_from(config.protocol.version)?,
            startup: StartupPolicy::from_config(&config.startup),
            capabilities: CapabilityFlags::from_config(&config.capabilities),
            platform: config.platform.clone(),
        })
    }
}

/// Facade over the host's method surface.
pub struct CapabilityGateway {
    rpc: Arc<dyn HostRpc>,
    protocol: ProtocolVersion,
    capabilities: CapabilityFlags,
    platform: PlatformConfig,
    startup: DaemonStartup,
}

impl CapabilityGateway {
    pub fn new(rpc: Arc<dyn HostRpc>, options: GatewayOptions) -> Self {
        Self {
            rpc,
            protocol: options.protocol,
            capabilities: options.capabilities,
            platform: options.platform,
            startup: DaemonStartup::new(options.startup),
        }
    }

    /// Build a gateway whose capability flags also include what the host
    /// reports through [`HOST_CAPABILITIES_METHOD`].
    pub async fn with_host_capabilities(
        rpc: Arc<dyn HostRpc>,
        mut options: GatewayOptions,
    ) -> Result<Self, BridgeError> {
        let report = rpc.call(HOST_CAPABILITIES_METHOD, vec![]).await?;
        options.capabilities.merge_host_report(report)?;
        Ok(Self::new(rpc, options))
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    pub fn capabilities(&self) -> &CapabilityFlags {
        &self.capabilities
    }

    pub fn startup_state(&self) -> StartupState {
        self.startup.state()
    }

    pub fn watch_startup(&self) -> watch::Receiver<StartupState> {
        self.startup.subscribe()
    }

    /// Call any host method directly.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.rpc.call(method, args).await
    }

    /// Start the daemon and wait until it answers `is_connected`.
    pub async fn start_daemon(&self, params: Value) -> Result<(), BridgeError> {
        self.startup.begin();
        if let Err(e) = self.invoke("start_daemon", vec![params]).await {
            self.startup.abort();
            warn!(error = %e, "host refused to start the daemon");
            return Err(e);
        }

        info!("daemon start requested, waiting for readiness");
        self.startup.run(move || self.is_connected()).await?;
        Ok(())
    }

    pub async fn stop_daemon(&self) -> Result<(), BridgeError> {
        if self.protocol.features().kill_before_stop {
            match tokio::time::timeout(KILL_REPLY_GRACE, self.daemon_rpc("kill", vec![])).await {
                Ok(Ok(_)) => debug!("daemon acknowledged kill"),
                Ok(Err(e)) => debug!(error = %e, "daemon kill failed, stopping anyway"),
                Err(_) => debug!("daemon did not answer kill, stopping anyway"),
            }
        }
        self.invoke("stop_daemon", vec![]).await?;
        info!("daemon stopped");
        Ok(())
    }

    pub async fn restart_daemon(&self, params: Value) -> Result<(), BridgeError> {
        self.stop_daemon().await?;
        self.start_daemon(params).await
    }

    /// Ask the daemon whether it is connected. A non-boolean answer is read
    /// by truthiness.
    pub async fn is_connected(&self) -> Result<bool, BridgeError> {
        let answer = self.daemon_rpc("is_connected", vec![]).await?;
        Ok(truthy(&answer))
    }

    /// Like [`is_connected`](Self::is_connected), but any failure reads as
    /// `false`.
    pub async fn is_running(&self) -> bool {
        match self.is_connected().await {
            Ok(connected) => connected,
            Err(e) => {
                debug!(error = %e, "daemon not running");
                false
            }
        }
    }

    pub async fn sync_user_info(
        &self,
        credentials: &Credentials,
    ) -> Result<SubscriptionInfo, BridgeError> {
        let payload = self.sync(credentials, false).await?;
        Ok(SubscriptionInfo::from_sync_payload(&payload))
    }

    pub async fn sync_exits(&self, credentials: &Credentials) -> Result<Value, BridgeError> {
        let payload = self.sync(credentials, false).await?;
        Ok(exits_from_sync_payload(&payload))
    }

    /// Sync with the purge flag set. Needs a protocol with the purge flag.
    pub async fn purge_caches(&self, credentials: &Credentials) -> Result<(), BridgeError> {
        let params = self.sync_params(credentials, true)?;
        self.invoke("sync", params).await?;
        Ok(())
    }

    pub async fn export_debug_pack(&self) -> Result<(), BridgeError> {
        self.invoke("export_logs", vec![]).await?;
        Ok(())
    }

    pub async fn daemon_rpc(&self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.nested("daemon_rpc", method, args).await
    }

    pub async fn binder_rpc(&self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.nested("binder_rpc", method, args).await
    }

    pub async fn get_native_info(&self) -> Result<NativeInfo, BridgeError> {
        let version = match self.invoke("version", vec![]).await? {
            Value::String(version) => version,
            other => other.to_string(),
        };
        Ok(NativeInfo::detect(&self.platform, version))
    }

    pub async fn open_browser(&self, url: &str) -> Result<(), BridgeError> {
        self.invoke("open_browser", vec![json!(url)]).await?;
        Ok(())
    }

    pub async fn set_conversion_factor(&self, factor: f64) -> Result<(), BridgeError> {
        self.invoke("set_conversion_factor", vec![json!(factor)]).await?;
        Ok(())
    }

    async fn sync(&self, credentials: &Credentials, purge: bool) -> Result<Value, BridgeError> {
        let params = self.sync_params(credentials, purge)?;
        let result = self.invoke("sync", params).await?;
        parse_sync_payload(result)
    }

    fn sync_params(&self, credentials: &Credentials, purge: bool) -> Result<Vec<Value>, BridgeError> {
        let mut params = vec![json!(credentials.username), json!(credentials.password)];
        if self.protocol.features().sync_purge_flag {
            params.push(json!(purge));
        } else if purge {
            return Err(BridgeError::Unsupported(format!(
                "purging caches needs a sync purge flag (protocol {})",
                self.protocol
            )));
        }
        Ok(params)
    }

    async fn nested(&self, outer: &str, method: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        let inner = encode_nested(method, args)?;
        debug!(outer, method, "tunneling nested call");
        let result = self.invoke(outer, vec![Value::String(inner)]).await?;
        decode_nested(result)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
