//! Run one CLI command against the gateway.

use hostbridge_common::BridgeError;
use hostbridge_gateway::{CapabilityGateway, Credentials};
use serde_json::{json, Value};

use crate::cli::{Command, Login};

/// Execute `command` and return what should be printed for it.
pub async fn execute(gateway: &CapabilityGateway, command: Command) -> Result<Value, BridgeError> {
    let output = match command {
        Command::StartDaemon { params } => {
            gateway.start_daemon(params).await?;
            json!({"state": "ready"})
        }
        Command::StopDaemon => {
            gateway.stop_daemon().await?;
            Value::Null
        }
        Command::RestartDaemon { params } => {
            gateway.restart_daemon(params).await?;
            json!({"state": "ready"})
        }
        Command::IsConnected => json!(gateway.is_connected().await?),
        Command::IsRunning => json!(gateway.is_running().await),
        Command::SyncUserInfo(login) => {
            let info = gateway.sync_user_info(&credentials(login)).await?;
            json!({
                "level": info.level,
                "expires": info.expires_millis(),
            })
        }
        Command::SyncExits(login) => gateway.sync_exits(&credentials(login)).await?,
        Command::PurgeCaches(login) => {
            gateway.purge_caches(&credentials(login)).await?;
            Value::Null
        }
        Command::ExportDebugPack => {
            gateway.export_debug_pack().await?;
            Value::Null
        }
        Command::DaemonRpc(call) => gateway.daemon_rpc(&call.method, call.args).await?,
        Command::BinderRpc(call) => gateway.binder_rpc(&call.method, call.args).await?,
        Command::NativeInfo => {
            serde_json::to_value(gateway.get_native_info().await?).unwrap_or_default()
        }
        Command::OpenBrowser { url } => {
            gateway.open_browser(&url).await?;
            Value::Null
        }
        Command::SetConversionFactor { factor } => {
            gateway.set_conversion_factor(factor).await?;
            Value::Null
        }
        Command::Capabilities { .. } => gateway.capabilities().to_json(),
        Command::Invoke(call) => gateway.invoke(&call.method, call.args).await?,
        Command::ShowConfig => Value::Null,
    };
    Ok(output)
}

fn credentials(login: Login) -> Credentials {
    Credentials::new(login.username, login.password)
}
