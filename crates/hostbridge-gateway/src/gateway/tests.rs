//! Gateway tests against a scripted host, plus one run over the real
//! correlator.

use super::*;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use hostbridge_common::RemoteError;
use hostbridge_rpc::{CallCorrelator, ChannelTransport, IpcEnvelope, RpcResponse};

type Handler = Box<dyn Fn(&str, &[Value]) -> Result<Value, BridgeError> + Send + Sync>;

/// Records every call and answers through `handler`. Nested calls are logged
/// as `daemon_rpc:<method>` / `binder_rpc:<method>`.
struct ScriptedHost {
    calls: Mutex<Vec<(String, Vec<Value>, Instant)>>,
    handler: Handler,
}

impl ScriptedHost {
    fn new(
        handler: impl Fn(&str, &[Value]) -> Result<Value, BridgeError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    fn names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _, _)| name.clone())
            .collect()
    }

    fn params_of(&self, name: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, params, _)| params.clone())
            .unwrap_or_default()
    }

    fn stamps_of(&self, name: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|(_, _, at)| *at)
            .collect()
    }
}

/// Name a nested call after its inner method.
fn logged_name(method: &str, params: &[Value]) -> String {
    if method == "daemon_rpc" || method == "binder_rpc" {
        if let Some(Value::String(inner)) = params.first() {
            if let Ok(inner) = serde_json::from_str::<Value>(inner) {
                return format!("{method}:{}", inner["method"].as_str().unwrap_or("?"));
            }
        }
    }
    method.to_string()
}

#[async_trait]
impl HostRpc for ScriptedHost {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, BridgeError> {
        let name = logged_name(method, &params);
        self.calls
            .lock()
            .unwrap()
            .push((name.clone(), params.clone(), Instant::now()));
        (self.handler)(&name, &params)
    }
}

fn nested_ok(result: Value) -> Result<Value, BridgeError> {
    Ok(Value::String(json!({"jsonrpc": "2.0", "result": result, "id": 1}).to_string()))
}

fn nested_err(message: &str) -> Result<Value, BridgeError> {
    Ok(Value::String(
        json!({"jsonrpc": "2.0", "error": {"message": message}, "id": 1}).to_string(),
    ))
}

fn gateway(host: &Arc<ScriptedHost>, protocol: ProtocolVersion) -> CapabilityGateway {
    let options = GatewayOptions {
        protocol,
        startup: StartupPolicy {
            poll_interval: Duration::from_millis(10),
            ..StartupPolicy::default()
        },
        ..GatewayOptions::default()
    };
    CapabilityGateway::new(host.clone(), options)
}

fn creds() -> Credentials {
    Credentials::new("alice", "hunter2")
}

// ---------------------------------------------------------------------------
// Daemon lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_daemon_polls_until_connected() {
    let probes = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&probes);
    let host = ScriptedHost::new(move |name, _| match name {
        "start_daemon" => Ok(json!("")),
        "daemon_rpc:is_connected" => {
            let mut n = counter.lock().unwrap();
            *n += 1;
            match *n {
                1 | 2 => Err(BridgeError::Remote(RemoteError::new("connection refused"))),
                3 => nested_err("tunnel not up"),
                _ => nested_ok(json!(true)),
            }
        }
        other => panic!("unexpected call {other}"),
    });
    let gw = gateway(&host, ProtocolVersion::V3);

    gw.start_daemon(json!({"exit": "us-1"})).await.unwrap();

    let names = host.names();
    assert_eq!(names.iter().filter(|n| *n == "start_daemon").count(), 1);
    assert_eq!(names[0], "start_daemon");
    assert_eq!(host.stamps_of("daemon_rpc:is_connected").len(), 4);
    assert_eq!(host.params_of("start_daemon"), vec![json!({"exit": "us-1"})]);
    assert_eq!(gw.startup_state(), StartupState::Ready);
}

#[tokio::test]
async fn start_daemon_is_ready_when_daemon_answers_false() {
    let host = ScriptedHost::new(|name, _| match name {
        "start_daemon" => Ok(Value::Null),
        "daemon_rpc:is_connected" => nested_ok(json!(false)),
        other => panic!("unexpected call {other}"),
    });
    let gw = gateway(&host, ProtocolVersion::V3);

    tokio::time::timeout(Duration::from_millis(500), gw.start_daemon(json!({})))
        .await
        .expect("start_daemon should resolve once the daemon answers")
        .unwrap();

    assert_eq!(host.stamps_of("daemon_rpc:is_connected").len(), 1);
    assert_eq!(gw.startup_state(), StartupState::Ready);
}

#[tokio::test]
async fn start_daemon_probes_at_default_interval() {
    let probes = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&probes);
    let host = ScriptedHost::new(move |name, _| match name {
        "start_daemon" => Ok(Value::Null),
        _ => {
            let mut n = counter.lock().unwrap();
            *n += 1;
            if *n < 3 {
                nested_err("not yet")
            } else {
                nested_ok(json!(true))
            }
        }
    });
    let gw = CapabilityGateway::new(host.clone(), GatewayOptions::default());

    gw.start_daemon(json!({})).await.unwrap();

    let stamps = host.stamps_of("daemon_rpc:is_connected");
    assert_eq!(stamps.len(), 3);
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(200));
    }
}

#[tokio::test]
async fn refused_start_fails_without_polling() {
    let host = ScriptedHost::new(|name, _| match name {
        "start_daemon" => Err(BridgeError::Remote(RemoteError::new("no permission"))),
        other => panic!("unexpected call {other}"),
    });
    let gw = gateway(&host, ProtocolVersion::V3);

    let err = gw.start_daemon(json!({})).await.unwrap_err();
    assert_eq!(err.display_message(), "no permission");
    assert_eq!(host.names(), vec!["start_daemon"]);
    assert_eq!(gw.startup_state(), StartupState::Failed);
}

#[tokio::test]
async fn bounded_startup_times_out() {
    let host = ScriptedHost::new(|name, _| match name {
        "start_daemon" => Ok(Value::Null),
        _ => nested_err("daemon unreachable"),
    });
    let options = GatewayOptions {
        startup: StartupPolicy {
            poll_interval: Duration::from_millis(5),
            max_attempts: Some(2),
            timeout: None,
        },
        ..GatewayOptions::default()
    };
    let gw = CapabilityGateway::new(host.clone(), options);

    let err = gw.start_daemon(json!({})).await.unwrap_err();
    assert!(matches!(err, BridgeError::StartupTimedOut { attempts: 2, .. }));
    assert_eq!(gw.startup_state(), StartupState::Failed);
}

#[tokio::test]
async fn stop_daemon_kills_first_on_v3() {
    let host = ScriptedHost::new(|name, _| match name {
        "daemon_rpc:kill" => Ok(Value::Null),
        "stop_daemon" => Ok(json!("")),
        other => panic!("unexpected call {other}"),
    });
    gateway(&host, ProtocolVersion::V3).stop_daemon().await.unwrap();
    assert_eq!(host.names(), vec!["daemon_rpc:kill", "stop_daemon"]);
}

#[tokio::test]
async fn stop_daemon_ignores_kill_failure() {
    let host = ScriptedHost::new(|name, _| match name {
        "daemon_rpc:kill" => Err(BridgeError::Disconnected),
        "stop_daemon" => Ok(Value::Null),
        other => panic!("unexpected call {other}"),
    });
    gateway(&host, ProtocolVersion::V3).stop_daemon().await.unwrap();
    assert_eq!(host.names(), vec!["daemon_rpc:kill", "stop_daemon"]);
}

#[tokio::test]
async fn stop_daemon_skips_kill_before_v3() {
    for protocol in [ProtocolVersion::V1, ProtocolVersion::V2] {
        let host = ScriptedHost::new(|_, _| Ok(Value::Null));
        gateway(&host, protocol).stop_daemon().await.unwrap();
        assert_eq!(host.names(), vec!["stop_daemon"]);
    }
}

#[tokio::test]
async fn stop_daemon_propagates_stop_failure() {
    let host = ScriptedHost::new(|name, _| match name {
        "stop_daemon" => Err(BridgeError::Remote(RemoteError::new("busy"))),
        _ => Ok(Value::Null),
    });
    let err = gateway(&host, ProtocolVersion::V1).stop_daemon().await.unwrap_err();
    assert_eq!(err.display_message(), "busy");
}

#[tokio::test]
async fn restart_daemon_stops_then_starts() {
    let host = ScriptedHost::new(|name, _| match name {
        "daemon_rpc:is_connected" => nested_ok(json!(true)),
        _ => Ok(Value::Null),
    });
    gateway(&host, ProtocolVersion::V2)
        .restart_daemon(json!({"a": 1}))
        .await
        .unwrap();
    assert_eq!(
        host.names(),
        vec!["stop_daemon", "start_daemon", "daemon_rpc:is_connected"]
    );
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn is_connected_reads_nested_result() {
    let host = ScriptedHost::new(|_, _| nested_ok(json!(true)));
    assert!(gateway(&host, ProtocolVersion::V3).is_connected().await.unwrap());

    let host = ScriptedHost::new(|_, _| nested_ok(json!(false)));
    assert!(!gateway(&host, ProtocolVersion::V3).is_connected().await.unwrap());
}

#[tokio::test]
async fn is_connected_propagates_failures() {
    let host = ScriptedHost::new(|_, _| nested_err("daemon gone"));
    let err = gateway(&host, ProtocolVersion::V3).is_connected().await.unwrap_err();
    assert_eq!(err.display_message(), "daemon gone");
}

#[tokio::test]
async fn is_running_swallows_remote_and_malformed_failures() {
    let remote = ScriptedHost::new(|_, _| nested_err("daemon gone"));
    assert!(!gateway(&remote, ProtocolVersion::V3).is_running().await);

    let outer_remote =
        ScriptedHost::new(|_, _| Err(BridgeError::Remote(RemoteError::new("no daemon"))));
    assert!(!gateway(&outer_remote, ProtocolVersion::V3).is_running().await);

    let malformed = ScriptedHost::new(|_, _| Ok(json!("<html>")));
    assert!(!gateway(&malformed, ProtocolVersion::V3).is_running().await);

    let up = ScriptedHost::new(|_, _| nested_ok(json!(true)));
    assert!(gateway(&up, ProtocolVersion::V3).is_running().await);
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_user_info_projects_subscription() {
    let host = ScriptedHost::new(|_, _| {
        Ok(json!(
            r#"{"user":{"subscription":{"level":"PRO","expires_unix":1700000000}}}"#
        ))
    });
    let info = gateway(&host, ProtocolVersion::V3)
        .sync_user_info(&creds())
        .await
        .unwrap();
    assert_eq!(info.level, "pro");
    assert_eq!(info.expires_millis(), Some(1_700_000_000_000));
    assert_eq!(
        host.params_of("sync"),
        vec![json!("alice"), json!("hunter2"), json!(false)]
    );
}

#[tokio::test]
async fn sync_user_info_defaults_to_free() {
    let host = ScriptedHost::new(|_, _| Ok(json!(r#"{"user":{}}"#)));
    let info = gateway(&host, ProtocolVersion::V3)
        .sync_user_info(&creds())
        .await
        .unwrap();
    assert_eq!(info.level, "free");
    assert_eq!(info.expires, None);
}

#[tokio::test]
async fn sync_on_v1_omits_purge_flag() {
    let host = ScriptedHost::new(|_, _| Ok(json!("{}")));
    gateway(&host, ProtocolVersion::V1)
        .sync_user_info(&creds())
        .await
        .unwrap();
    assert_eq!(host.params_of("sync"), vec![json!("alice"), json!("hunter2")]);
}

#[tokio::test]
async fn sync_exits_projects_exits() {
    let host = ScriptedHost::new(|_, _| {
        Ok(json!(r#"{"exits":[{"hostname":"x.example"}],"user":{}}"#))
    });
    let exits = gateway(&host, ProtocolVersion::V3)
        .sync_exits(&creds())
        .await
        .unwrap();
    assert_eq!(exits, json!([{"hostname": "x.example"}]));
}

#[tokio::test]
async fn sync_with_garbage_payload_is_malformed() {
    let host = ScriptedHost::new(|_, _| Ok(json!("oops")));
    let err = gateway(&host, ProtocolVersion::V3)
        .sync_exits(&creds())
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::MalformedResponse(_)));
}

#[tokio::test]
async fn purge_caches_sets_flag_and_discards_result() {
    let host = ScriptedHost::new(|_, _| Ok(json!("not even json")));
    gateway(&host, ProtocolVersion::V2)
        .purge_caches(&creds())
        .await
        .unwrap();
    assert_eq!(
        host.params_of("sync"),
        vec![json!("alice"), json!("hunter2"), json!(true)]
    );
}

#[tokio::test]
async fn purge_caches_unsupported_on_v1() {
    let host = ScriptedHost::new(|_, _| Ok(Value::Null));
    let err = gateway(&host, ProtocolVersion::V1)
        .purge_caches(&creds())
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Unsupported(_)));
    assert!(host.names().is_empty());
}

// ---------------------------------------------------------------------------
// Nested RPC and misc
// ---------------------------------------------------------------------------

#[tokio::test]
async fn daemon_rpc_tunnels_a_string_envelope() {
    let host = ScriptedHost::new(|_, _| nested_ok(json!({"bytes": 42})));
    let gw = gateway(&host, ProtocolVersion::V3);

    let result = gw.daemon_rpc("stats", vec![json!("today")]).await.unwrap();
    assert_eq!(result, json!({"bytes": 42}));

    let params = host.params_of("daemon_rpc:stats");
    assert_eq!(params.len(), 1);
    let inner: Value = serde_json::from_str(params[0].as_str().unwrap()).unwrap();
    assert_eq!(
        inner,
        json!({"jsonrpc": "2.0", "method": "stats", "params": ["today"], "id": 1})
    );
}

#[tokio::test]
async fn binder_rpc_raises_nested_errors() {
    let host = ScriptedHost::new(|_, _| {
        Ok(json!(r#"{"error":{"code":5,"message":"binder offline"}}"#))
    });
    let err = gateway(&host, ProtocolVersion::V3)
        .binder_rpc("status", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.remote().unwrap().code, Some(5));
    assert_eq!(err.display_message(), "binder offline");
    assert_eq!(host.names(), vec!["binder_rpc:status"]);
}

#[tokio::test]
async fn export_debug_pack_discards_result() {
    let host = ScriptedHost::new(|_, _| Ok(json!({"path": "/tmp/logs.zip"})));
    gateway(&host, ProtocolVersion::V3)
        .export_debug_pack()
        .await
        .unwrap();
    assert_eq!(host.names(), vec!["export_logs"]);
}

#[tokio::test]
async fn native_info_merges_host_version() {
    let host = ScriptedHost::new(|_, _| Ok(json!("4.99.1")));
    let info = gateway(&host, ProtocolVersion::V3)
        .get_native_info()
        .await
        .unwrap();
    assert_eq!(info.version, "4.99.1");
    assert_eq!(
        info.platform_type,
        crate::native_info::platform_name(std::env::consts::OS)
    );
    assert_eq!(host.names(), vec!["version"]);
}

#[tokio::test]
async fn open_browser_and_conversion_factor_pass_arguments() {
    let host = ScriptedHost::new(|_, _| Ok(json!("")));
    let gw = gateway(&host, ProtocolVersion::V3);
    gw.open_browser("https://example.com").await.unwrap();
    gw.set_conversion_factor(1.5).await.unwrap();
    assert_eq!(host.params_of("open_browser"), vec![json!("https://example.com")]);
    assert_eq!(host.params_of("set_conversion_factor"), vec![json!(1.5)]);
}

#[tokio::test]
async fn invoke_passes_through() {
    let host = ScriptedHost::new(|name, params| Ok(json!({"echo": name, "params": params})));
    let result = gateway(&host, ProtocolVersion::V3)
        .invoke("get_url", vec![json!("a")])
        .await
        .unwrap();
    assert_eq!(result, json!({"echo": "get_url", "params": ["a"]}));
}

#[tokio::test]
async fn host_capabilities_merge_at_construction() {
    let host = ScriptedHost::new(|name, _| match name {
        HOST_CAPABILITIES_METHOD => Ok(json!({"supports_vpn_conf": true})),
        other => panic!("unexpected call {other}"),
    });
    let gw = CapabilityGateway::with_host_capabilities(host.clone(), GatewayOptions::default())
        .await
        .unwrap();
    assert!(gw.capabilities().supports_vpn_conf());
    assert!(gw.capabilities().supports_autoupdate());
}

#[test]
fn options_from_config() {
    let mut config = BridgeConfig::default();
    config.protocol.version = 1;
    config.startup.max_attempts = 7;
    let options = GatewayOptions::from_config(&config).unwrap();
    assert_eq!(options.protocol, ProtocolVersion::V1);
    assert_eq!(options.startup.max_attempts, Some(7));
    assert!(options.capabilities.supports_prc_whitelist());

    config.protocol.version = 4;
    assert!(GatewayOptions::from_config(&config).is_err());
}

#[test]
fn truthiness() {
    assert!(!truthy(&Value::Null));
    assert!(!truthy(&json!(0)));
    assert!(!truthy(&json!("")));
    assert!(truthy(&json!(1)));
    assert!(truthy(&json!("yes")));
    assert!(truthy(&json!({})));
}

// ---------------------------------------------------------------------------
// End to end over the correlator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_daemon_over_correlator() {
    let (transport, mut outbound) = ChannelTransport::new();
    let correlator = Arc::new(CallCorrelator::new(Arc::new(transport)));

    // Play the host: answer start_daemon, fail the first probe, then succeed.
    let host_side = Arc::clone(&correlator);
    let host = tokio::spawn(async move {
        let mut probes = 0;
        let mut seen = Vec::new();
        while let Some(raw) = outbound.recv().await {
            let env = IpcEnvelope::from_json(&raw).unwrap();
            seen.push(env.inner.method().to_string());
            let reply = match env.inner.method() {
                "start_daemon" => RpcResponse::success(json!("")).to_value(),
                "daemon_rpc" => {
                    probes += 1;
                    let nested = if probes == 1 {
                        RpcResponse::failure("still booting")
                    } else {
                        RpcResponse::success(json!(true))
                    };
                    RpcResponse::success(Value::String(nested.to_value().to_string())).to_value()
                }
                other => panic!("unexpected call {other}"),
            };
            // Hosts may hand back the response as a JSON string.
            host_side
                .deliver(&env.callback_code, Value::String(reply.to_string()))
                .unwrap();
            if probes == 2 {
                break;
            }
        }
        seen
    });

    let options = GatewayOptions {
        startup: StartupPolicy {
            poll_interval: Duration::from_millis(10),
            ..StartupPolicy::default()
        },
        ..GatewayOptions::default()
    };
    let gw = CapabilityGateway::new(correlator.clone(), options);
    gw.start_daemon(json!({})).await.unwrap();

    assert_eq!(host.await.unwrap(), vec!["start_daemon", "daemon_rpc", "daemon_rpc"]);
    assert_eq!(correlator.pending_count(), 0);
}

#[tokio::test]
async fn unanswered_kill_does_not_leak_a_pending_call() {
    let (transport, mut outbound) = ChannelTransport::new();
    let correlator = Arc::new(CallCorrelator::new(Arc::new(transport)));

    // The daemon dies on kill without replying; stop_daemon is answered.
    let host_side = Arc::clone(&correlator);
    let host = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(raw) = outbound.recv().await {
            let env = IpcEnvelope::from_json(&raw).unwrap();
            let method = env.inner.method().to_string();
            if method == "stop_daemon" {
                host_side
                    .deliver(&env.callback_code, RpcResponse::success(json!("")).to_value())
                    .unwrap();
                seen.push(method);
                break;
            }
            seen.push(method);
        }
        seen
    });

    let gw = CapabilityGateway::new(correlator.clone(), GatewayOptions::default());
    gw.stop_daemon().await.unwrap();

    assert_eq!(host.await.unwrap(), vec!["daemon_rpc", "stop_daemon"]);
    assert_eq!(correlator.pending_count(), 0);
}

#[tokio::test]
async fn start_daemon_fails_fast_once_host_channel_closes() {
    let (transport, mut outbound) = ChannelTransport::new();
    let correlator = Arc::new(CallCorrelator::new(Arc::new(transport)));

    // Acknowledge start_daemon, then the host goes away.
    let host_side = Arc::clone(&correlator);
    tokio::spawn(async move {
        if let Some(raw) = outbound.recv().await {
            let env = IpcEnvelope::from_json(&raw).unwrap();
            host_side
                .deliver(&env.callback_code, RpcResponse::success(Value::Null).to_value())
                .unwrap();
        }
        if outbound.recv().await.is_some() {
            host_side.fail_all("host exited");
        }
    });

    let gw = CapabilityGateway::new(correlator.clone(), GatewayOptions::default());
    let err = tokio::time::timeout(Duration::from_secs(1), gw.start_daemon(json!({})))
        .await
        .expect("startup must not hang after the host channel closes")
        .unwrap_err();
    assert!(matches!(err, BridgeError::Disconnected));
    assert_eq!(gw.startup_state(), StartupState::Failed);
    assert_eq!(correlator.pending_count(), 0);
}
