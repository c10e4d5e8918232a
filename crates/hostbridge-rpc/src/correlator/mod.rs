//! Request/response correlation over the one-way host channel.
//!
//! Every outgoing call gets a fresh [`CallToken`]; a one-shot sender is parked
//! under it in the pending table and the call's future waits on the receiver.
//! The host answers by invoking the token's callback code, which removes the
//! entry and fires the sender. Entries are removed before firing, so a
//! duplicate delivery finds nothing and can never resolve a call twice.
//! A call whose future is dropped takes its entry with it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use hostbridge_common::{BridgeError, CallToken, TokenAllocator};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::codec::{build_request, RpcRequest, RpcResponse};
use crate::envelope::{HostInvocation, IpcEnvelope};
use crate::transport::Transport;
use crate::HostRpc;


type PendingCall = oneshot::Sender<Result<RpcResponse, BridgeError>>;
type PendingCalls = HashMap<CallToken, PendingCall>;

/// Matches host replies to the calls that caused them.
pub struct CallCorrelator {
    transport: Arc<dyn Transport>,
    tokens: TokenAllocator,
    pending: Mutex<PendingCalls>,
    /// Set by `fail_all`; flipped only while holding the `pending` lock.
    closed: AtomicBool,
}

/// Removes a call's entry when its `send` future goes away, whether it
/// settled, failed to post, or was dropped mid-flight.
struct PendingEntry<'a> {
    correlator: &'a CallCorrelator,
    token: CallToken,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        if self.correlator.table().remove(&self.token).is_some() {
            debug!(callback_code = %self.token, "dropped call removed from pending table");
        }
    }
}

impl CallCorrelator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            tokens: TokenAllocator::new(),
            pending: Mutex::new(PendingCalls::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Post `request` to the host and wait for the matching reply.
    ///
    /// There is no timeout: the future settles when the host answers or the
    /// host channel is torn down via [`fail_all`](Self::fail_all). Once the
    /// channel is closed every new call fails with
    /// [`BridgeError::Disconnected`] without being posted.
    pub async fn send(&self, request: RpcRequest) -> Result<Value, BridgeError> {
        let token = self.tokens.next_token();
        let callback_code = token.callback_code();
        let method = request.method().to_string();
        let raw = IpcEnvelope::new(callback_code.clone(), request).to_json()?;

        let (tx, rx) = oneshot::channel();
        {
            let mut table = self.table();
            if self.closed.load(Ordering::Acquire) {
                debug!(method = %method, "host channel closed, refusing call");
                return Err(BridgeError::Disconnected);
            }
            table.insert(token, tx);
        }
        let _entry = PendingEntry {
            correlator: self,
            token,
        };

        debug!(method = %method, callback_code = %callback_code, "posting host call");
        if let Err(e) = self.transport.post_message(&raw) {
            warn!(method = %method, error = %e, "host call could not be posted");
            return Err(e);
        }

        let response = rx.await.map_err(|_| BridgeError::Disconnected)??;
        trace!(method = %method, callback_code = %callback_code, "host call settled");
        response.into_result()
    }

    /// Complete the call registered under `callback_code` with the host's
    /// single callback argument (a response object or its JSON string).
    ///
    /// An argument that cannot be decoded still settles the call, with
    /// [`BridgeError::MalformedResponse`].
    pub fn deliver(&self, callback_code: &str, argument: Value) -> Result<(), BridgeError> {
        let sender = CallToken::from_callback_code(callback_code)
            .and_then(|token| self.table().remove(&token))
            .ok_or_else(|| BridgeError::UnknownCallback(callback_code.to_string()))?;

        let outcome = RpcResponse::from_argument(argument);
        if let Err(e) = &outcome {
            warn!(callback_code, error = %e, "host delivered an undecodable response");
        }
        if sender.send(outcome).is_err() {
            debug!(callback_code, "caller abandoned the call before the host answered");
        }
        Ok(())
    }

    /// Deliver a serialized `{"callback_code", "argument"}` invocation.
    pub fn dispatch_invocation(&self, raw: &str) -> Result<(), BridgeError> {
        let invocation = HostInvocation::from_json(raw)?;
        self.deliver(&invocation.callback_code, invocation.argument)
    }

    /// Reject every pending call and refuse new ones. Used when the host
    /// channel goes away.
    pub fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<PendingCall> = {
            let mut table = self.table();
            self.closed.store(true, Ordering::Release);
            table.drain().map(|(_, tx)| tx).collect()
        };
        let count = drained.len();
        if count > 0 {
            warn!(count, reason, "failing pending host calls");
        }
        for tx in drained {
            let _ = tx.send(Err(BridgeError::Disconnected));
        }
        count
    }

    /// Whether [`fail_all`](Self::fail_all) has closed the host channel.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of calls still waiting for the host.
    pub fn pending_count(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, PendingCalls> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HostRpc for CallCorrelator {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, BridgeError> {
        self.send(build_request(method, params)).await
    }
}
