//! Line-delimited stdio channel to the host.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use hostbridge_common::BridgeError;
use hostbridge_rpc::{CallCorrelator, Transport};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Writes each outbound envelope as one line.
pub struct LineTransport<W> {
    out: Mutex<W>,
}

impl LineTransport<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> LineTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Transport for LineTransport<W> {
    fn post_message(&self, message: &str) -> Result<(), BridgeError> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{message}")
            .and_then(|()| out.flush())
            .map_err(|e| BridgeError::Transport(format!("failed to write to host: {e}")))
    }
}

/// Feed host invocations, one per line, into the correlator until the
/// reader hits EOF. Calls still pending at EOF are failed.
pub async fn pump_invocations<R>(reader: R, correlator: Arc<CallCorrelator>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut delivered = 0;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match correlator.dispatch_invocation(line) {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!(error = %e, "dropping host message"),
                }
            }
            Ok(None) => {
                debug!("host closed its side of the channel");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to read from host");
                break;
            }
        }
    }

    let failed = correlator.fail_all("host channel closed");
    if failed > 0 {
        info!(failed, "pending calls failed after host disconnect");
    }
    delivered
}
