//! SIGINT / SIGTERM handling.
//!
//! A background thread waits for signals on its own tokio runtime. While the
//! [`InterruptFlag`] is armed a signal raises it and validation stops at its
//! next check. Once disarmed, a signal terminates the process with status 1.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{io_err, TestError};

/// Exit status used when a signal arrives outside validation.
const INTERRUPTED_EXIT_CODE: i32 = 1;

#[derive(Debug, Default)]
struct FlagState {
    raised: AtomicBool,
    armed: AtomicBool,
}

/// Shared flag raised once an interrupt arrives.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<FlagState>);

impl InterruptFlag {
    pub fn raise(&self) {
        self.0.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.raised.load(Ordering::SeqCst)
    }

    /// Route signals into the flag.
    pub fn arm(&self) {
        self.0.armed.store(true, Ordering::SeqCst);
    }

    /// Let the next signal terminate the process.
    pub fn disarm(&self) {
        self.0.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.0.armed.load(Ordering::SeqCst)
    }
}

/// Install the signal watcher and return an armed flag.
pub fn install() -> Result<InterruptFlag, TestError> {
    let flag = InterruptFlag::default();
    flag.arm();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    let watched = flag.clone();
    std::thread::Builder::new()
        .name("jetstream-signals".to_owned())
        .spawn(move || {
            runtime.block_on(async move {
                while wait_for_signal().await {
                    if !on_signal(&watched) {
                        std::process::exit(INTERRUPTED_EXIT_CODE);
                    }
                }
            })
        })
        .map_err(|e| io_err("signal-thread", e))?;
    Ok(flag)
}

/// Handle one signal. Returns `false` when the process should exit.
fn on_signal(flag: &InterruptFlag) -> bool {
    if flag.is_armed() {
        tracing::warn!("received interrupt, stopping validation");
        flag.raise();
        true
    } else {
        tracing::warn!("received interrupt, exiting");
        false
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(error = %err, "SIGTERM handler unavailable");
            return ctrl_c().await;
        }
    };
    tokio::select! {
        received = ctrl_c() => received,
        _ = terminate.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    ctrl_c().await
}

async fn ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "ctrl-c handler failed");
            false
        }
    }
}
