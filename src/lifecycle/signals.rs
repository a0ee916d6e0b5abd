//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown

use tokio::signal::unix::{signal, Signal, SignalKind};

/// What the process should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Reload,
    Shutdown,
}

/// Waits for reload and shutdown signals.
pub struct SignalListener {
    hangup: Signal,
    terminate: Signal,
    interrupt: Signal,
}

impl SignalListener {
    /// Must be called from within a Tokio runtime.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
        })
    }

    pub async fn next(&mut self) -> LifecycleEvent {
        tokio::select! {
            Some(()) = self.hangup.recv() => {
                tracing::info!("SIGHUP received");
                LifecycleEvent::Reload
            }
            _ = self.terminate.recv() => {
                tracing::info!("SIGTERM received");
                LifecycleEvent::Shutdown
            }
            _ = self.interrupt.recv() => {
                tracing::info!("SIGINT received");
                LifecycleEvent::Shutdown
            }
        }
    }
}
