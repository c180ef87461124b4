//! Signal handling for graceful shutdown

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// Which signal asked us to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Terminate,
    Interrupt,
}

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignal {
    /// Register the signal handlers
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next shutdown signal
    pub async fn wait(&mut self) -> Shutdown {
        tokio::select! {
            _ = self.sigterm.recv() => {
                debug!("received SIGTERM");
                Shutdown::Terminate
            }
            _ = self.sigint.recv() => {
                debug!("received SIGINT");
                Shutdown::Interrupt
            }
        }
    }
}
