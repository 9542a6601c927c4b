//! Signal handling and run cancellation

use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation token checked by the runner before each card
#[derive(Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Exit status for a forced stop (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// Cancel on the first signal; returns true when a second one should force exit
fn handle_signal(token: &CancellationToken, signal_name: &str) -> bool {
    if token.is_cancelled() {
        eprintln!("\nReceived {} again, exiting now", signal_name);
        return true;
    }
    eprintln!(
        "\nReceived {}, stopping after the current card (repeat to force exit)...",
        signal_name
    );
    token.cancel();
    false
}

/// Cancel `token` on SIGINT/SIGTERM (Ctrl+C elsewhere); a second signal exits
pub async fn setup_signal_handlers(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigint, mut sigterm) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(int), Ok(term)) => (int, term),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to install signal handlers");
                return;
            }
        };

        loop {
            let signal_name = tokio::select! {
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            };
            if handle_signal(&token, signal_name) {
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    }

    #[cfg(not(unix))]
    {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
                return;
            }
            if handle_signal(&token, "Ctrl+C") {
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    }
}
