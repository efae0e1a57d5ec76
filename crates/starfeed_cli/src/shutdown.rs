use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;

/// Ctrl+C state shared with the bulk producers.
///
/// The first press stops new work items from being enqueued while running
/// ones drain. The second press exits with status 130.
#[derive(Debug, Clone, Default)]
pub(crate) struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    /// Spawn the signal listener and return the handle it will flip.
    pub(crate) fn install() -> Self {
        let shutdown = Self::default();
        let flag = shutdown.clone();

        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }

            let is_tty = Term::stderr().is_term();
            if is_tty {
                eprintln!("\n\nStopping after the items in progress...");
                eprintln!("Press Ctrl+C again to force quit.");
            } else {
                tracing::warn!("Shutdown requested, draining in-flight work items");
            }
            flag.request();

            if tokio::signal::ctrl_c().await.is_ok() {
                if is_tty {
                    eprintln!("Force quit!");
                }
                std::process::exit(130);
            }
        });

        shutdown
    }

    #[inline]
    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    #[inline]
    fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }
}
