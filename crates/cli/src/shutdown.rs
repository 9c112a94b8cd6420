use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Listens for SIGINT/SIGTERM and cancels the sync run. The orchestrator
/// observes the token between pages, so a signal never interrupts a page
/// mid-apply; the run stops at the next page boundary with its checkpoint
/// durable.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel_token: CancellationToken,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates the coordinator and spawns the signal listener.
    pub fn install(cancel_token: CancellationToken) -> Self {
        let coordinator = Self {
            cancel_token,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        };

        let cancel_token = coordinator.cancel_token.clone();
        let shutdown_flag = coordinator.shutdown_requested.clone();
        tokio::spawn(async move {
            let signal_name = wait_for_signal().await;
            info!("Received {signal_name}, finishing the current page before stopping");

            shutdown_flag.store(true, Ordering::SeqCst);
            cancel_token.cancel();
        });

        coordinator
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT (Ctrl+C)",
        _ = terminate => "SIGTERM",
    }
}

/// Exit codes for the CLI application.
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// At least one entity type failed while another finished.
    PartialFailure = 2,
    ShutdownRequested = 130, // Standard exit code for SIGINT
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
