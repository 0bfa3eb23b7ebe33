//! # Termination signals.
//!
//! [`wait_for_shutdown_signal`] completes on the first termination signal:
//! `SIGINT`, `SIGTERM` or `SIGQUIT` on unix, Ctrl-C elsewhere. It backs
//! [`Engine::run_until_signal`](crate::Engine::run_until_signal).

/// Waits for a termination signal; `Err` if the handlers cannot be installed.
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigquit = signal(SignalKind::quit())?;

        let received = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sigquit.recv() => "SIGQUIT",
        };
        tracing::info!(signal = received, "termination signal received");
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!(signal = "ctrl-c", "termination signal received");
        Ok(())
    }
}
