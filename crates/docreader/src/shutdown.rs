use std::future::Future;
use tokio::sync::oneshot;
use tracing::error;

/// Start listening for Ctrl-C now and return a future that resolves on the
/// first interrupt.
///
/// The listener is registered before this returns, so an interrupt that
/// arrives while a scan is running is held until the loop next checks for
/// it instead of killing the process.
pub async fn interrupt() -> impl Future<Output = ()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => error!(error = %e, "Failed to listen for interrupt"),
        }
    });

    // Let the listener task run up to its first await, which installs the handler
    tokio::task::yield_now().await;

    interrupted(rx)
}

/// Resolves when `rx` fires. A listener that gave up never resolves.
async fn interrupted(rx: oneshot::Receiver<()>) {
    if rx.await.is_err() {
        std::future::pending::<()>().await;
    }
}
