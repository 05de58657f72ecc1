use axum::Router;
use eyre::{
    Result,
    WrapErr,
};
use std::{
    future::IntoFuture,
    time::Duration,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serve `router` until `cancel` fires, then give in-flight requests `grace`
/// to finish before the remaining connections are dropped.
pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
    grace: Duration,
) -> Result<()> {
    let addr = listener.local_addr().wrap_err("reading listener address")?;
    info!(server = name, %addr, "listening");

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.wrap_err_with(|| format!("{name} server failed"));
        }
        _ = cancel.cancelled() => {}
    }

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => {
            if let Err(e) = result {
                error!(server = name, error = %e, "server shutdown failed");
            }
        }
        Err(_) => warn!(
            server = name,
            grace = %humantime::format_duration(grace),
            "graceful shutdown timed out, closing remaining connections"
        ),
    }

    info!(server = name, "stopped");
    Ok(())
}
