use crate::api::PlatformApi;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Serves the platform API on `addr` until the drain signal fires.
///
/// Accepting stops as soon as the signal arrives; connections opened
/// before it each hold a drain watch, so shutdown waits for them to
/// finish.
pub async fn serve(
    addr: SocketAddr,
    api: PlatformApi,
    drain: drain::Watch,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "platform API server listening");

    let connections = drain.clone();
    tokio::pin! {
        let shutdown = drain.signaled();
    }

    loop {
        let (stream, client) = tokio::select! {
            _ = (&mut shutdown) => {
                info!("API server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(error) => {
                    debug!(%error, "Failed to accept a connection");
                    continue;
                }
            },
        };

        let service = TowerToHyperService::new(api.clone());
        let watch = connections.clone();
        tokio::spawn(async move {
            let served = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await;
            if let Err(error) = served {
                debug!(%client, %error, "Connection closed");
            }
            drop(watch);
        });
    }
}
