use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::error::Result;
use crate::services::RecognizerService;

/// Start the API server and run until `shutdown` resolves.
///
/// The model is loaded eagerly before binding; a failed load is logged and
/// retried by the first request that needs it.
pub async fn start_api_server<F>(
    recognizer: Arc<RecognizerService>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    recognizer.warm_up().await;

    let app = create_router(AppState::new(recognizer));

    let listener = TcpListener::bind(addr).await?;
    info!("🚀 Digit recognizer listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
