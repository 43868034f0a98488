use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pneumoscan::api::{self, AppState};
use pneumoscan::config;
use pneumoscan::pipeline::OutputStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let store = OutputStore::open(config::archives_dir())?;

    let state = Arc::new(AppState {
        store,
        model: load_model(),
        worker_pool_size: config::worker_pool_size(),
    });

    let addr = std::env::var("PNEUMOSCAN_ADDR").unwrap_or_else(|_| "127.0.0.1:8350".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        workers = state.worker_pool_size,
        archives = %state.store.dir().display(),
        "listening"
    );

    axum::serve(listener, api::router(state)).await?;
    Ok(())
}

/// Load the classifier named by `PNEUMOSCAN_MODEL`, when built with ONNX
/// support. Without a model `/predict` reports 503 and conversion still
/// works.
fn load_model() -> Option<Arc<dyn pneumoscan::classify::XrayModel>> {
    let Some(path) = std::env::var_os("PNEUMOSCAN_MODEL") else {
        tracing::info!("PNEUMOSCAN_MODEL not set, classifier disabled");
        return None;
    };

    #[cfg(feature = "onnx-model")]
    {
        let path = std::path::PathBuf::from(path);
        match pneumoscan::classify::OnnxXrayModel::load(&path) {
            Ok(model) => Some(Arc::new(model)),
            Err(e) => {
                tracing::error!(error = %e, "failed to load classifier model");
                None
            }
        }
    }

    #[cfg(not(feature = "onnx-model"))]
    {
        tracing::warn!(
            model = %std::path::PathBuf::from(path).display(),
            "built without the onnx-model feature, classifier disabled"
        );
        None
    }
}
