use symptom_flow::ArtifactLoader;
use symptom_service::{
    ServiceConfig, build_router, create_app_state, spawn_session_sweeper,
    telemetry::init_tracing,
};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env();
    init_tracing(config.log_format);

    // Without all three artifacts there is nothing to offer, so refuse to listen at all.
    let loader = ArtifactLoader::new(config.artifact_paths());
    let bind_address = config.bind_address();
    let app_state = match create_app_state(config, &loader) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!(error = %e, "{}", e.user_message());
            std::process::exit(1);
        }
    };
    spawn_session_sweeper(&app_state);
    let app = build_router(app_state);

    let listener = TcpListener::bind(&bind_address).await?;
    let addr = listener.local_addr()?;

    info!("Symptom Disease Prediction Service starting on {}", addr);
    info!("Symptom form: GET http://{}/form", addr);
    info!("Health check endpoint: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
