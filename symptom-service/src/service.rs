use axum::{
    Router,
    extract::{Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use symptom_flow::{
    Answer, ArtifactLoader, DiagnosisRunner, FeaturePipeline, FlowError, InMemorySessionStorage,
    SessionStorage, presenter,
};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    models::{
        FormResponse, NoticeResponse, PredictRequest, ResetResponse, SessionCreated,
        SessionViewResponse,
    },
};

pub const PAGE_TITLE: &str = "Form Prediksi Penyakit";
pub const FORM_HEADING: &str = "Pilih Gejala yang Dialami";
pub const SUBMIT_LABEL: &str = "🚀 Prediksi Penyakit";
pub const RESET_LABEL: &str = "Reset";
pub const INVALID_REQUEST_MESSAGE: &str = "Data formulir tidak valid.";

type ApiError = (StatusCode, Json<NoticeResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn notice(status: StatusCode, level: &str, code: &str, message: String) -> ApiError {
    (
        status,
        Json(NoticeResponse {
            level: level.to_string(),
            code: code.to_string(),
            message,
        }),
    )
}

/// Validation problems are user-correctable warnings; everything else is a generic failure.
fn api_error(err: FlowError) -> ApiError {
    match &err {
        FlowError::Validation(validation) => notice(
            StatusCode::UNPROCESSABLE_ENTITY,
            "warning",
            validation.code(),
            err.user_message(),
        ),
        FlowError::SessionNotFound(_) => notice(
            StatusCode::NOT_FOUND,
            "error",
            "session_not_found",
            err.user_message(),
        ),
        _ => {
            error!(error = %err, "Request failed");
            notice(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "prediction_failed",
                err.user_message(),
            )
        }
    }
}

/// Bodies that do not deserialize (answers other than 0/1, negative ages) get the same
/// warning shape as domain validation failures.
fn invalid_request(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "Rejected request body");
    notice(
        rejection.status(),
        "warning",
        "invalid_request",
        format!("{INVALID_REQUEST_MESSAGE} ({})", rejection.body_text()),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub runner: DiagnosisRunner,
    pub config: Arc<ServiceConfig>,
}

/// Load the artifacts and assemble the router. Artifact errors are returned to the caller
/// untouched so it can refuse to start.
pub fn create_app(config: ServiceConfig, loader: &ArtifactLoader) -> symptom_flow::Result<Router> {
    let app_state = create_app_state(config, loader)?;
    Ok(build_router(app_state))
}

pub fn create_app_state(
    config: ServiceConfig,
    loader: &ArtifactLoader,
) -> symptom_flow::Result<AppState> {
    let artifacts = loader.load()?;
    let pipeline = Arc::new(FeaturePipeline::new(
        artifacts,
        config.require_patient_identity,
    ));
    let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());

    Ok(AppState {
        runner: DiagnosisRunner::new(pipeline, session_storage),
        config: Arc::new(config),
    })
}

/// Periodically drop sessions that have been idle longer than the configured timeout.
pub fn spawn_session_sweeper(app_state: &AppState) -> JoinHandle<()> {
    let runner = app_state.runner.clone();
    let max_idle = app_state.config.session_idle_timeout();
    let mut ticker = tokio::time::interval(app_state.config.session_sweep_interval());

    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            if let Err(e) = runner.sweep_idle(max_idle).await {
                warn!(error = %e, "Idle session sweep failed");
            }
        }
    })
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/form", get(get_form))
        .route("/sessions", post(create_session))
        .route(
            "/sessions/{session_id}",
            get(get_session).delete(delete_session),
        )
        .route("/sessions/{session_id}/predict", post(predict))
        .route("/sessions/{session_id}/reset", post(reset_session))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Symptom Disease Prediction Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Predicts a disease from a symptom checklist using a pre-trained classifier",
        "endpoints": {
            "GET /form": "Symptom form layout",
            "POST /sessions": "Start a new session",
            "GET /sessions/{session_id}": "Current result of a session",
            "POST /sessions/{session_id}/predict": "Submit patient details and symptoms",
            "POST /sessions/{session_id}/reset": "Clear the session result",
            "DELETE /sessions/{session_id}": "End a session",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let artifacts = state.runner.pipeline().artifacts();
    let sessions = state.runner.session_count().await.unwrap_or_default();

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "features": artifacts.feature_names().len(),
        "classes": artifacts.class_labels().len(),
        "sessions": sessions
    }))
}

#[derive(Debug, Default, Deserialize)]
struct FormQuery {
    patient_name: Option<String>,
}

async fn get_form(State(state): State<AppState>, Query(query): Query<FormQuery>) -> Json<FormResponse> {
    let pipeline = state.runner.pipeline();

    Json(FormResponse {
        page_title: PAGE_TITLE.to_string(),
        heading: FORM_HEADING.to_string(),
        prompt: presenter::form_prompt(query.patient_name.as_deref().unwrap_or_default()),
        require_patient_identity: pipeline.requires_patient_identity(),
        options: Answer::ALL.into_iter().map(Into::into).collect(),
        layout: pipeline.form(),
        submit_label: SUBMIT_LABEL.to_string(),
        reset_label: RESET_LABEL.to_string(),
    })
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let session = state.runner.start_session().await.map_err(api_error)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id,
            created_at: session.created_at.to_rfc3339(),
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionViewResponse> {
    let result = state.runner.view(&session_id).await.map_err(api_error)?;
    Ok(Json(SessionViewResponse { session_id, result }))
}

async fn predict(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<SessionViewResponse> {
    let Json(request) = payload.map_err(invalid_request)?;
    info!(
        session_id = %session_id,
        answered = request.selections.len(),
        "Processing prediction request"
    );

    let result = state
        .runner
        .submit(&session_id, &request.into())
        .await
        .map_err(api_error)?;

    Ok(Json(SessionViewResponse { session_id, result }))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ResetResponse> {
    let result = state.runner.reset(&session_id).await.map_err(api_error)?;

    Ok(Json(ResetResponse {
        session_id,
        notice: presenter::RESET_NOTICE.to_string(),
        result,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .runner
        .end_session(&session_id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
