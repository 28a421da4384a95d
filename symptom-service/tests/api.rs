use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::path::PathBuf;
use symptom_flow::{ArtifactLoader, FlowError, presenter};
use std::time::Duration;
use symptom_service::{
    ServiceConfig, build_router, create_app, create_app_state, spawn_session_sweeper,
};
use tower::ServiceExt;

fn demo_artifacts() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/artifacts")
}

fn app(require_identity: bool) -> Router {
    let config = ServiceConfig {
        artifact_dir: demo_artifacts(),
        require_patient_identity: require_identity,
        ..ServiceConfig::default()
    };
    let loader = ArtifactLoader::new(config.artifact_paths());
    create_app(config, &loader).expect("demo artifacts load")
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let app = app(true);
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["features"], 20);
    assert_eq!(body["classes"], 4);
}

#[tokio::test]
async fn test_form_layout() {
    let app = app(true);
    let (status, body) = send(&app, "GET", "/form?patient_name=Zulkidin", None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["page_title"], "Form Prediksi Penyakit");
    assert_eq!(body["prompt"], "Harap isi gejala untuk pasien: **Zulkidin**");
    assert_eq!(body["require_patient_identity"], true);
    assert_eq!(
        body["options"],
        json!([{"value": 0, "label": "Tidak"}, {"value": 1, "label": "Ya"}])
    );

    let columns = body["layout"]["columns"].as_array().unwrap();
    assert_eq!(columns[0].as_array().unwrap().len(), 10);
    assert_eq!(columns[1].as_array().unwrap().len(), 10);
    assert_eq!(columns[0][0]["label"], "Cough");
    assert_eq!(columns[0][0]["key"], "feat_0");
    assert_eq!(columns[1][0]["feature"], "SHORTNESS_OF_BREATH");
    assert_eq!(columns[1][0]["label"], "Shortness Of Breath");
}

#[tokio::test]
async fn test_fresh_session_shows_placeholder() {
    let app = app(true);
    let id = new_session(&app).await;

    let (status, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["state"], "empty");
    assert_eq!(body["result"]["message"], presenter::PLACEHOLDER);
}

#[tokio::test]
async fn test_predict_flu() {
    let app = app(true);
    let id = new_session(&app).await;

    let request = json!({
        "patient_name": "Alice",
        "patient_age": 34,
        "selections": {"FEVER": 1, "MUSCLE_ACHES": 1, "COUGH": 0}
    });
    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/predict"), Some(request)).await;
    assert_eq!(status, StatusCode::OK);

    let result = &body["result"];
    assert_eq!(result["state"], "ready");
    assert_eq!(result["patient_header"], "Pasien: Alice (34 tahun)");
    assert_eq!(result["presentation"]["disease_name"], "FLU");
    assert_eq!(result["presentation"]["style"], "warning");
    assert_eq!(result["presentation"]["disclaimer"], presenter::DISCLAIMER);

    // The result survives into the next read of the session.
    let (_, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(body["result"]["presentation"]["disease_name"], "FLU");
}

#[tokio::test]
async fn test_missing_identity_is_a_warning() {
    let app = app(true);
    let id = new_session(&app).await;

    let request = json!({"patient_name": "Alice", "selections": {"FEVER": 1}});
    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/predict"), Some(request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["level"], "warning");
    assert_eq!(body["code"], "missing_patient_identity");
    assert_eq!(
        body["message"],
        "Mohon isi Nama dan Usia Pasien di sidebar terlebih dahulu."
    );

    let (_, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(body["result"]["state"], "empty");
}

#[tokio::test]
async fn test_no_symptoms_is_a_warning() {
    let app = app(false);
    let id = new_session(&app).await;

    let request = json!({"selections": {"FEVER": 0, "COUGH": 0}});
    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/predict"), Some(request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_symptoms_selected");
    assert_eq!(
        body["message"],
        "Anda tidak memilih gejala apapun. Silakan pilih minimal satu gejala."
    );
}

#[tokio::test]
async fn test_identity_not_required_variant() {
    let app = app(false);
    let id = new_session(&app).await;

    let request = json!({"selections": {"ITCHY_NOSE": 1}});
    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/predict"), Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["presentation"]["disease_name"], "ALLERGY");
    assert_eq!(body["result"]["presentation"]["style"], "info");
    assert_eq!(body["result"]["patient_header"], "Pasien:  (- tahun)");
}

#[tokio::test]
async fn test_invalid_answer_value_is_rejected() {
    let app = app(false);
    let id = new_session(&app).await;

    let bodies = [
        json!({"selections": {"FEVER": 3}}),
        json!({"patient_age": -1, "selections": {"FEVER": 1}}),
        json!({"patient_age": 70000, "selections": {"FEVER": 1}}),
    ];
    for request in bodies {
        let (status, body) =
            send(&app, "POST", &format!("/sessions/{id}/predict"), Some(request)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["level"], "warning");
        assert_eq!(body["code"], "invalid_request");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with(symptom_service::service::INVALID_REQUEST_MESSAGE)
        );
    }

    let (_, body) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(body["result"]["state"], "empty");
}

#[tokio::test]
async fn test_age_above_limit_uses_same_warning_shape() {
    let app = app(false);
    let id = new_session(&app).await;

    let request = json!({"patient_age": 130, "selections": {"FEVER": 1}});
    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/predict"), Some(request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["level"], "warning");
    assert_eq!(body["code"], "age_out_of_range");
}

#[tokio::test]
async fn test_unknown_symptom_is_rejected() {
    let app = app(false);
    let id = new_session(&app).await;

    let request = json!({"selections": {"HEADACHE": 1}});
    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/predict"), Some(request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "unknown_symptom");
}

#[tokio::test]
async fn test_overwrite_then_reset() {
    let app = app(true);
    let id = new_session(&app).await;

    let first = json!({"patient_name": "Alice", "patient_age": 30, "selections": {"FEVER": 1, "MUSCLE_ACHES": 1}});
    let second = json!({"patient_name": "Bob", "patient_age": 0, "selections": {"LOSS_OF_SMELL": 1}});
    send(&app, "POST", &format!("/sessions/{id}/predict"), Some(first)).await;
    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/predict"), Some(second)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["patient_header"], "Pasien: Bob (0 tahun)");
    assert_eq!(body["result"]["presentation"]["disease_name"], "COVID");
    assert_eq!(body["result"]["presentation"]["style"], "error");

    let (status, body) = send(&app, "POST", &format!("/sessions/{id}/reset"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"], "Formulir telah di-reset.");
    assert_eq!(body["result"]["state"], "empty");
}

#[tokio::test]
async fn test_unknown_and_deleted_sessions() {
    let app = app(true);
    let (status, body) = send(&app, "GET", "/sessions/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "session_not_found");

    let id = new_session(&app).await;
    let (status, _) = send(&app, "DELETE", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_do_not_share_results() {
    let app = app(false);
    let a = new_session(&app).await;
    let b = new_session(&app).await;

    send(
        &app,
        "POST",
        &format!("/sessions/{a}/predict"),
        Some(json!({"selections": {"COUGH": 1}})),
    )
    .await;

    let (_, body) = send(&app, "GET", &format!("/sessions/{b}"), None).await;
    assert_eq!(body["result"]["state"], "empty");
    let (_, body) = send(&app, "GET", &format!("/sessions/{a}"), None).await;
    assert_eq!(body["result"]["presentation"]["disease_name"], "COLD");
    assert_eq!(body["result"]["presentation"]["style"], "success");
}

#[test]
fn test_missing_artifacts_refuse_to_start() {
    let config = ServiceConfig {
        artifact_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("no-such-dir"),
        ..ServiceConfig::default()
    };
    let loader = ArtifactLoader::new(config.artifact_paths());
    let err = create_app(config, &loader).err().expect("startup must fail");
    assert!(matches!(err, FlowError::ArtifactNotFound { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_idle_sessions_are_swept() {
    let config = ServiceConfig {
        artifact_dir: demo_artifacts(),
        session_idle_secs: 1,
        session_sweep_secs: 1,
        ..ServiceConfig::default()
    };
    let loader = ArtifactLoader::new(config.artifact_paths());
    let state = create_app_state(config, &loader).unwrap();
    let sweeper = spawn_session_sweeper(&state);
    let app = build_router(state);

    let id = new_session(&app).await;
    let (status, _) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    let (status, _) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    sweeper.abort();
}
