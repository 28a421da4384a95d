//! DiagnosisRunner – wraps the _load session → run pipeline → save session_ round trip.
//!
//! Handlers in the presentation layer should go through the runner rather than touching
//! [`SessionStorage`] directly, so a successful prediction can never be computed without
//! also landing in the session's result slot.
//!
//! Failed submissions (validation or integration errors) leave the slot exactly as it was.

use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::{FlowError, Result},
    pipeline::{FeaturePipeline, FormLayout, Submission},
    presenter::{ResultView, render_session},
    storage::{Session, SessionStorage},
};

#[derive(Clone)]
pub struct DiagnosisRunner {
    pipeline: Arc<FeaturePipeline>,
    storage: Arc<dyn SessionStorage>,
}

impl DiagnosisRunner {
    pub fn new(pipeline: Arc<FeaturePipeline>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { pipeline, storage }
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn form(&self) -> FormLayout {
        self.pipeline.form()
    }

    pub async fn start_session(&self) -> Result<Session> {
        let session = Session::new_random();
        self.storage.save(session.clone()).await?;
        info!(session_id = %session.id, "Session started");
        Ok(session)
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }

    /// Write back a loaded session. A session deleted in the meantime stays deleted.
    async fn store(&self, session: Session) -> Result<()> {
        let id = session.id.clone();
        if self.storage.update(session).await? {
            Ok(())
        } else {
            Err(FlowError::SessionNotFound(id))
        }
    }

    /// Run one submission for the session and store the prediction on success.
    pub async fn submit(&self, session_id: &str, submission: &Submission) -> Result<ResultView> {
        let mut session = self.load(session_id).await?;

        let diagnosis = self.pipeline.submit(submission).inspect_err(|e| {
            warn!(session_id = %session_id, error = %e, "Submission rejected");
        })?;

        session
            .state
            .set_for_patient(&diagnosis.disease_name, &submission.patient);
        session.touch();
        let view = render_session(&session.state);
        self.store(session).await?;

        info!(
            session_id = %session_id,
            disease = %diagnosis.disease_name,
            "Prediction stored in session"
        );
        Ok(view)
    }

    pub async fn reset(&self, session_id: &str) -> Result<ResultView> {
        let mut session = self.load(session_id).await?;
        session.state.clear();
        session.touch();
        let view = render_session(&session.state);
        self.store(session).await?;

        info!(session_id = %session_id, "Session result cleared");
        Ok(view)
    }

    pub async fn view(&self, session_id: &str) -> Result<ResultView> {
        let session = self.load(session_id).await?;
        Ok(render_session(&session.state))
    }

    pub async fn session_count(&self) -> Result<usize> {
        self.storage.count().await
    }

    /// Drop sessions with no submit or reset for longer than `max_idle`.
    pub async fn sweep_idle(&self, max_idle: Duration) -> Result<usize> {
        let removed = self.storage.remove_idle(max_idle).await?;
        if removed > 0 {
            info!(removed, "Idle sessions removed");
        }
        Ok(removed)
    }

    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        self.load(session_id).await?;
        self.storage.delete(session_id).await?;
        info!(session_id = %session_id, "Session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::pipeline::{Answer, PatientIdentity, tests::tree_artifacts};
    use crate::presenter::NoticeStyle;
    use crate::storage::InMemorySessionStorage;

    fn runner(require_identity: bool) -> DiagnosisRunner {
        let pipeline = Arc::new(FeaturePipeline::new(tree_artifacts(), require_identity));
        DiagnosisRunner::new(pipeline, Arc::new(InMemorySessionStorage::new()))
    }

    fn submission(name: &str, age: Option<u16>, symptoms: &[&str]) -> Submission {
        Submission {
            patient: PatientIdentity::new(name, age),
            selections: symptoms
                .iter()
                .map(|s| (s.to_string(), Answer::Yes))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_new_session_shows_placeholder() {
        let runner = runner(true);
        let session = runner.start_session().await.unwrap();
        let view = runner.view(&session.id).await.unwrap();
        assert!(matches!(view, ResultView::Empty { .. }));
    }

    #[tokio::test]
    async fn test_submit_stores_and_renders() {
        let runner = runner(true);
        let session = runner.start_session().await.unwrap();

        let view = runner
            .submit(&session.id, &submission("Alice", Some(34), &["fever"]))
            .await
            .unwrap();

        let ResultView::Ready {
            patient_header,
            presentation,
            ..
        } = view
        else {
            panic!("expected a rendered result");
        };
        assert_eq!(patient_header, "Pasien: Alice (34 tahun)");
        assert_eq!(presentation.disease_name, "FLU");
        assert_eq!(presentation.style, NoticeStyle::Warning);

        // Reading back goes through storage.
        let stored = runner.view(&session.id).await.unwrap();
        assert_eq!(stored.presentation().unwrap().disease_name, "FLU");
    }

    #[tokio::test]
    async fn test_second_submit_overwrites() {
        let runner = runner(true);
        let session = runner.start_session().await.unwrap();

        runner
            .submit(&session.id, &submission("Alice", Some(34), &["fever"]))
            .await
            .unwrap();
        runner
            .submit(&session.id, &submission("Bob", Some(51), &["fever", "cough"]))
            .await
            .unwrap();

        let ResultView::Ready {
            patient_header,
            presentation,
            ..
        } = runner.view(&session.id).await.unwrap()
        else {
            panic!("expected a rendered result");
        };
        assert_eq!(patient_header, "Pasien: Bob (51 tahun)");
        assert_eq!(presentation.disease_name, "COVID");
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_previous_result() {
        let runner = runner(true);
        let session = runner.start_session().await.unwrap();
        runner
            .submit(&session.id, &submission("Alice", Some(34), &["fever"]))
            .await
            .unwrap();

        let err = runner
            .submit(&session.id, &submission("Alice", Some(34), &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::NoSymptomsSelected)
        ));

        let view = runner.view(&session.id).await.unwrap();
        assert_eq!(view.presentation().unwrap().disease_name, "FLU");
    }

    #[tokio::test]
    async fn test_reset_clears() {
        let runner = runner(false);
        let session = runner.start_session().await.unwrap();
        runner
            .submit(&session.id, &submission("", None, &["rash"]))
            .await
            .unwrap();

        let view = runner.reset(&session.id).await.unwrap();
        assert!(matches!(view, ResultView::Empty { .. }));
        assert!(matches!(
            runner.view(&session.id).await.unwrap(),
            ResultView::Empty { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let runner = runner(false);
        let err = runner.view("missing").await.unwrap_err();
        assert!(matches!(err, FlowError::SessionNotFound(ref id) if id == "missing"));
        assert!(runner.end_session("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_submit_after_delete_does_not_resurrect() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let pipeline = Arc::new(FeaturePipeline::new(tree_artifacts(), false));
        let runner = DiagnosisRunner::new(pipeline, storage.clone());
        let session = runner.start_session().await.unwrap();

        // A delete landing between the load and the write-back.
        let mut loaded = storage.get(&session.id).await.unwrap().unwrap();
        runner.end_session(&session.id).await.unwrap();
        loaded.state.set("FLU", "Alice");
        let err = runner.store(loaded).await.unwrap_err();

        assert!(matches!(err, FlowError::SessionNotFound(_)));
        assert_eq!(runner.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_idle_drops_only_stale_sessions() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let pipeline = Arc::new(FeaturePipeline::new(tree_artifacts(), false));
        let runner = DiagnosisRunner::new(pipeline, storage.clone());

        let active = runner.start_session().await.unwrap();
        let mut stale = Session::new("stale");
        stale.updated_at = chrono::Utc::now() - Duration::hours(2);
        storage.save(stale).await.unwrap();

        assert_eq!(runner.sweep_idle(Duration::hours(1)).await.unwrap(), 1);
        assert!(runner.view(&active.id).await.is_ok());
        assert!(runner.view("stale").await.is_err());
    }

    #[tokio::test]
    async fn test_end_session_removes_it() {
        let runner = runner(false);
        let session = runner.start_session().await.unwrap();
        runner.end_session(&session.id).await.unwrap();
        assert!(runner.view(&session.id).await.is_err());
    }
}
