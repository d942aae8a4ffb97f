use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use talent_ai::config::PipelineConfig;
use talent_ai::workflows::hiring::{
    AiAnalysis, AnalysisMode, AnalysisRequest, ApplicantRepository, CandidateProfile,
    ComparisonAnalysis, ComparisonRequest, Confirmation, DispatchError, FeedbackRequest,
    FeedbackResolution, GatewayError, HeuristicInsightGateway, HiringPipelineService,
    InMemoryApplicantStore, InMemoryDirectory, InsightGateway, InterviewRound, JobId, JobPosting,
    MessageDraft, NotificationDispatcher, Stage, UserId,
};

/// Heuristic gateway whose feedback call fails for one applicant, as a dropped connection would.
struct FlakyFeedbackGateway {
    inner: HeuristicInsightGateway,
    offline_for: UserId,
}

#[async_trait]
impl InsightGateway for FlakyFeedbackGateway {
    async fn analyze_applicant(
        &self,
        request: AnalysisRequest,
    ) -> Result<AiAnalysis, GatewayError> {
        self.inner.analyze_applicant(request).await
    }

    async fn compare_applicants(
        &self,
        request: ComparisonRequest,
    ) -> Result<ComparisonAnalysis, GatewayError> {
        self.inner.compare_applicants(request).await
    }

    async fn generate_rejection_feedback(
        &self,
        request: FeedbackRequest,
    ) -> Result<String, GatewayError> {
        if request.applicant.user_id == self.offline_for {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        self.inner.generate_rejection_feedback(request).await
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<MessageDraft>>,
}

impl NotificationDispatcher for Outbox {
    fn send(&self, message: MessageDraft) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .map_err(|_| DispatchError::Transport("outbox poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

fn job() -> JobPosting {
    JobPosting {
        id: JobId::from("job-j"),
        title: "Platform Engineer".to_string(),
        company_name: "Northwind".to_string(),
        description: "Build the deployment platform.".to_string(),
        required_skills: vec!["Rust".to_string(), "Kubernetes".to_string()],
        interview_rounds: vec![
            InterviewRound {
                name: "Technical Interview".to_string(),
                description: String::new(),
            },
            InterviewRound {
                name: "Founder Chat".to_string(),
                description: String::new(),
            },
        ],
    }
}

fn candidate(id: &str, name: &str, skills: &[&str]) -> CandidateProfile {
    CandidateProfile {
        user_id: UserId::from(id),
        name: name.to_string(),
        title: "Engineer".to_string(),
        email: Some(format!("{id}@example.com")),
        phone: None,
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        experience: Vec::new(),
        portfolio: Vec::new(),
        vision: String::new(),
    }
}

#[tokio::test]
async fn shortlist_then_bulk_reject_with_one_feedback_outage() {
    let (u, v, w) = (UserId::from("u"), UserId::from("v"), UserId::from("w"));
    let directory = InMemoryDirectory::default()
        .with_job(job())
        .with_candidate(candidate("u", "Uma Reyes", &["Rust"]))
        .with_candidate(candidate("v", "Vik Osei", &["Go"]))
        .with_candidate(candidate("w", "Wes Tan", &["Kubernetes"]));
    let store = InMemoryApplicantStore::default();
    let outbox = Arc::new(Outbox::default());
    let service = HiringPipelineService::new(
        Arc::new(store.clone()),
        Arc::new(directory),
        Arc::new(FlakyFeedbackGateway {
            inner: HeuristicInsightGateway::new(),
            offline_for: v.clone(),
        }),
        outbox.clone(),
        PipelineConfig::default(),
    );
    let job_id = job().id;

    let pipeline = service.pipeline(&job_id).expect("pipeline resolves");
    assert_eq!(
        pipeline.labels(),
        vec!["Applied", "Shortlisted", "Technical Interview", "Founder Chat", "Hired"]
    );

    for user_id in [&u, &v, &w] {
        let record = service
            .register_applicant(&job_id, user_id)
            .expect("registration succeeds");
        assert_eq!(record.status, Stage::Applied);
    }

    let shortlisted = service
        .move_applicant(&job_id, &u, &Stage::Shortlisted, Confirmation::Unconfirmed)
        .expect("shortlist succeeds");
    assert_eq!(shortlisted.record.status, Stage::Shortlisted);
    assert!(shortlisted.record.has_been_reviewed);
    let draft = shortlisted.message.expect("shortlist message offered");
    assert!(draft.body.starts_with("Hi Uma,"));
    service.send_message(draft).expect("message sent");
    assert_eq!(outbox.sent.lock().expect("outbox").len(), 1);

    for user_id in [&u, &v, &w] {
        service
            .toggle_selection(&job_id, user_id)
            .expect("selection toggles");
    }
    let mut report = service
        .bulk_move_selected(&job_id, &Stage::Rejected, Confirmation::Confirmed)
        .expect("bulk rejection succeeds");
    assert_eq!(report.moved.len(), 3);
    assert!(service.selection(&job_id).expect("selection").is_empty());

    for user_id in [&u, &v, &w] {
        let record = store
            .fetch(&job_id, user_id)
            .expect("fetch succeeds")
            .expect("record present");
        assert_eq!(record.status, Stage::Rejected);
    }

    let resolutions = report.settle_feedback().await;
    assert_eq!(resolutions.len(), 3);
    for (user_id, resolution) in &resolutions {
        if user_id == &v {
            assert!(matches!(resolution, FeedbackResolution::Failed { .. }));
        } else {
            assert_eq!(resolution, &FeedbackResolution::Stored);
        }
    }

    let records = service.list(&job_id).expect("list succeeds");
    for record in &records {
        assert_eq!(record.status, Stage::Rejected);
        assert!(!record.feedback_pending());
        if record.user_id == v {
            assert_eq!(record.ai_reasoning, None);
        } else {
            assert!(record.ai_reasoning.is_some());
        }
    }

    let board = service.board(&job_id).expect("board renders");
    let rejected = board
        .columns
        .iter()
        .find(|column| column.stage == Stage::Rejected)
        .expect("rejected column");
    assert!(rejected.terminal);
    assert_eq!(rejected.total, 3);
    assert_eq!(rejected.unreviewed, 0);
}

#[tokio::test]
async fn analysis_drives_column_filters_and_exports() {
    let directory = InMemoryDirectory::default()
        .with_job(job())
        .with_candidate(candidate("u", "Uma Reyes", &["Rust", "Kubernetes"]))
        .with_candidate(candidate("v", "Vik Osei", &["Go"]));
    let service = HiringPipelineService::new(
        Arc::new(InMemoryApplicantStore::default()),
        Arc::new(directory),
        Arc::new(HeuristicInsightGateway::new()),
        Arc::new(Outbox::default()),
        PipelineConfig::default(),
    );
    let job_id = job().id;
    let (u, v) = (UserId::from("u"), UserId::from("v"));
    service.register_applicant(&job_id, &u).expect("register u");
    service.register_applicant(&job_id, &v).expect("register v");

    let analyzed = service
        .analyze_applicant(&job_id, &u, AnalysisMode::UseCache)
        .await
        .expect("analysis succeeds");
    assert_eq!(analyzed.fit_score(), Some(80));
    assert_eq!(analyzed.rating, 4);

    service
        .set_filter(
            &job_id,
            &Stage::Applied,
            talent_ai::workflows::hiring::ColumnFilter {
                min_score: None,
                required_skills: vec!["kubernetes".to_string()],
            },
        )
        .expect("filter accepted");
    let column = service
        .column(&job_id, &Stage::Applied)
        .expect("column renders");
    assert_eq!(column.total, 2);
    assert_eq!(column.applicants.len(), 1);
    assert_eq!(column.applicants[0].user_id, u);

    let document = service
        .export_applicants(&job_id, &[], talent_ai::workflows::hiring::ExportKind::Full)
        .await
        .expect("export succeeds");
    assert_eq!(document.rows, 2);
    assert_eq!(document.file_name, "Platform_Engineer_AI_Analysis.csv");
    assert!(document.body.contains("\"Uma Reyes\""));
    assert!(document.body.contains("\"2/2\""));
}
