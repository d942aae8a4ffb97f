use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::config::PipelineConfig;
use crate::workflows::hiring::domain::{
    AiAnalysis, AiSuggestion, ApplicantRecord, CandidateProfile, ExperienceEntry, InterviewRound,
    JobId, JobPosting, PortfolioProject, SkillValidation, Stage, UserId,
};
use crate::workflows::hiring::gateway::{
    AnalysisRequest, ComparisonAnalysis, ComparisonRequest, FeedbackRequest, GatewayError,
    HeuristicInsightGateway, InsightGateway,
};
use crate::workflows::hiring::memory::{InMemoryApplicantStore, InMemoryDirectory};
use crate::workflows::hiring::notifications::{DispatchError, MessageDraft, NotificationDispatcher};
use crate::workflows::hiring::repository::{
    ApplicantPatch, ApplicantRepository, RepositoryError,
};
use crate::workflows::hiring::service::HiringPipelineService;

pub(super) type TestService =
    HiringPipelineService<InMemoryApplicantStore, InMemoryDirectory, ScriptedGateway, MemoryDispatcher>;

pub(super) fn job_id() -> JobId {
    JobId::from("job-founding-eng")
}

pub(super) fn ursula() -> UserId {
    UserId::from("u-ursula")
}

pub(super) fn victor() -> UserId {
    UserId::from("u-victor")
}

pub(super) fn wendy() -> UserId {
    UserId::from("u-wendy")
}

pub(super) fn priya() -> UserId {
    UserId::from("u-priya")
}

pub(super) fn xavier() -> UserId {
    UserId::from("u-xavier")
}

pub(super) fn technical_interview() -> Stage {
    Stage::Interview("Technical Interview".to_string())
}

pub(super) fn founder_chat() -> Stage {
    Stage::Interview("Founder Chat".to_string())
}

pub(super) fn job() -> JobPosting {
    JobPosting {
        id: job_id(),
        title: "Founding Engineer".to_string(),
        company_name: "Acme Labs".to_string(),
        description: "Own the ledger platform end to end.".to_string(),
        required_skills: vec![
            "Rust".to_string(),
            "TypeScript".to_string(),
            "Postgres".to_string(),
        ],
        interview_rounds: vec![
            InterviewRound {
                name: "Technical Interview".to_string(),
                description: "Pair on a small service.".to_string(),
            },
            InterviewRound {
                name: "Founder Chat".to_string(),
                description: String::new(),
            },
        ],
    }
}

fn profile(user_id: UserId, name: &str, skills: &[&str]) -> CandidateProfile {
    CandidateProfile {
        user_id,
        name: name.to_string(),
        title: "Software Engineer".to_string(),
        email: None,
        phone: None,
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        experience: Vec::new(),
        portfolio: Vec::new(),
        vision: String::new(),
    }
}

pub(super) fn candidates() -> Vec<CandidateProfile> {
    let mut ursula = profile(ursula(), "Ursula Lin", &["Rust", "Postgres", "TypeScript"]);
    ursula.email = Some("ursula@example.com".to_string());
    ursula.phone = Some("+1 555 0100".to_string());
    ursula.portfolio = vec![
        PortfolioProject {
            name: "Budget CLI".to_string(),
            description: "Personal finance tool".to_string(),
            url: None,
            is_featured: false,
        },
        PortfolioProject {
            name: "Ledger Sync".to_string(),
            description: "Rust service syncing ledgers into Postgres".to_string(),
            url: Some("https://github.com/ursula/ledger-sync".to_string()),
            is_featured: true,
        },
    ];
    ursula.vision = "Build calm, reliable financial infrastructure.".to_string();

    let mut victor = profile(victor(), "Victor Hale", &["Go"]);
    victor.experience = vec![ExperienceEntry {
        role: "Backend Engineer".to_string(),
        company: "Flux".to_string(),
        description: "Operated Postgres replicas".to_string(),
    }];

    let mut wendy = profile(wendy(), "Wendy Park", &["typescript", "React"]);
    wendy.portfolio = vec![
        PortfolioProject {
            name: "Design System".to_string(),
            description: "Component library".to_string(),
            url: None,
            is_featured: false,
        },
        PortfolioProject {
            name: "Checkout".to_string(),
            description: "Payments UI".to_string(),
            url: None,
            is_featured: false,
        },
    ];
    wendy.vision = "x".repeat(200);

    let mut priya = profile(priya(), "Priya Nair", &["Rust", "TypeScript"]);
    priya.portfolio = vec![PortfolioProject {
        name: "Query Planner".to_string(),
        description: "Toy SQL planner".to_string(),
        url: None,
        is_featured: true,
    }];
    priya.vision = "Developer tools that teach.".to_string();

    let mut xavier = profile(xavier(), "Xavier Cole", &["Rust", "TypeScript", "Postgres"]);
    xavier.vision = "Small teams, sharp tools.".to_string();

    vec![ursula, victor, wendy, priya, xavier]
}

pub(super) fn directory() -> InMemoryDirectory {
    candidates()
        .into_iter()
        .fold(InMemoryDirectory::default().with_job(job()), |directory, candidate| {
            directory.with_candidate(candidate)
        })
}

pub(super) fn analysis(fit_score: u8, validated: &[&str], missing: &[&str]) -> AiAnalysis {
    let skill_validation = validated
        .iter()
        .map(|skill| SkillValidation {
            skill: skill.to_string(),
            has_evidence: true,
            evidence: format!("Shipped {skill} in production"),
        })
        .chain(missing.iter().map(|skill| SkillValidation {
            skill: skill.to_string(),
            has_evidence: false,
            evidence: String::new(),
        }))
        .collect();

    AiAnalysis {
        fit_score,
        summary: format!("Scored {fit_score}"),
        strengths: Vec::new(),
        weaknesses: Vec::new(),
        skill_validation,
        project_deep_dive: String::new(),
        culture_alignment: String::new(),
        interview_questions: Vec::new(),
        ai_suggestion: AiSuggestion::from_fit_score(fit_score),
    }
}

pub(super) fn record(user_id: UserId, stage: Stage) -> ApplicantRecord {
    ApplicantRecord::applied(job_id(), user_id).with_status(stage)
}

pub(super) fn scored(user_id: UserId, stage: Stage, fit_score: u8) -> ApplicantRecord {
    record(user_id, stage).with_analysis(analysis(fit_score, &["Rust"], &["Postgres"]))
}

/// Gateway that delegates to the heuristic implementation with injectable failures and gates.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    inner: HeuristicInsightGateway,
    failing_analysis: BTreeSet<UserId>,
    failing_feedback: BTreeSet<UserId>,
    analysis_gate: Option<Arc<Notify>>,
    feedback_gate: Option<Arc<Notify>>,
    fit_override: Option<u8>,
    analysis_calls: AtomicUsize,
    comparison_calls: AtomicUsize,
    feedback_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub(super) fn fail_analysis_for(mut self, user_id: UserId) -> Self {
        self.failing_analysis.insert(user_id);
        self
    }

    pub(super) fn fail_feedback_for(mut self, user_id: UserId) -> Self {
        self.failing_feedback.insert(user_id);
        self
    }

    pub(super) fn gate_analysis(mut self, gate: Arc<Notify>) -> Self {
        self.analysis_gate = Some(gate);
        self
    }

    pub(super) fn gate_feedback(mut self, gate: Arc<Notify>) -> Self {
        self.feedback_gate = Some(gate);
        self
    }

    pub(super) fn with_fit_score(mut self, fit_score: u8) -> Self {
        self.fit_override = Some(fit_score);
        self
    }

    pub(super) fn analysis_calls(&self) -> usize {
        self.analysis_calls.load(Ordering::SeqCst)
    }

    pub(super) fn comparison_calls(&self) -> usize {
        self.comparison_calls.load(Ordering::SeqCst)
    }

    pub(super) fn feedback_calls(&self) -> usize {
        self.feedback_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightGateway for ScriptedGateway {
    async fn analyze_applicant(
        &self,
        request: AnalysisRequest,
    ) -> Result<AiAnalysis, GatewayError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.analysis_gate {
            gate.notified().await;
        }
        if self.failing_analysis.contains(&request.applicant.user_id) {
            return Err(GatewayError::Transport("model timed out".to_string()));
        }
        let mut analysis = self.inner.analyze_applicant(request).await?;
        if let Some(fit_score) = self.fit_override {
            analysis.fit_score = fit_score;
            analysis.ai_suggestion = AiSuggestion::from_fit_score(fit_score);
        }
        Ok(analysis)
    }

    async fn compare_applicants(
        &self,
        request: ComparisonRequest,
    ) -> Result<ComparisonAnalysis, GatewayError> {
        self.comparison_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compare_applicants(request).await
    }

    async fn generate_rejection_feedback(
        &self,
        request: FeedbackRequest,
    ) -> Result<String, GatewayError> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.feedback_gate {
            gate.notified().await;
        }
        if self.failing_feedback.contains(&request.applicant.user_id) {
            return Err(GatewayError::Transport("feedback model unavailable".to_string()));
        }
        self.inner.generate_rejection_feedback(request).await
    }
}

#[derive(Default)]
pub(super) struct MemoryDispatcher {
    sent: Mutex<Vec<MessageDraft>>,
    unreachable: BTreeSet<UserId>,
}

impl MemoryDispatcher {
    pub(super) fn unreachable(user_id: UserId) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            unreachable: BTreeSet::from([user_id]),
        }
    }

    pub(super) fn sent(&self) -> Vec<MessageDraft> {
        self.sent.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn send(&self, message: MessageDraft) -> Result<(), DispatchError> {
        if self.unreachable.contains(&message.recipient) {
            return Err(DispatchError::Unreachable(message.recipient));
        }
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(message);
        Ok(())
    }
}

pub(super) struct UnavailableStore;

impl ApplicantRepository for UnavailableStore {
    fn insert(&self, _record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _job_id: &JobId,
        _user_id: &UserId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _job_id: &JobId) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _job_id: &JobId,
        _user_id: &UserId,
        _patch: &ApplicantPatch,
    ) -> Result<ApplicantRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) store: InMemoryApplicantStore,
    pub(super) gateway: Arc<ScriptedGateway>,
    pub(super) dispatcher: Arc<MemoryDispatcher>,
}

impl Harness {
    pub(super) fn stored(&self, user_id: &UserId) -> ApplicantRecord {
        self.store
            .fetch(&job_id(), user_id)
            .expect("fetch succeeds")
            .expect("record present")
    }
}

pub(super) fn harness_with(
    gateway: ScriptedGateway,
    dispatcher: MemoryDispatcher,
    config: PipelineConfig,
    records: Vec<ApplicantRecord>,
) -> Harness {
    let store = InMemoryApplicantStore::default();
    let gateway = Arc::new(gateway);
    let dispatcher = Arc::new(dispatcher);
    let service = Arc::new(HiringPipelineService::new(
        Arc::new(store.clone()),
        Arc::new(directory()),
        gateway.clone(),
        dispatcher.clone(),
        config,
    ));
    for record in records {
        service.admit_record(record).expect("seed record admitted");
    }
    Harness {
        service,
        store,
        gateway,
        dispatcher,
    }
}

pub(super) fn harness(records: Vec<ApplicantRecord>) -> Harness {
    harness_with(
        ScriptedGateway::default(),
        MemoryDispatcher::default(),
        PipelineConfig::default(),
        records,
    )
}

pub(super) fn unavailable_service(
) -> Arc<HiringPipelineService<UnavailableStore, InMemoryDirectory, ScriptedGateway, MemoryDispatcher>>
{
    Arc::new(HiringPipelineService::new(
        Arc::new(UnavailableStore),
        Arc::new(directory()),
        Arc::new(ScriptedGateway::default()),
        Arc::new(MemoryDispatcher::default()),
        PipelineConfig::default(),
    ))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn assert_error_response(response: Response, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("code").and_then(Value::as_str), Some(code));
}

pub(super) fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("build request")
}
