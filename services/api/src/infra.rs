use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::io;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use talent_ai::config::PipelineConfig;
use talent_ai::error::AppError;
use talent_ai::workflows::hiring::{
    ApplicantRecord, CandidateProfile, DispatchError, ExperienceEntry, ExportKind,
    HiringPipelineService, InMemoryApplicantStore, InMemoryDirectory, InsightGateway,
    InterviewRound, JobId, JobPosting, MessageDraft, NotificationDispatcher, PortfolioProject,
    Stage, UserId,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type HiringService<G> =
    HiringPipelineService<InMemoryApplicantStore, InMemoryDirectory, G, LoggingDispatcher>;

/// Logs every outbound message and keeps a copy for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingDispatcher {
    outbox: Arc<Mutex<Vec<MessageDraft>>>,
}

impl NotificationDispatcher for LoggingDispatcher {
    fn send(&self, message: MessageDraft) -> Result<(), DispatchError> {
        info!(
            job_id = %message.job_id,
            recipient = %message.recipient,
            subject = %message.subject,
            "message dispatched"
        );
        self.outbox
            .lock()
            .map_err(|_| DispatchError::Transport("outbox lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

impl LoggingDispatcher {
    pub(crate) fn sent(&self) -> Vec<MessageDraft> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

/// Jobs, candidate profiles and applicant records loaded into the in-memory stores.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SeedData {
    #[serde(default)]
    pub(crate) jobs: Vec<JobPosting>,
    #[serde(default)]
    pub(crate) candidates: Vec<CandidateProfile>,
    #[serde(default)]
    pub(crate) applicants: Vec<ApplicantRecord>,
}

impl SeedData {
    pub(crate) fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| {
            AppError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid seed file {}: {err}", path.display()),
            ))
        })
    }

    pub(crate) fn load_or_sample(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::sample()),
        }
    }

    /// One founding-engineer job with five applicants, one of them already shortlisted.
    pub(crate) fn sample() -> Self {
        let job = JobPosting {
            id: JobId::from(SAMPLE_JOB_ID),
            title: "Founding Engineer".to_string(),
            company_name: "Acme Labs".to_string(),
            description: "Own the ledger platform from storage to UI.".to_string(),
            required_skills: vec![
                "Rust".to_string(),
                "TypeScript".to_string(),
                "Postgres".to_string(),
            ],
            interview_rounds: vec![
                InterviewRound {
                    name: "Technical Interview".to_string(),
                    description: "Pair on a small service with two engineers.".to_string(),
                },
                InterviewRound {
                    name: "Founder Chat".to_string(),
                    description: String::new(),
                },
            ],
        };

        let candidates = vec![
            sample_candidate(
                "u-ada",
                "Ada Okafor",
                &["Rust", "TypeScript", "Postgres"],
                Some(("Ledger Sync", "Rust service replicating ledgers into Postgres", true)),
                "Calm, boring infrastructure that never loses a cent.",
            ),
            CandidateProfile {
                experience: vec![ExperienceEntry {
                    role: "Backend Engineer".to_string(),
                    company: "Flux".to_string(),
                    description: "Ran Postgres failover drills".to_string(),
                }],
                ..sample_candidate("u-ben", "Ben Ito", &["Go"], None, "")
            },
            sample_candidate(
                "u-chloe",
                "Chloe Martin",
                &["TypeScript", "React"],
                Some(("Design System", "Accessible component library", false)),
                "Interfaces that explain themselves.",
            ),
            sample_candidate(
                "u-dev",
                "Dev Patel",
                &["Rust", "TypeScript"],
                Some(("Query Planner", "Toy SQL planner", true)),
                "Developer tools that teach.",
            ),
            sample_candidate(
                "u-elena",
                "Elena Sousa",
                &["Rust", "Postgres", "TypeScript"],
                None,
                "Small teams with sharp tools.",
            ),
        ];

        let job_id = job.id.clone();
        let applicants = candidates
            .iter()
            .map(|candidate| {
                let record = ApplicantRecord::applied(job_id.clone(), candidate.user_id.clone());
                if candidate.user_id.0 == "u-dev" {
                    record.with_status(Stage::Shortlisted)
                } else {
                    record
                }
            })
            .collect();

        Self {
            jobs: vec![job],
            candidates,
            applicants,
        }
    }
}

pub(crate) const SAMPLE_JOB_ID: &str = "job-founding-eng";

fn sample_candidate(
    id: &str,
    name: &str,
    skills: &[&str],
    project: Option<(&str, &str, bool)>,
    vision: &str,
) -> CandidateProfile {
    CandidateProfile {
        user_id: UserId::from(id),
        name: name.to_string(),
        title: "Software Engineer".to_string(),
        email: Some(format!("{}@example.com", id.trim_start_matches("u-"))),
        phone: None,
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        experience: Vec::new(),
        portfolio: project
            .map(|(name, description, is_featured)| PortfolioProject {
                name: name.to_string(),
                description: description.to_string(),
                url: None,
                is_featured,
            })
            .into_iter()
            .collect(),
        vision: vision.to_string(),
    }
}

/// Wire the in-memory stores and admit the seeded applicants.
pub(crate) fn build_service<G>(
    seed: SeedData,
    gateway: Arc<G>,
    dispatcher: Arc<LoggingDispatcher>,
    config: PipelineConfig,
) -> Result<Arc<HiringService<G>>, AppError>
where
    G: InsightGateway + 'static,
{
    let directory = seed
        .jobs
        .into_iter()
        .fold(InMemoryDirectory::default(), |directory, job| {
            directory.with_job(job)
        });
    let directory = seed
        .candidates
        .into_iter()
        .fold(directory, |directory, candidate| {
            directory.with_candidate(candidate)
        });

    let service = HiringPipelineService::new(
        Arc::new(InMemoryApplicantStore::default()),
        Arc::new(directory),
        gateway,
        dispatcher,
        config,
    );
    for record in seed.applicants {
        service.admit_record(record)?;
    }
    Ok(Arc::new(service))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_export_kind(raw: &str) -> Result<ExportKind, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "quick" | "contacts" => Ok(ExportKind::Quick),
        "full" | "analysis" => Ok(ExportKind::Full),
        other => Err(format!("unknown export kind '{other}' (expected quick or full)")),
    }
}
