use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::columns::{board_view, ColumnBoard, ColumnFilter, ColumnState, ColumnView, SortOrder};
use super::domain::{
    ApplicantRecord, CandidateProfile, JobId, JobPosting, RequestId, ScheduledInterview, Stage,
    UserId,
};
use super::export::{
    export_file_name, write_full_export, write_quick_export, ExportError, ExportKind, ExportRow,
    QuickExportRow,
};
use super::gateway::{
    AnalysisRequest, ApplicantBrief, ComparisonAnalysis, ComparisonCandidate, ComparisonRequest,
    FeedbackRequest, GatewayError, InsightGateway, JobBrief, FALLBACK_REJECTION_FEEDBACK,
    MAX_COMPARISON_CANDIDATES, MAX_FEEDBACK_PEERS, MIN_COMPARISON_CANDIDATES,
};
use super::notifications::{
    template_for, BroadcastReport, DeliveryFailure, DispatchError, MessageDraft, MessageTemplate,
    NotificationDispatcher,
};
use super::pipeline::Pipeline;
use super::repository::{
    ApplicantPatch, ApplicantRepository, PatchPrecondition, RepositoryError, TalentDirectory,
};
use super::selection::{SelectAllOutcome, SelectionSet};
use super::transitions::{
    can_transition, check_target, plan_move, transition_patch, BulkMoveReport, Confirmation,
    FeedbackResolution, FeedbackTicket, MoveOutcome, SkippedMove, TransitionError,
};
use crate::config::PipelineConfig;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    RequestId(REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Whether an analysis call may reuse the cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    #[default]
    UseCache,
    Refresh,
}

impl From<bool> for AnalysisMode {
    fn from(force: bool) -> Self {
        if force {
            AnalysisMode::Refresh
        } else {
            AnalysisMode::UseCache
        }
    }
}

/// Drag-and-drop command emitted by the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPayload {
    pub applicant_id: UserId,
    pub job_id: JobId,
    pub target_stage: Stage,
}

/// View state the service keeps per job between requests.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    pub board: ColumnBoard,
    pub selection: SelectionSet,
}

impl JobWorkspace {
    fn new(job_id: JobId) -> Self {
        Self {
            board: ColumnBoard::new(),
            selection: SelectionSet::new(job_id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub job_id: JobId,
    pub title: String,
    pub pipeline: Vec<Stage>,
    pub columns: Vec<ColumnView>,
    pub selected: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisFailure {
    pub user_id: UserId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    pub comparison: ComparisonAnalysis,
    /// Candidates compared without an analysis because fetching one failed.
    pub failed_analyses: Vec<AnalysisFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    pub kind: ExportKind,
    pub file_name: String,
    pub rows: usize,
    pub body: String,
    pub failed_analyses: Vec<AnalysisFailure>,
}

/// Hiring pipeline engine: applicant records, transitions and their side effects, AI enrichment,
/// messaging and the per-job board state.
pub struct HiringPipelineService<R, D, G, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    gateway: Arc<G>,
    dispatcher: Arc<N>,
    config: PipelineConfig,
    workspaces: Mutex<HashMap<JobId, JobWorkspace>>,
}

impl<R, D, G, N> HiringPipelineService<R, D, G, N>
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        gateway: Arc<G>,
        dispatcher: Arc<N>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repository,
            directory,
            gateway,
            dispatcher,
            config,
            workspaces: Mutex::new(HashMap::new()),
        }
    }

    fn job(&self, job_id: &JobId) -> Result<JobPosting, PipelineError> {
        self.directory
            .job(job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.clone()))
    }

    fn candidate(&self, user_id: &UserId) -> Result<CandidateProfile, PipelineError> {
        self.directory
            .candidate(user_id)?
            .ok_or_else(|| PipelineError::CandidateNotFound(user_id.clone()))
    }

    fn record(&self, job_id: &JobId, user_id: &UserId) -> Result<ApplicantRecord, PipelineError> {
        self.repository
            .fetch(job_id, user_id)?
            .ok_or_else(|| PipelineError::ApplicantNotFound {
                job_id: job_id.clone(),
                user_id: user_id.clone(),
            })
    }

    fn write(
        &self,
        job_id: &JobId,
        user_id: &UserId,
        patch: &ApplicantPatch,
    ) -> Result<ApplicantRecord, PipelineError> {
        self.repository
            .update(job_id, user_id, patch)
            .map_err(|error| match error {
                RepositoryError::NotFound => PipelineError::ApplicantNotFound {
                    job_id: job_id.clone(),
                    user_id: user_id.clone(),
                },
                RepositoryError::Stale(_) => PipelineError::ConcurrentTransition(user_id.clone()),
                other => other.into(),
            })
    }

    fn with_workspace<T>(
        &self,
        job_id: &JobId,
        apply: impl FnOnce(&mut JobWorkspace) -> T,
    ) -> Result<T, PipelineError> {
        let mut workspaces = self
            .workspaces
            .lock()
            .map_err(|_| RepositoryError::Unavailable("workspace lock poisoned".to_string()))?;
        let workspace = workspaces
            .entry(job_id.clone())
            .or_insert_with(|| JobWorkspace::new(job_id.clone()));
        Ok(apply(workspace))
    }

    /// Create the `Applied` record for a candidate applying to a job.
    pub fn register_applicant(
        &self,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<ApplicantRecord, PipelineError> {
        self.job(job_id)?;
        self.candidate(user_id)?;

        let record = ApplicantRecord::applied(job_id.clone(), user_id.clone());
        let stored = self.repository.insert(record).map_err(|error| match error {
            RepositoryError::Conflict => PipelineError::AlreadyApplied(user_id.clone()),
            other => other.into(),
        })?;
        info!(job_id = %job_id, user_id = %user_id, "applicant registered");
        Ok(stored)
    }

    /// Insert a pre-built record. A status outside the job's pipeline is refused, never repaired.
    pub fn admit_record(
        &self,
        mut record: ApplicantRecord,
    ) -> Result<ApplicantRecord, PipelineError> {
        let job = self.job(&record.job_id)?;
        let pipeline = Pipeline::resolve(&job);
        if !pipeline.accepts(&record.status) {
            return Err(TransitionError::UnknownStage(record.status.clone()).into());
        }
        if record.rating > 5 {
            return Err(PipelineError::InvalidRating(record.rating));
        }
        if let Some(fit_score) = record.fit_score().filter(|score| *score > 100) {
            return Err(PipelineError::InvalidRecord(format!(
                "fit score {fit_score} is outside 0-100"
            )));
        }
        self.candidate(&record.user_id)?;
        record.pending_analysis = None;
        record.pending_feedback = None;

        let user_id = record.user_id.clone();
        let stored = self.repository.insert(record).map_err(|error| match error {
            RepositoryError::Conflict => PipelineError::AlreadyApplied(user_id.clone()),
            other => other.into(),
        })?;
        debug!(job_id = %stored.job_id, user_id = %stored.user_id, stage = %stored.status, "record admitted");
        Ok(stored)
    }

    pub fn get(&self, job_id: &JobId, user_id: &UserId) -> Result<ApplicantRecord, PipelineError> {
        self.job(job_id)?;
        self.record(job_id, user_id)
    }

    pub fn list(&self, job_id: &JobId) -> Result<Vec<ApplicantRecord>, PipelineError> {
        self.job(job_id)?;
        Ok(self.repository.list(job_id)?)
    }

    pub fn pipeline(&self, job_id: &JobId) -> Result<Pipeline, PipelineError> {
        Ok(Pipeline::resolve(&self.job(job_id)?))
    }

    /// Move one applicant. Rejection needs `Confirmation::Confirmed`, commits immediately and
    /// fires feedback generation in the background; other moves offer a message draft.
    pub fn move_applicant(
        &self,
        job_id: &JobId,
        user_id: &UserId,
        target: &Stage,
        confirmation: Confirmation,
    ) -> Result<MoveOutcome, PipelineError> {
        let job = self.job(job_id)?;
        let pipeline = Pipeline::resolve(&job);
        let record = self.record(job_id, user_id)?;

        if !plan_move(&pipeline, &record, target, confirmation)? {
            debug!(job_id = %job_id, user_id = %user_id, stage = %target, "move is a no-op");
            return Ok(MoveOutcome::unchanged(record));
        }

        let feedback = if target.is_rejected() {
            let runtime = Handle::try_current().map_err(|_| PipelineError::RuntimeUnavailable)?;
            let peers = self.feedback_peers(&job, std::slice::from_ref(user_id))?;
            Some((runtime, peers))
        } else {
            None
        };

        self.commit_move(&job, record, target, feedback.as_ref())
    }

    pub fn drop_applicant(
        &self,
        payload: &DropPayload,
        confirmation: Confirmation,
    ) -> Result<MoveOutcome, PipelineError> {
        self.move_applicant(
            &payload.job_id,
            &payload.applicant_id,
            &payload.target_stage,
            confirmation,
        )
    }

    /// Apply one move to every listed applicant. Unknown ids and a missing confirmation abort
    /// the batch before anything is written; per-applicant failures after that are reported.
    pub fn bulk_move_applicants(
        &self,
        job_id: &JobId,
        user_ids: &[UserId],
        target: &Stage,
        confirmation: Confirmation,
    ) -> Result<BulkMoveReport, PipelineError> {
        let job = self.job(job_id)?;
        let pipeline = Pipeline::resolve(&job);
        check_target(&pipeline, target, confirmation)?;

        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if seen.insert(user_id) {
                records.push(self.record(job_id, user_id)?);
            }
        }

        let feedback = if target.is_rejected() {
            let runtime = Handle::try_current().map_err(|_| PipelineError::RuntimeUnavailable)?;
            let batch: Vec<UserId> = records.iter().map(|r| r.user_id.clone()).collect();
            Some((runtime, self.feedback_peers(&job, &batch)?))
        } else {
            None
        };

        let mut report = BulkMoveReport::new(target.clone());
        for record in records {
            let user_id = record.user_id.clone();
            if !can_transition(&pipeline, &record, target) {
                report.unchanged.push(user_id);
                continue;
            }
            match self.commit_move(&job, record, target, feedback.as_ref()) {
                Ok(outcome) => report.moved.push(outcome),
                Err(error) => {
                    warn!(job_id = %job_id, user_id = %user_id, %error, "bulk move skipped applicant");
                    report.skipped.push(SkippedMove {
                        user_id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            job_id = %job_id,
            stage = %target,
            moved = report.moved.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped.len(),
            "bulk move committed"
        );
        Ok(report)
    }

    /// Bulk move the job's current selection, then clear it.
    pub fn bulk_move_selected(
        &self,
        job_id: &JobId,
        target: &Stage,
        confirmation: Confirmation,
    ) -> Result<BulkMoveReport, PipelineError> {
        self.job(job_id)?;
        let selected = self.with_workspace(job_id, |workspace| workspace.selection.selected())?;
        let report = self.bulk_move_applicants(job_id, &selected, target, confirmation)?;
        self.with_workspace(job_id, |workspace| workspace.selection.clear())?;
        Ok(report)
    }

    fn commit_move(
        &self,
        job: &JobPosting,
        record: ApplicantRecord,
        target: &Stage,
        feedback: Option<&(Handle, Vec<ApplicantBrief>)>,
    ) -> Result<MoveOutcome, PipelineError> {
        let request = feedback.map(|_| next_request_id());
        let patch = transition_patch(job, &record, target, request);
        let updated = self.write(&job.id, &record.user_id, &patch)?;
        info!(
            job_id = %job.id,
            user_id = %updated.user_id,
            from = %record.status,
            to = %updated.status,
            "applicant moved"
        );

        let ticket = match (feedback, request) {
            (Some((runtime, peers)), Some(request)) => {
                Some(self.spawn_feedback(runtime, job, &updated.user_id, request, peers.clone()))
            }
            _ => None,
        };
        let message = if target.is_rejected() {
            None
        } else {
            self.offer_message(job, &updated)
        };

        Ok(MoveOutcome {
            record: updated,
            previous: record.status,
            message,
            feedback: ticket,
        })
    }

    fn offer_message(&self, job: &JobPosting, record: &ApplicantRecord) -> Option<MessageDraft> {
        let template = template_for(job, &record.status)?;
        match self.directory.candidate(&record.user_id) {
            Ok(Some(candidate)) => Some(MessageDraft::from_template(
                job,
                &candidate,
                Some(record.status.clone()),
                &template,
                &self.config.recruiter_name,
            )),
            Ok(None) => {
                warn!(user_id = %record.user_id, "no profile to address the stage message to");
                None
            }
            Err(error) => {
                warn!(user_id = %record.user_id, %error, "profile lookup failed for stage message");
                None
            }
        }
    }

    /// Up to three shortlisted or hired applicants, outside `exclude`, for comparative feedback.
    fn feedback_peers(
        &self,
        job: &JobPosting,
        exclude: &[UserId],
    ) -> Result<Vec<ApplicantBrief>, PipelineError> {
        let excluded: BTreeSet<&UserId> = exclude.iter().collect();
        let mut peers = Vec::new();
        for record in self.repository.list(&job.id)? {
            if peers.len() == MAX_FEEDBACK_PEERS {
                break;
            }
            if excluded.contains(&record.user_id)
                || !matches!(record.status, Stage::Shortlisted | Stage::Hired)
            {
                continue;
            }
            if let Some(candidate) = self.directory.candidate(&record.user_id)? {
                peers.push(ApplicantBrief::from_profile(&candidate));
            }
        }
        Ok(peers)
    }

    fn spawn_feedback(
        &self,
        runtime: &Handle,
        job: &JobPosting,
        user_id: &UserId,
        request: RequestId,
        peers: Vec<ApplicantBrief>,
    ) -> FeedbackTicket {
        let payload = match self.directory.candidate(user_id) {
            Ok(Some(candidate)) => Ok(FeedbackRequest {
                job: JobBrief::from_job(job),
                applicant: ApplicantBrief::from_profile(&candidate),
                peers,
            }),
            Ok(None) => Err(format!("no profile for candidate {user_id}")),
            Err(error) => Err(error.to_string()),
        };

        let repository = Arc::clone(&self.repository);
        let gateway = Arc::clone(&self.gateway);
        let fallback = self.config.rejection_fallback;
        let job_id = job.id.clone();
        let owner = user_id.clone();
        debug!(job_id = %job_id, user_id = %owner, request_id = %request, "rejection feedback requested");

        let handle = runtime.spawn(async move {
            let outcome = match payload {
                Ok(payload) => gateway
                    .generate_rejection_feedback(payload)
                    .await
                    .map_err(|error| error.to_string()),
                Err(reason) => Err(reason),
            };
            settle_feedback(repository.as_ref(), &job_id, &owner, request, outcome, fallback)
        });

        FeedbackTicket::new(request, user_id.clone(), handle)
    }

    pub fn rate_applicant(
        &self,
        job_id: &JobId,
        user_id: &UserId,
        rating: u8,
    ) -> Result<ApplicantRecord, PipelineError> {
        if !(1..=5).contains(&rating) {
            return Err(PipelineError::InvalidRating(rating));
        }
        self.job(job_id)?;
        let updated = self.write(job_id, user_id, &ApplicantPatch::new().rating(rating).reviewed())?;
        info!(job_id = %job_id, user_id = %user_id, rating, "applicant rated");
        Ok(updated)
    }

    pub fn mark_reviewed(
        &self,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<ApplicantRecord, PipelineError> {
        self.job(job_id)?;
        self.write(job_id, user_id, &ApplicantPatch::new().reviewed())
    }

    /// Attach or replace an interview slot. Rejected applicants cannot be scheduled.
    pub fn schedule_interview(
        &self,
        job_id: &JobId,
        user_id: &UserId,
        interview: ScheduledInterview,
    ) -> Result<ApplicantRecord, PipelineError> {
        self.job(job_id)?;
        let record = self.record(job_id, user_id)?;
        if record.status.is_rejected() {
            return Err(PipelineError::InvalidSchedule(
                "rejected applicants cannot be scheduled".to_string(),
            ));
        }
        if interview.interviewer_ids.is_empty() {
            return Err(PipelineError::InvalidSchedule(
                "at least one interviewer is required".to_string(),
            ));
        }

        let patch = ApplicantPatch::new()
            .expect(PatchPrecondition::Status(record.status.clone()))
            .schedule(Some(interview))
            .reviewed();
        let updated = self.write(job_id, user_id, &patch)?;
        info!(job_id = %job_id, user_id = %user_id, stage = %updated.status, "interview scheduled");
        Ok(updated)
    }

    /// Run or reuse the fit analysis. Failures leave the cached analysis untouched.
    pub async fn analyze_applicant(
        &self,
        job_id: &JobId,
        user_id: &UserId,
        mode: AnalysisMode,
    ) -> Result<ApplicantRecord, PipelineError> {
        let job = self.job(job_id)?;
        let record = self.record(job_id, user_id)?;
        if mode == AnalysisMode::UseCache {
            if record.ai_analysis.is_some() {
                return Ok(record);
            }
            if record.analysis_pending() {
                return Err(PipelineError::AnalysisInFlight(user_id.clone()));
            }
        }
        let candidate = self.candidate(user_id)?;

        let request_id = next_request_id();
        let mut marker = ApplicantPatch::new().pending_analysis(Some(request_id));
        if mode == AnalysisMode::UseCache {
            marker = marker.expect(PatchPrecondition::NoPendingAnalysis);
        }
        match self.repository.update(job_id, user_id, &marker) {
            Ok(_) => {}
            Err(RepositoryError::Stale(_)) => {
                return Err(PipelineError::AnalysisInFlight(user_id.clone()))
            }
            Err(RepositoryError::NotFound) => {
                return Err(PipelineError::ApplicantNotFound {
                    job_id: job_id.clone(),
                    user_id: user_id.clone(),
                })
            }
            Err(other) => return Err(other.into()),
        }
        info!(job_id = %job_id, user_id = %user_id, request_id = %request_id, "analysis requested");

        let request = AnalysisRequest {
            job: JobBrief::from_job(&job),
            applicant: ApplicantBrief::from_profile(&candidate),
        };
        let outcome = self
            .gateway
            .analyze_applicant(request)
            .await
            .and_then(|analysis| {
                if analysis.fit_score > 100 {
                    Err(GatewayError::Malformed(format!(
                        "fit score {} is outside 0-100",
                        analysis.fit_score
                    )))
                } else {
                    Ok(analysis)
                }
            });

        match outcome {
            Ok(analysis) => {
                let fit_score = analysis.fit_score;
                let patch = ApplicantPatch::new()
                    .expect(PatchPrecondition::PendingAnalysis(request_id))
                    .rating(analysis.suggested_rating())
                    .suggestion(analysis.ai_suggestion)
                    .analysis(analysis)
                    .pending_analysis(None);
                match self.repository.update(job_id, user_id, &patch) {
                    Ok(updated) => {
                        info!(job_id = %job_id, user_id = %user_id, request_id = %request_id, fit_score, "analysis merged");
                        Ok(updated)
                    }
                    Err(RepositoryError::Stale(_)) => {
                        debug!(job_id = %job_id, user_id = %user_id, request_id = %request_id, "stale analysis discarded");
                        Err(PipelineError::Superseded(request_id))
                    }
                    Err(RepositoryError::NotFound) => Err(PipelineError::ApplicantNotFound {
                        job_id: job_id.clone(),
                        user_id: user_id.clone(),
                    }),
                    Err(other) => Err(other.into()),
                }
            }
            Err(error) => {
                warn!(job_id = %job_id, user_id = %user_id, request_id = %request_id, %error, "analysis failed");
                let release = ApplicantPatch::new()
                    .expect(PatchPrecondition::PendingAnalysis(request_id))
                    .pending_analysis(None);
                if let Err(release_error) = self.repository.update(job_id, user_id, &release) {
                    debug!(request_id = %request_id, %release_error, "analysis marker already released");
                }
                Err(error.into())
            }
        }
    }

    /// Drop interest in an in-flight analysis; its result is discarded when it arrives.
    pub fn abandon_analysis(
        &self,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<ApplicantRecord, PipelineError> {
        self.job(job_id)?;
        let updated = self.write(job_id, user_id, &ApplicantPatch::new().pending_analysis(None))?;
        debug!(job_id = %job_id, user_id = %user_id, "analysis abandoned");
        Ok(updated)
    }

    /// Analyze the records lacking a cached analysis concurrently; failures are returned, not raised.
    async fn fill_missing_analyses(
        &self,
        job_id: &JobId,
        records: &[ApplicantRecord],
    ) -> Vec<AnalysisFailure> {
        let missing: Vec<&UserId> = records
            .iter()
            .filter(|record| record.ai_analysis.is_none())
            .map(|record| &record.user_id)
            .collect();
        let results = join_all(
            missing
                .iter()
                .map(|user_id| self.analyze_applicant(job_id, user_id, AnalysisMode::UseCache)),
        )
        .await;

        missing
            .into_iter()
            .zip(results)
            .filter_map(|(user_id, result)| {
                result.err().map(|error| AnalysisFailure {
                    user_id: user_id.clone(),
                    reason: error.to_string(),
                })
            })
            .collect()
    }

    pub async fn compare_applicants(
        &self,
        job_id: &JobId,
        user_ids: &[UserId],
    ) -> Result<ComparisonReport, PipelineError> {
        let mut unique: Vec<UserId> = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if !unique.contains(user_id) {
                unique.push(user_id.clone());
            }
        }
        if !(MIN_COMPARISON_CANDIDATES..=MAX_COMPARISON_CANDIDATES).contains(&unique.len()) {
            return Err(PipelineError::ComparisonSize {
                min: MIN_COMPARISON_CANDIDATES,
                max: MAX_COMPARISON_CANDIDATES,
                actual: unique.len(),
            });
        }

        let job = self.job(job_id)?;
        let mut records = Vec::with_capacity(unique.len());
        let mut profiles = Vec::with_capacity(unique.len());
        for user_id in &unique {
            records.push(self.record(job_id, user_id)?);
            profiles.push(self.candidate(user_id)?);
        }

        let failed_analyses = self.fill_missing_analyses(job_id, &records).await;
        let mut candidates = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            let record = self.record(job_id, &profile.user_id)?;
            candidates.push(ComparisonCandidate {
                applicant: ApplicantBrief::from_profile(profile),
                analysis: record.ai_analysis,
            });
        }

        let comparison = self
            .gateway
            .compare_applicants(ComparisonRequest {
                job: JobBrief::from_job(&job),
                candidates,
            })
            .await?
            .validate(&unique)?;
        info!(
            job_id = %job_id,
            candidates = unique.len(),
            recommended = %comparison.recommendation.user_id,
            "comparison completed"
        );

        Ok(ComparisonReport {
            comparison,
            failed_analyses,
        })
    }

    /// Export the listed applicants, or every applicant of the job when `user_ids` is empty.
    pub async fn export_applicants(
        &self,
        job_id: &JobId,
        user_ids: &[UserId],
        kind: ExportKind,
    ) -> Result<ExportDocument, PipelineError> {
        let job = self.job(job_id)?;
        let mut records = if user_ids.is_empty() {
            self.repository.list(job_id)?
        } else {
            let mut seen = BTreeSet::new();
            user_ids
                .iter()
                .filter(|user_id| seen.insert(*user_id))
                .map(|user_id| self.record(job_id, user_id))
                .collect::<Result<Vec<_>, _>>()?
        };
        let base_url = self.config.public_base_url.as_str();

        let (body, rows, failed_analyses) = match kind {
            ExportKind::Quick => {
                let rows = records
                    .iter()
                    .map(|record| {
                        self.candidate(&record.user_id)
                            .map(|candidate| QuickExportRow::new(&candidate, base_url))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (write_quick_export(&rows)?, rows.len(), Vec::new())
            }
            ExportKind::Full => {
                let failed = self.fill_missing_analyses(job_id, &records).await;
                for failure in &failed {
                    warn!(job_id = %job_id, user_id = %failure.user_id, reason = %failure.reason, "exporting without analysis");
                }
                for record in records.iter_mut() {
                    *record = self.record(job_id, &record.user_id)?;
                }
                let rows = records
                    .iter()
                    .map(|record| {
                        self.candidate(&record.user_id)
                            .map(|candidate| ExportRow::new(&candidate, record, base_url))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (write_full_export(&rows)?, rows.len(), failed)
            }
        };

        info!(job_id = %job_id, rows, ?kind, "applicants exported");
        Ok(ExportDocument {
            kind,
            file_name: export_file_name(&job, kind),
            rows,
            body,
            failed_analyses,
        })
    }

    /// Deliver a draft, typically the one offered by a move.
    pub fn send_message(&self, draft: MessageDraft) -> Result<(), PipelineError> {
        if draft.is_blank() {
            return Err(PipelineError::EmptyMessage);
        }
        self.job(&draft.job_id)?;
        self.record(&draft.job_id, &draft.recipient)?;

        let job_id = draft.job_id.clone();
        let recipient = draft.recipient.clone();
        self.dispatcher.send(draft)?;
        info!(job_id = %job_id, user_id = %recipient, "message sent");
        Ok(())
    }

    /// Personalize one free-form template for each applicant and send it.
    pub fn broadcast_message(
        &self,
        job_id: &JobId,
        user_ids: &[UserId],
        subject: &str,
        body: &str,
    ) -> Result<BroadcastReport, PipelineError> {
        if body.trim().is_empty() {
            return Err(PipelineError::EmptyMessage);
        }
        let job = self.job(job_id)?;
        let template = MessageTemplate::new(subject, body);

        let mut report = BroadcastReport {
            sent: Vec::new(),
            failed: Vec::new(),
        };
        for user_id in user_ids {
            let delivery = self
                .record(job_id, user_id)
                .and_then(|_| self.candidate(user_id))
                .and_then(|candidate| {
                    let draft = MessageDraft::from_template(
                        &job,
                        &candidate,
                        None,
                        &template,
                        &self.config.recruiter_name,
                    );
                    self.dispatcher.send(draft).map_err(PipelineError::from)
                });
            match delivery {
                Ok(()) => report.sent.push(user_id.clone()),
                Err(error) => {
                    warn!(job_id = %job_id, user_id = %user_id, %error, "broadcast delivery failed");
                    report.failed.push(DeliveryFailure {
                        user_id: user_id.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            job_id = %job_id,
            sent = report.sent.len(),
            failed = report.failed.len(),
            "broadcast finished"
        );
        Ok(report)
    }

    fn column_stage(&self, job_id: &JobId, stage: &Stage) -> Result<Pipeline, PipelineError> {
        let pipeline = self.pipeline(job_id)?;
        if !pipeline.accepts(stage) {
            return Err(TransitionError::UnknownStage(stage.clone()).into());
        }
        Ok(pipeline)
    }

    pub fn board(&self, job_id: &JobId) -> Result<BoardView, PipelineError> {
        let job = self.job(job_id)?;
        let pipeline = Pipeline::resolve(&job);
        let records = self.repository.list(job_id)?;
        let (columns, selected) = self.with_workspace(job_id, |workspace| {
            (
                board_view(&pipeline, &records, &workspace.board, &workspace.selection),
                workspace.selection.selected(),
            )
        })?;

        Ok(BoardView {
            job_id: job.id,
            title: job.title,
            pipeline: pipeline.stages,
            columns,
            selected,
        })
    }

    pub fn column(&self, job_id: &JobId, stage: &Stage) -> Result<ColumnView, PipelineError> {
        let pipeline = self.column_stage(job_id, stage)?;
        let records = self.repository.list(job_id)?;
        let terminal = pipeline.terminal.contains(stage);
        self.with_workspace(job_id, |workspace| {
            ColumnView::build(
                &records,
                stage,
                terminal,
                &workspace.board.state(stage),
                &workspace.selection,
            )
        })
    }

    pub fn toggle_sort(&self, job_id: &JobId, stage: &Stage) -> Result<SortOrder, PipelineError> {
        self.column_stage(job_id, stage)?;
        self.with_workspace(job_id, |workspace| workspace.board.toggle_sort(stage))
    }

    pub fn set_filter(
        &self,
        job_id: &JobId,
        stage: &Stage,
        filter: ColumnFilter,
    ) -> Result<ColumnState, PipelineError> {
        self.column_stage(job_id, stage)?;
        if let Some(min_score) = filter.min_score.filter(|score| *score > 100) {
            return Err(PipelineError::InvalidFilter(format!(
                "minimum score {min_score} is outside 0-100"
            )));
        }

        let mut required_skills: Vec<String> = Vec::new();
        for skill in filter.required_skills {
            let skill = skill.trim();
            if !skill.is_empty()
                && !required_skills
                    .iter()
                    .any(|existing| existing.eq_ignore_ascii_case(skill))
            {
                required_skills.push(skill.to_string());
            }
        }
        let filter = ColumnFilter {
            // A zero threshold admits everyone, unscored applicants included.
            min_score: filter.min_score.filter(|score| *score > 0),
            required_skills,
        };

        self.with_workspace(job_id, |workspace| {
            workspace.board.set_filter(stage, filter);
            workspace.board.state(stage)
        })
    }

    pub fn clear_filter(&self, job_id: &JobId, stage: &Stage) -> Result<ColumnState, PipelineError> {
        self.column_stage(job_id, stage)?;
        self.with_workspace(job_id, |workspace| {
            workspace.board.clear_filter(stage);
            workspace.board.state(stage)
        })
    }

    /// Flip one applicant in the job's selection; returns whether it is now selected.
    pub fn toggle_selection(&self, job_id: &JobId, user_id: &UserId) -> Result<bool, PipelineError> {
        self.job(job_id)?;
        self.record(job_id, user_id)?;
        self.with_workspace(job_id, |workspace| workspace.selection.toggle(user_id))
    }

    /// Select-all scoped to the applicants currently visible in one column.
    pub fn select_all(
        &self,
        job_id: &JobId,
        stage: &Stage,
    ) -> Result<SelectAllOutcome, PipelineError> {
        let column = self.column(job_id, stage)?;
        let visible: Vec<UserId> = column
            .applicants
            .into_iter()
            .map(|card| card.user_id)
            .collect();
        self.with_workspace(job_id, |workspace| workspace.selection.select_all(&visible))
    }

    pub fn clear_selection(&self, job_id: &JobId) -> Result<(), PipelineError> {
        self.job(job_id)?;
        self.with_workspace(job_id, |workspace| workspace.selection.clear())
    }

    pub fn selection(&self, job_id: &JobId) -> Result<Vec<UserId>, PipelineError> {
        self.job(job_id)?;
        self.with_workspace(job_id, |workspace| workspace.selection.selected())
    }
}

/// Merge a finished feedback call into the record unless the rejection it belongs to is gone.
fn settle_feedback<R>(
    repository: &R,
    job_id: &JobId,
    user_id: &UserId,
    request: RequestId,
    outcome: Result<String, String>,
    fallback: bool,
) -> FeedbackResolution
where
    R: ApplicantRepository + ?Sized,
{
    let (reasoning, resolution) = match outcome {
        Ok(text) => (Some(text), FeedbackResolution::Stored),
        Err(reason) if fallback => {
            warn!(job_id = %job_id, user_id = %user_id, request_id = %request, %reason, "feedback failed, storing fallback");
            (
                Some(FALLBACK_REJECTION_FEEDBACK.to_string()),
                FeedbackResolution::FellBack { reason },
            )
        }
        Err(reason) => {
            warn!(job_id = %job_id, user_id = %user_id, request_id = %request, %reason, "feedback failed");
            (None, FeedbackResolution::Failed { reason })
        }
    };

    let mut patch = ApplicantPatch::new()
        .expect(PatchPrecondition::PendingFeedback(request))
        .pending_feedback(None);
    if let Some(text) = reasoning {
        patch = patch.reasoning(Some(text));
    }

    match repository.update(job_id, user_id, &patch) {
        Ok(_) => {
            debug!(job_id = %job_id, user_id = %user_id, request_id = %request, "feedback settled");
            resolution
        }
        Err(RepositoryError::Stale(_)) => {
            debug!(job_id = %job_id, user_id = %user_id, request_id = %request, "stale feedback discarded");
            FeedbackResolution::Discarded
        }
        Err(error) => {
            warn!(job_id = %job_id, user_id = %user_id, request_id = %request, %error, "feedback could not be stored");
            FeedbackResolution::Failed {
                reason: error.to_string(),
            }
        }
    }
}

/// Error raised by the hiring pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("candidate {0} not found")]
    CandidateNotFound(UserId),
    #[error("applicant {user_id} not found for job {job_id}")]
    ApplicantNotFound { job_id: JobId, user_id: UserId },
    #[error("candidate {0} already applied to this job")]
    AlreadyApplied(UserId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("invalid interview schedule: {0}")]
    InvalidSchedule(String),
    #[error("invalid column filter: {0}")]
    InvalidFilter(String),
    #[error("invalid applicant record: {0}")]
    InvalidRecord(String),
    #[error("comparison needs {min} to {max} candidates, got {actual}")]
    ComparisonSize {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("message body cannot be empty")]
    EmptyMessage,
    #[error("applicant {0} changed concurrently; reload and retry")]
    ConcurrentTransition(UserId),
    #[error("an analysis for {0} is already in flight")]
    AnalysisInFlight(UserId),
    #[error("analysis {0} was superseded before it completed")]
    Superseded(RequestId),
    #[error("no async runtime available to generate rejection feedback")]
    RuntimeUnavailable,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PipelineError {
    /// Short machine-readable tag for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::JobNotFound(_)
            | PipelineError::CandidateNotFound(_)
            | PipelineError::ApplicantNotFound { .. }
            | PipelineError::Repository(RepositoryError::NotFound) => "not_found",
            PipelineError::AlreadyApplied(_) | PipelineError::Repository(RepositoryError::Conflict) => {
                "already_exists"
            }
            PipelineError::Transition(TransitionError::ConfirmationRequired(_)) => {
                "confirmation_required"
            }
            PipelineError::Transition(TransitionError::UnknownStage(_)) => "invalid_stage",
            PipelineError::InvalidRating(_)
            | PipelineError::InvalidSchedule(_)
            | PipelineError::InvalidFilter(_)
            | PipelineError::InvalidRecord(_)
            | PipelineError::EmptyMessage => "invalid_request",
            PipelineError::ComparisonSize { .. } => "invalid_comparison_size",
            PipelineError::ConcurrentTransition(_) | PipelineError::Repository(RepositoryError::Stale(_)) => {
                "concurrent_update"
            }
            PipelineError::AnalysisInFlight(_) => "analysis_in_flight",
            PipelineError::Superseded(_) => "superseded",
            PipelineError::Gateway(_) => "insight_gateway_failed",
            PipelineError::Dispatch(_) => "dispatch_failed",
            PipelineError::RuntimeUnavailable
            | PipelineError::Export(_)
            | PipelineError::Repository(RepositoryError::Unavailable(_)) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            "not_found" => StatusCode::NOT_FOUND,
            "already_exists" | "confirmation_required" | "concurrent_update"
            | "analysis_in_flight" | "superseded" => StatusCode::CONFLICT,
            "invalid_stage" | "invalid_request" | "invalid_comparison_size" => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            "insight_gateway_failed" | "dispatch_failed" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
