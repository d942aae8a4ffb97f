use std::fmt;

use super::domain::{
    AiAnalysis, AiSuggestion, ApplicantRecord, CandidateProfile, JobId, JobPosting, RequestId,
    ScheduledInterview, Stage, UserId,
};

/// Storage abstraction for applicant records so the service can be exercised in isolation.
///
/// Implementations must apply each [`ApplicantPatch`] atomically with respect to other readers
/// and writers of the same `(job, user)` key, and must return [`RepositoryError::NotFound`]
/// rather than inventing a default record.
pub trait ApplicantRepository: Send + Sync {
    fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;
    fn fetch(
        &self,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError>;
    /// Records for a job in application order.
    fn list(&self, job_id: &JobId) -> Result<Vec<ApplicantRecord>, RepositoryError>;
    fn update(
        &self,
        job_id: &JobId,
        user_id: &UserId,
        patch: &ApplicantPatch,
    ) -> Result<ApplicantRecord, RepositoryError>;
}

/// Read-only lookup of jobs and candidate profiles owned by other parts of the product.
pub trait TalentDirectory: Send + Sync {
    fn job(&self, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError>;
    fn candidate(&self, user_id: &UserId) -> Result<Option<CandidateProfile>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently: expected {0}")]
    Stale(PatchPrecondition),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Compare-and-set guard evaluated under the same lock as the write it protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchPrecondition {
    Status(Stage),
    PendingAnalysis(RequestId),
    PendingFeedback(RequestId),
    NoPendingAnalysis,
}

impl fmt::Display for PatchPrecondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchPrecondition::Status(stage) => write!(f, "status {stage}"),
            PatchPrecondition::PendingAnalysis(id) => write!(f, "pending analysis {id}"),
            PatchPrecondition::PendingFeedback(id) => write!(f, "pending feedback {id}"),
            PatchPrecondition::NoPendingAnalysis => f.write_str("no analysis in flight"),
        }
    }
}

impl PatchPrecondition {
    fn holds(&self, record: &ApplicantRecord) -> bool {
        match self {
            PatchPrecondition::Status(stage) => &record.status == stage,
            PatchPrecondition::PendingAnalysis(id) => record.pending_analysis == Some(*id),
            PatchPrecondition::PendingFeedback(id) => record.pending_feedback == Some(*id),
            PatchPrecondition::NoPendingAnalysis => record.pending_analysis.is_none(),
        }
    }
}

/// Partial update of an applicant record.
///
/// Patches are built only by the pipeline service so every write goes through its validation;
/// storage backends call [`ApplicantPatch::apply`] while holding the record's lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicantPatch {
    preconditions: Vec<PatchPrecondition>,
    status: Option<Stage>,
    rating: Option<u8>,
    ai_analysis: Option<AiAnalysis>,
    ai_reasoning: Option<Option<String>>,
    ai_suggestion: Option<Option<AiSuggestion>>,
    scheduled_interview: Option<Option<ScheduledInterview>>,
    mark_reviewed: bool,
    pending_analysis: Option<Option<RequestId>>,
    pending_feedback: Option<Option<RequestId>>,
}

impl ApplicantPatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn expect(mut self, precondition: PatchPrecondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub(crate) fn status(mut self, status: Stage) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    pub(crate) fn analysis(mut self, analysis: AiAnalysis) -> Self {
        self.ai_analysis = Some(analysis);
        self
    }

    pub(crate) fn reasoning(mut self, reasoning: Option<String>) -> Self {
        self.ai_reasoning = Some(reasoning);
        self
    }

    pub(crate) fn suggestion(mut self, suggestion: Option<AiSuggestion>) -> Self {
        self.ai_suggestion = Some(suggestion);
        self
    }

    pub(crate) fn schedule(mut self, interview: Option<ScheduledInterview>) -> Self {
        self.scheduled_interview = Some(interview);
        self
    }

    pub(crate) fn reviewed(mut self) -> Self {
        self.mark_reviewed = true;
        self
    }

    pub(crate) fn pending_analysis(mut self, request: Option<RequestId>) -> Self {
        self.pending_analysis = Some(request);
        self
    }

    pub(crate) fn pending_feedback(mut self, request: Option<RequestId>) -> Self {
        self.pending_feedback = Some(request);
        self
    }

    /// Verify every precondition and then write all fields, or leave the record untouched.
    pub fn apply(&self, record: &mut ApplicantRecord) -> Result<(), RepositoryError> {
        if let Some(failed) = self
            .preconditions
            .iter()
            .find(|precondition| !precondition.holds(record))
        {
            return Err(RepositoryError::Stale(failed.clone()));
        }

        if let Some(status) = &self.status {
            record.status = status.clone();
        }
        if let Some(rating) = self.rating {
            record.rating = rating;
        }
        if let Some(analysis) = &self.ai_analysis {
            record.ai_analysis = Some(analysis.clone());
        }
        if let Some(reasoning) = &self.ai_reasoning {
            record.ai_reasoning = reasoning.clone();
        }
        if let Some(suggestion) = self.ai_suggestion {
            record.ai_suggestion = suggestion;
        }
        if let Some(interview) = &self.scheduled_interview {
            record.scheduled_interview = interview.clone();
        }
        // Monotonic: a patch can raise the review flag but never lower it.
        if self.mark_reviewed {
            record.has_been_reviewed = true;
        }
        if let Some(request) = self.pending_analysis {
            record.pending_analysis = request;
        }
        if let Some(request) = self.pending_feedback {
            record.pending_feedback = request;
        }
        Ok(())
    }
}
