//! Applicant hiring pipeline for job postings.
//!
//! Each job resolves to an ordered stage pipeline (`Applied`, `Shortlisted`, its interview rounds,
//! `Hired`) plus the `Rejected` group. [`HiringPipelineService`] owns every write to applicant
//! records; column views, selection and exports are derived from those records without
//! mutating them.

pub mod columns;
pub mod domain;
pub mod export;
pub mod gateway;
pub mod memory;
pub mod notifications;
pub mod pipeline;
pub mod repository;
pub mod router;
pub mod selection;
pub mod service;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use columns::{
    average_fit_score, view_column, ApplicantCard, ColumnBoard, ColumnFilter, ColumnState,
    ColumnView, SortOrder,
};
pub use domain::{
    AiAnalysis, AiSuggestion, ApplicantRecord, CandidateProfile, ExperienceEntry, InterviewRound,
    JobId, JobPosting, PortfolioProject, RequestId, ScheduledInterview, SkillValidation, Stage,
    UserId,
};
pub use export::{ExportError, ExportKind, ExportRow, QuickExportRow};
pub use gateway::{
    AnalysisRequest, ApplicantBrief, ComparisonAnalysis, ComparisonRequest, FeedbackRequest,
    GatewayError, HeuristicInsightGateway, InsightGateway, JobBrief,
};
pub use memory::{InMemoryApplicantStore, InMemoryDirectory};
pub use notifications::{
    template_for, BroadcastReport, DispatchError, MessageContext, MessageDraft, MessageTemplate,
    NotificationDispatcher,
};
pub use pipeline::{resolve_pipeline, resolve_terminal_stages, Pipeline};
pub use repository::{ApplicantRepository, RepositoryError, TalentDirectory};
pub use router::hiring_router;
pub use selection::{SelectAllOutcome, SelectionSet};
pub use service::{
    AnalysisMode, BoardView, ComparisonReport, DropPayload, ExportDocument, HiringPipelineService,
    PipelineError,
};
pub use transitions::{
    can_transition, requires_confirmation, BulkMoveReport, Confirmation, FeedbackResolution,
    FeedbackTicket, MoveOutcome, TransitionError,
};
