//! Stage transition rules and the bookkeeping around their side effects.

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::domain::{ApplicantRecord, JobPosting, RequestId, Stage, UserId};
use super::notifications::MessageDraft;
use super::pipeline::Pipeline;
use super::repository::{ApplicantPatch, PatchPrecondition};

/// Operator acknowledgement for transitions that need one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Confirmed,
    #[default]
    Unconfirmed,
}

impl From<bool> for Confirmation {
    fn from(value: bool) -> Self {
        if value {
            Confirmation::Confirmed
        } else {
            Confirmation::Unconfirmed
        }
    }
}

impl Confirmation {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Confirmation::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("stage '{0}' is not part of this job's pipeline")]
    UnknownStage(Stage),
    #[error("moving applicants to {0} requires confirmation")]
    ConfirmationRequired(Stage),
}

/// Only rejection is destructive enough to need an explicit confirmation.
pub fn requires_confirmation(target: &Stage) -> bool {
    target.is_rejected()
}

pub fn can_transition(pipeline: &Pipeline, record: &ApplicantRecord, target: &Stage) -> bool {
    pipeline.accepts(target) && &record.status != target
}

/// Validate a target stage independent of any record, as done once for a whole batch.
pub fn check_target(
    pipeline: &Pipeline,
    target: &Stage,
    confirmation: Confirmation,
) -> Result<(), TransitionError> {
    if !pipeline.accepts(target) {
        return Err(TransitionError::UnknownStage(target.clone()));
    }
    if requires_confirmation(target) && !confirmation.is_confirmed() {
        return Err(TransitionError::ConfirmationRequired(target.clone()));
    }
    Ok(())
}

/// Whether `record` has to change to reach `target`. Errors leave the record untouched.
pub fn plan_move(
    pipeline: &Pipeline,
    record: &ApplicantRecord,
    target: &Stage,
    confirmation: Confirmation,
) -> Result<bool, TransitionError> {
    if &record.status == target {
        return Ok(false);
    }
    check_target(pipeline, target, confirmation)?;
    Ok(can_transition(pipeline, record, target))
}

/// Status write plus its side effects, guarded by the status the caller observed.
pub(crate) fn transition_patch(
    job: &JobPosting,
    record: &ApplicantRecord,
    target: &Stage,
    feedback_request: Option<RequestId>,
) -> ApplicantPatch {
    let mut patch = ApplicantPatch::new()
        .expect(PatchPrecondition::Status(record.status.clone()))
        .status(target.clone())
        .suggestion(None)
        .reviewed();

    if !job.is_interview_round(target) {
        patch = patch.schedule(None);
    }
    if target.is_rejected() {
        // Feedback from an earlier rejection must not stand in for the pending request.
        patch = patch.pending_feedback(feedback_request).reasoning(None);
    } else if record.feedback_pending() {
        // Leaving Rejected orphans any feedback still being generated.
        patch = patch.pending_feedback(None);
    }
    patch
}

/// How a background rejection feedback request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedbackResolution {
    Stored,
    FellBack { reason: String },
    Failed { reason: String },
    /// The record moved on before the result arrived.
    Discarded,
}

/// Handle to the feedback generation spawned by a rejection.
#[derive(Debug)]
pub struct FeedbackTicket {
    pub request_id: RequestId,
    pub user_id: UserId,
    handle: JoinHandle<FeedbackResolution>,
}

impl FeedbackTicket {
    pub(crate) fn new(
        request_id: RequestId,
        user_id: UserId,
        handle: JoinHandle<FeedbackResolution>,
    ) -> Self {
        Self {
            request_id,
            user_id,
            handle,
        }
    }

    pub async fn resolved(self) -> FeedbackResolution {
        match self.handle.await {
            Ok(resolution) => resolution,
            Err(error) => FeedbackResolution::Failed {
                reason: format!("feedback task aborted: {error}"),
            },
        }
    }
}

/// Result of a single move.
#[derive(Debug)]
pub struct MoveOutcome {
    pub record: ApplicantRecord,
    pub previous: Stage,
    /// Template offered to the operator for non-rejection moves.
    pub message: Option<MessageDraft>,
    pub feedback: Option<FeedbackTicket>,
}

impl MoveOutcome {
    pub(crate) fn unchanged(record: ApplicantRecord) -> Self {
        Self {
            previous: record.status.clone(),
            record,
            message: None,
            feedback: None,
        }
    }

    pub fn changed(&self) -> bool {
        self.previous != self.record.status
    }

    pub fn view(&self) -> MoveView {
        MoveView {
            user_id: self.record.user_id.clone(),
            previous: self.previous.clone(),
            status: self.record.status.clone(),
            changed: self.changed(),
            message: self.message.clone(),
            feedback_request: self.feedback.as_ref().map(|ticket| ticket.request_id),
        }
    }
}

/// Serializable summary of a [`MoveOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveView {
    pub user_id: UserId,
    pub previous: Stage,
    pub status: Stage,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_request: Option<RequestId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMove {
    pub user_id: UserId,
    pub reason: String,
}

/// Result of a batch move: every id is accounted for in exactly one list.
#[derive(Debug)]
pub struct BulkMoveReport {
    pub target: Stage,
    pub moved: Vec<MoveOutcome>,
    pub unchanged: Vec<UserId>,
    pub skipped: Vec<SkippedMove>,
}

impl BulkMoveReport {
    pub(crate) fn new(target: Stage) -> Self {
        Self {
            target,
            moved: Vec::new(),
            unchanged: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn view(&self) -> BulkMoveView {
        BulkMoveView {
            target: self.target.clone(),
            moved: self.moved.iter().map(MoveOutcome::view).collect(),
            unchanged: self.unchanged.clone(),
            skipped: self.skipped.clone(),
        }
    }

    /// Wait for every feedback request fired by the batch.
    pub async fn settle_feedback(&mut self) -> Vec<(UserId, FeedbackResolution)> {
        let tickets: Vec<FeedbackTicket> = self
            .moved
            .iter_mut()
            .filter_map(|outcome| outcome.feedback.take())
            .collect();
        let mut resolutions = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let user_id = ticket.user_id.clone();
            resolutions.push((user_id, ticket.resolved().await));
        }
        resolutions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkMoveView {
    pub target: Stage,
    pub moved: Vec<MoveView>,
    pub unchanged: Vec<UserId>,
    pub skipped: Vec<SkippedMove>,
}
