//! Contract with the generative-AI insight service.
//!
//! The engine only depends on request/response shapes here; prompt construction and model calls
//! live behind [`InsightGateway`] implementations.

mod heuristic;

pub use heuristic::HeuristicInsightGateway;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{AiAnalysis, CandidateProfile, JobPosting, UserId};

/// Generic feedback used when a rejection feedback call fails and the fallback policy is on.
pub const FALLBACK_REJECTION_FEEDBACK: &str = "After careful consideration, the team has decided to move forward with other candidates whose experience more closely matched the requirements of the role at this time.";

pub const MIN_COMPARISON_CANDIDATES: usize = 2;
pub const MAX_COMPARISON_CANDIDATES: usize = 4;

/// Peer profiles passed along for comparative rejection feedback.
pub const MAX_FEEDBACK_PEERS: usize = 3;

#[async_trait]
pub trait InsightGateway: Send + Sync {
    async fn analyze_applicant(&self, request: AnalysisRequest)
        -> Result<AiAnalysis, GatewayError>;

    /// Callers guarantee 2 to 4 candidates.
    async fn compare_applicants(
        &self,
        request: ComparisonRequest,
    ) -> Result<ComparisonAnalysis, GatewayError>;

    async fn generate_rejection_feedback(
        &self,
        request: FeedbackRequest,
    ) -> Result<String, GatewayError>;
}

/// Distinguishable gateway failure; never a malformed success payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("insight service unreachable: {0}")]
    Transport(String),
    #[error("insight service returned an unusable payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBrief {
    pub title: String,
    pub required_skills: Vec<String>,
    pub description: String,
}

impl JobBrief {
    pub fn from_job(job: &JobPosting) -> Self {
        Self {
            title: job.title.clone(),
            required_skills: job.required_skills.clone(),
            description: job.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantBrief {
    pub user_id: UserId,
    pub name: String,
    pub skills: Vec<String>,
    pub experience_summary: String,
    pub portfolio_summary: String,
    pub vision_text: String,
}

impl ApplicantBrief {
    pub fn from_profile(profile: &CandidateProfile) -> Self {
        let experience_summary = profile
            .experience
            .iter()
            .map(|entry| {
                if entry.description.is_empty() {
                    format!("{} at {}", entry.role, entry.company)
                } else {
                    format!("{} at {}: {}", entry.role, entry.company, entry.description)
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        let portfolio_summary = profile
            .portfolio
            .iter()
            .map(|project| format!("{}: {}", project.name, project.description))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            user_id: profile.user_id.clone(),
            name: profile.name.clone(),
            skills: profile.skills.clone(),
            experience_summary,
            portfolio_summary,
            vision_text: profile.vision.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub job: JobBrief,
    pub applicant: ApplicantBrief,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonCandidate {
    pub applicant: ApplicantBrief,
    /// Cached analysis, when one exists, so the gateway can ground its comparison.
    pub analysis: Option<AiAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub job: JobBrief,
    pub candidates: Vec<ComparisonCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub job: JobBrief,
    pub applicant: ApplicantBrief,
    /// Successful applicants for comparative feedback; empty selects the single-profile mode.
    pub peers: Vec<ApplicantBrief>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateBreakdown {
    pub user_id: UserId,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonAnalysis {
    pub summary: String,
    pub recommendation: Recommendation,
    pub breakdowns: Vec<CandidateBreakdown>,
}

impl ComparisonAnalysis {
    /// Reject payloads that recommend someone outside the compared set or break down strangers.
    pub fn validate(self, candidates: &[UserId]) -> Result<Self, GatewayError> {
        let allowed: BTreeSet<&UserId> = candidates.iter().collect();
        if !allowed.contains(&self.recommendation.user_id) {
            return Err(GatewayError::Malformed(format!(
                "recommendation {} is not one of the compared candidates",
                self.recommendation.user_id
            )));
        }
        if let Some(stranger) = self
            .breakdowns
            .iter()
            .find(|breakdown| !allowed.contains(&breakdown.user_id))
        {
            return Err(GatewayError::Malformed(format!(
                "breakdown for unknown candidate {}",
                stranger.user_id
            )));
        }
        Ok(self)
    }
}
