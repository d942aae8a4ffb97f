use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier wrapper for candidates (the applicant's user account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Correlates an asynchronous gateway call with the record it will be merged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{:06}", self.0)
    }
}

/// Interview step configured by the hiring company. The name doubles as a stage label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRound {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Read-only snapshot of a job posting as the engine needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub company_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub interview_rounds: Vec<InterviewRound>,
}

impl JobPosting {
    pub fn is_interview_round(&self, stage: &Stage) -> bool {
        match stage {
            Stage::Interview(name) => self.interview_rounds.iter().any(|round| &round.name == name),
            _ => false,
        }
    }
}

/// A step an applicant can occupy. Serialized as its plain label so interview rounds stay free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Applied,
    Shortlisted,
    Interview(String),
    Hired,
    Rejected,
}

impl Stage {
    pub fn label(&self) -> &str {
        match self {
            Stage::Applied => "Applied",
            Stage::Shortlisted => "Shortlisted",
            Stage::Interview(name) => name,
            Stage::Hired => "Hired",
            Stage::Rejected => "Rejected",
        }
    }

    /// Fixed labels win over interview round names that happen to collide with them.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim() {
            "Applied" => Stage::Applied,
            "Shortlisted" => Stage::Shortlisted,
            "Hired" => Stage::Hired,
            "Rejected" => Stage::Rejected,
            other => Stage::Interview(other.to_string()),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Stage::Rejected)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for Stage {
    fn from(value: &str) -> Self {
        Stage::from_label(value)
    }
}

impl Serialize for Stage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Stage::from_label(&raw))
    }
}

/// Public profile data the engine reads for AI requests, messaging and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub portfolio: Vec<PortfolioProject>,
    #[serde(default)]
    pub vision: String,
}

impl CandidateProfile {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or_default()
    }

    /// Featured project when flagged, otherwise the first listed one.
    pub fn showcase_project(&self) -> Option<&PortfolioProject> {
        self.portfolio
            .iter()
            .find(|project| project.is_featured)
            .or_else(|| self.portfolio.first())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub role: String,
    pub company: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

/// Advisory hint derived from the fit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiSuggestion {
    Shortlist,
    Reject,
}

impl AiSuggestion {
    pub const SHORTLIST_THRESHOLD: u8 = 85;
    pub const REJECT_THRESHOLD: u8 = 50;

    pub fn from_fit_score(fit_score: u8) -> Option<Self> {
        if fit_score >= Self::SHORTLIST_THRESHOLD {
            Some(AiSuggestion::Shortlist)
        } else if fit_score < Self::REJECT_THRESHOLD {
            Some(AiSuggestion::Reject)
        } else {
            None
        }
    }
}

/// Evidence check for one of the job's required skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillValidation {
    pub skill: String,
    pub has_evidence: bool,
    #[serde(default)]
    pub evidence: String,
}

/// Structured fit analysis returned by the insight gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub fit_score: u8,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub skill_validation: Vec<SkillValidation>,
    #[serde(default)]
    pub project_deep_dive: String,
    #[serde(default)]
    pub culture_alignment: String,
    #[serde(default)]
    pub interview_questions: Vec<String>,
    #[serde(default)]
    pub ai_suggestion: Option<AiSuggestion>,
}

impl AiAnalysis {
    pub fn validated_skills(&self) -> impl Iterator<Item = &str> {
        self.skill_validation
            .iter()
            .filter(|validation| validation.has_evidence)
            .map(|validation| validation.skill.as_str())
    }

    pub fn has_evidence_for(&self, skill: &str) -> bool {
        let wanted = skill.trim();
        self.validated_skills()
            .any(|validated| validated.eq_ignore_ascii_case(wanted))
    }

    pub fn skill_match_ratio(&self) -> String {
        format!(
            "{}/{}",
            self.validated_skills().count(),
            self.skill_validation.len()
        )
    }

    /// Star rating implied by the fit score, never below one star.
    pub fn suggested_rating(&self) -> u8 {
        let stars = (f32::from(self.fit_score.min(100)) / 20.0).round() as u8;
        stars.clamp(1, 5)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInterview {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub interviewer_ids: Vec<UserId>,
    #[serde(default)]
    pub video_link: Option<String>,
}

/// Authoritative per-applicant pipeline state for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub job_id: JobId,
    pub user_id: UserId,
    pub status: Stage,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestion: Option<AiSuggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_interview: Option<ScheduledInterview>,
    #[serde(default)]
    pub has_been_reviewed: bool,
    #[serde(skip)]
    pub(crate) pending_analysis: Option<RequestId>,
    #[serde(skip)]
    pub(crate) pending_feedback: Option<RequestId>,
}

impl ApplicantRecord {
    /// Fresh record for a candidate who just applied.
    pub fn applied(job_id: JobId, user_id: UserId) -> Self {
        Self {
            job_id,
            user_id,
            status: Stage::Applied,
            rating: 0,
            ai_analysis: None,
            ai_reasoning: None,
            ai_suggestion: None,
            scheduled_interview: None,
            has_been_reviewed: false,
            pending_analysis: None,
            pending_feedback: None,
        }
    }

    pub fn with_status(mut self, status: Stage) -> Self {
        self.status = status;
        self
    }

    pub fn with_analysis(mut self, analysis: AiAnalysis) -> Self {
        self.rating = analysis.suggested_rating();
        self.ai_suggestion = analysis.ai_suggestion;
        self.ai_analysis = Some(analysis);
        self
    }

    pub fn fit_score(&self) -> Option<u8> {
        self.ai_analysis.as_ref().map(|analysis| analysis.fit_score)
    }

    pub fn analysis_pending(&self) -> bool {
        self.pending_analysis.is_some()
    }

    pub fn feedback_pending(&self) -> bool {
        self.pending_feedback.is_some()
    }
}
