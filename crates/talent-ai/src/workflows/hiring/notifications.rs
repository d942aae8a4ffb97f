use serde::{Deserialize, Serialize};

use super::domain::{CandidateProfile, JobId, JobPosting, Stage, UserId};

/// Outbound channel for applicant messages. Delivery and conversation threading are the
/// implementation's concern.
pub trait NotificationDispatcher: Send + Sync {
    fn send(&self, message: MessageDraft) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("message transport unavailable: {0}")]
    Transport(String),
    #[error("recipient {0} cannot receive messages")]
    Unreachable(UserId),
}

/// Values substituted into `{applicantName}`, `{jobTitle}`, `{companyName}` and `{recruiterName}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    pub applicant_name: String,
    pub job_title: String,
    pub company_name: String,
    pub recruiter_name: String,
}

impl MessageContext {
    pub fn new(job: &JobPosting, candidate: &CandidateProfile, recruiter_name: &str) -> Self {
        Self {
            applicant_name: candidate.first_name().to_string(),
            job_title: job.title.clone(),
            company_name: job.company_name.clone(),
            recruiter_name: recruiter_name.to_string(),
        }
    }

    pub fn render(&self, template: &str) -> String {
        template
            .replace("{applicantName}", &self.applicant_name)
            .replace("{jobTitle}", &self.job_title)
            .replace("{companyName}", &self.company_name)
            .replace("{recruiterName}", &self.recruiter_name)
    }
}

/// Subject and body with unrendered placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

impl MessageTemplate {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn render(&self, context: &MessageContext) -> (String, String) {
        (context.render(&self.subject), context.render(&self.body))
    }
}

/// Template offered after a move into `stage`, if that stage has one.
pub fn template_for(job: &JobPosting, stage: &Stage) -> Option<MessageTemplate> {
    match stage {
        Stage::Shortlisted => Some(MessageTemplate::new(
            "Update on your application for {jobTitle} at {companyName}",
            "Hi {applicantName},\n\nGreat news! The team at {companyName} was impressed with your profile and would like to move forward with your application for the {jobTitle} role.\n\nWe'll be in touch shortly with the next steps.\n\nBest,\n{recruiterName}",
        )),
        Stage::Interview(round) if job.is_interview_round(stage) => {
            let details = job
                .interview_rounds
                .iter()
                .find(|candidate| &candidate.name == round)
                .map(|round| round.description.trim())
                .filter(|description| !description.is_empty())
                .map(|description| format!(" {description}"))
                .unwrap_or_default();
            Some(MessageTemplate::new(
                format!("Next Steps: {round} for {{jobTitle}}"),
                format!(
                    "Hi {{applicantName}},\n\nWe'd like to invite you to the {round} stage for the {{jobTitle}} position at {{companyName}}.{details}\n\nPlease let me know what times work best for you over the next few days.\n\nBest,\n{{recruiterName}}"
                ),
            ))
        }
        Stage::Hired => Some(MessageTemplate::new(
            "Offer: {jobTitle} at {companyName}",
            "Hi {applicantName},\n\nOn behalf of everyone at {companyName}, I'm delighted to let you know we'd like you to join us as {jobTitle}.\n\nI'll follow up with the offer details shortly.\n\nBest,\n{recruiterName}",
        )),
        Stage::Applied | Stage::Rejected | Stage::Interview(_) => None,
    }
}

/// Rendered message ready to hand to a [`NotificationDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub job_id: JobId,
    pub recipient: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub subject: String,
    pub body: String,
}

impl MessageDraft {
    pub fn from_template(
        job: &JobPosting,
        candidate: &CandidateProfile,
        stage: Option<Stage>,
        template: &MessageTemplate,
        recruiter_name: &str,
    ) -> Self {
        let context = MessageContext::new(job, candidate, recruiter_name);
        let (subject, body) = template.render(&context);
        Self {
            job_id: job.id.clone(),
            recipient: candidate.user_id.clone(),
            stage,
            subject,
            body,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Per-recipient result of a broadcast; failures never roll back earlier sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub sent: Vec<UserId>,
    pub failed: Vec<DeliveryFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub user_id: UserId,
    pub reason: String,
}
