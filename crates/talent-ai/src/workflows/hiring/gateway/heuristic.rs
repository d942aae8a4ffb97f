use async_trait::async_trait;

use super::{
    AnalysisRequest, ApplicantBrief, CandidateBreakdown, ComparisonAnalysis, ComparisonRequest,
    FeedbackRequest, GatewayError, InsightGateway, JobBrief, Recommendation,
};
use crate::workflows::hiring::domain::{AiAnalysis, AiSuggestion, SkillValidation};

/// Deterministic skill-overlap gateway for offline demos and local development.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicInsightGateway;

impl HeuristicInsightGateway {
    pub fn new() -> Self {
        Self
    }

    fn validate_skill(applicant: &ApplicantBrief, skill: &str) -> SkillValidation {
        let needle = skill.to_lowercase();
        let (has_evidence, evidence) = if applicant
            .skills
            .iter()
            .any(|listed| listed.eq_ignore_ascii_case(skill))
        {
            (true, format!("Lists {skill} as a core skill."))
        } else if applicant.experience_summary.to_lowercase().contains(&needle) {
            (true, format!("Experience mentions {skill}."))
        } else if applicant.portfolio_summary.to_lowercase().contains(&needle) {
            (true, format!("Portfolio work uses {skill}."))
        } else {
            (false, "No direct evidence found.".to_string())
        };

        SkillValidation {
            skill: skill.to_string(),
            has_evidence,
            evidence,
        }
    }

    pub(crate) fn score(job: &JobBrief, applicant: &ApplicantBrief) -> AiAnalysis {
        let skill_validation: Vec<SkillValidation> = job
            .required_skills
            .iter()
            .map(|skill| Self::validate_skill(applicant, skill))
            .collect();

        let matched = skill_validation.iter().filter(|v| v.has_evidence).count();
        let coverage = if skill_validation.is_empty() {
            1.0
        } else {
            matched as f32 / skill_validation.len() as f32
        };

        let mut fit_score = (coverage * 80.0).round() as u8;
        if !applicant.portfolio_summary.is_empty() {
            fit_score += 10;
        }
        if !applicant.vision_text.trim().is_empty() {
            fit_score += 10;
        }
        let fit_score = fit_score.min(100);

        let strengths: Vec<String> = skill_validation
            .iter()
            .filter(|v| v.has_evidence)
            .take(3)
            .map(|v| format!("Hands-on {}", v.skill))
            .collect();
        let mut weaknesses: Vec<String> = skill_validation
            .iter()
            .filter(|v| !v.has_evidence)
            .take(2)
            .map(|v| format!("No evidence of {}", v.skill))
            .collect();
        if weaknesses.is_empty() {
            weaknesses.push("Limited detail on recent impact".to_string());
        }

        let mut interview_questions: Vec<String> = skill_validation
            .iter()
            .filter(|v| !v.has_evidence)
            .take(2)
            .map(|v| format!("How would you ramp up on {} in your first month?", v.skill))
            .collect();
        if let Some(validated) = skill_validation.iter().find(|v| v.has_evidence) {
            interview_questions.push(format!(
                "Walk us through a project where {} was central.",
                validated.skill
            ));
        }

        let project_deep_dive = if applicant.portfolio_summary.is_empty() {
            "No portfolio projects listed.".to_string()
        } else {
            format!("Portfolio highlights: {}", applicant.portfolio_summary)
        };
        let culture_alignment = if applicant.vision_text.trim().is_empty() {
            "No vision statement provided.".to_string()
        } else {
            format!("Vision statement: {}", applicant.vision_text.trim())
        };

        AiAnalysis {
            fit_score,
            summary: format!(
                "{} shows evidence for {} of {} required skills for {}.",
                applicant.name,
                matched,
                skill_validation.len(),
                job.title
            ),
            strengths,
            weaknesses,
            skill_validation,
            project_deep_dive,
            culture_alignment,
            interview_questions,
            ai_suggestion: AiSuggestion::from_fit_score(fit_score),
        }
    }
}

#[async_trait]
impl InsightGateway for HeuristicInsightGateway {
    async fn analyze_applicant(
        &self,
        request: AnalysisRequest,
    ) -> Result<AiAnalysis, GatewayError> {
        Ok(Self::score(&request.job, &request.applicant))
    }

    async fn compare_applicants(
        &self,
        request: ComparisonRequest,
    ) -> Result<ComparisonAnalysis, GatewayError> {
        let scored: Vec<(ApplicantBrief, AiAnalysis)> = request
            .candidates
            .into_iter()
            .map(|candidate| {
                let analysis = candidate
                    .analysis
                    .unwrap_or_else(|| Self::score(&request.job, &candidate.applicant));
                (candidate.applicant, analysis)
            })
            .collect();

        // Ties go to the earliest candidate in the request.
        let best = scored
            .iter()
            .fold(None::<&(ApplicantBrief, AiAnalysis)>, |best, entry| match best {
                Some(current) if current.1.fit_score >= entry.1.fit_score => Some(current),
                _ => Some(entry),
            })
            .ok_or_else(|| GatewayError::Malformed("no candidates to compare".to_string()))?;

        let breakdowns = scored
            .iter()
            .map(|(applicant, analysis)| CandidateBreakdown {
                user_id: applicant.user_id.clone(),
                strengths: analysis.strengths.clone(),
                weaknesses: analysis.weaknesses.clone(),
            })
            .collect();

        let ranking = scored
            .iter()
            .map(|(applicant, analysis)| format!("{} ({})", applicant.name, analysis.fit_score))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(ComparisonAnalysis {
            summary: format!("Fit scores for {}: {}.", request.job.title, ranking),
            recommendation: Recommendation {
                user_id: best.0.user_id.clone(),
                reasoning: format!(
                    "{} has the strongest evidence against the required skills ({}).",
                    best.0.name, best.1.fit_score
                ),
            },
            breakdowns,
        })
    }

    async fn generate_rejection_feedback(
        &self,
        request: FeedbackRequest,
    ) -> Result<String, GatewayError> {
        let analysis = Self::score(&request.job, &request.applicant);
        let missing: Vec<&str> = analysis
            .skill_validation
            .iter()
            .filter(|v| !v.has_evidence)
            .map(|v| v.skill.as_str())
            .collect();

        // Comparative mode: name a gap the successful applicants covered.
        let differentiator = missing.iter().find(|skill| {
            request
                .peers
                .iter()
                .any(|peer| Self::validate_skill(peer, skill).has_evidence)
        });

        let feedback = match (differentiator, missing.first(), request.applicant.skills.first()) {
            (Some(skill), _, Some(strength)) => format!(
                "While your experience with {strength} stands out, the hiring team prioritized candidates who demonstrated hands-on experience with {skill}, a core requirement for {}.",
                request.job.title
            ),
            (Some(skill), _, None) | (None, Some(skill), _) => format!(
                "Thank you for applying for {}. The hiring team was looking for deeper experience with {skill}, which was a key requirement for this role.",
                request.job.title
            ),
            (None, None, _) => format!(
                "Thank you for applying for {}. The team moved forward with candidates whose recent experience aligned more closely with the role's current priorities.",
                request.job.title
            ),
        };
        Ok(feedback)
    }
}
