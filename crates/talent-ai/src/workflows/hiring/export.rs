use serde::{Deserialize, Serialize};

use super::domain::{ApplicantRecord, CandidateProfile, JobPosting, UserId};

const VISION_SNIPPET_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// Contact details only, tab separated for pasting into spreadsheets.
    Quick,
    /// Contact details plus the cached AI analysis, as CSV.
    #[default]
    Full,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export buffer: {0}")]
    Flush(String),
    #[error("export is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

pub fn profile_url(public_base_url: &str, user_id: &UserId) -> String {
    format!("{}/profile/{}", public_base_url.trim_end_matches('/'), user_id)
}

/// Download name for a job's full export, e.g. `Senior_Engineer_AI_Analysis.csv`.
pub fn export_file_name(job: &JobPosting, kind: ExportKind) -> String {
    let stem = job.title.split_whitespace().collect::<Vec<_>>().join("_");
    match kind {
        ExportKind::Quick => format!("{stem}_Contacts.tsv"),
        ExportKind::Full => format!("{stem}_AI_Analysis.csv"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickExportRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Profile URL")]
    pub profile_url: String,
}

impl QuickExportRow {
    pub fn new(candidate: &CandidateProfile, public_base_url: &str) -> Self {
        Self {
            name: candidate.name.clone(),
            title: candidate.title.clone(),
            email: candidate.email.clone().unwrap_or_default(),
            phone: candidate.phone.clone().unwrap_or_default(),
            profile_url: profile_url(public_base_url, &candidate.user_id),
        }
    }
}

/// One applicant in the full export. Analysis columns stay empty when no analysis is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Profile URL")]
    pub profile_url: String,
    #[serde(rename = "AI Fit Score")]
    pub fit_score: Option<u8>,
    #[serde(rename = "AI Summary")]
    pub summary: String,
    #[serde(rename = "Skill Match")]
    pub skill_match_ratio: String,
    #[serde(rename = "Validated Skills")]
    pub validated_skills: String,
    #[serde(rename = "Vision Snippet")]
    pub vision_snippet: String,
    #[serde(rename = "Featured Project")]
    pub featured_project_name: String,
}

impl ExportRow {
    pub fn new(
        candidate: &CandidateProfile,
        record: &ApplicantRecord,
        public_base_url: &str,
    ) -> Self {
        let analysis = record.ai_analysis.as_ref();
        Self {
            name: candidate.name.clone(),
            title: candidate.title.clone(),
            email: candidate.email.clone().unwrap_or_default(),
            phone: candidate.phone.clone().unwrap_or_default(),
            profile_url: profile_url(public_base_url, &candidate.user_id),
            fit_score: analysis.map(|analysis| analysis.fit_score),
            summary: analysis
                .map(|analysis| analysis.summary.clone())
                .unwrap_or_default(),
            skill_match_ratio: analysis
                .map(|analysis| analysis.skill_match_ratio())
                .unwrap_or_default(),
            validated_skills: analysis
                .map(|analysis| analysis.validated_skills().collect::<Vec<_>>().join("; "))
                .unwrap_or_default(),
            vision_snippet: vision_snippet(&candidate.vision),
            featured_project_name: candidate
                .showcase_project()
                .map(|project| project.name.clone())
                .unwrap_or_default(),
        }
    }
}

fn vision_snippet(vision: &str) -> String {
    let vision = vision.trim();
    if vision.is_empty() {
        return String::new();
    }
    let snippet: String = vision.chars().take(VISION_SNIPPET_CHARS).collect();
    format!("{snippet}...")
}

pub fn write_quick_export(rows: &[QuickExportRow]) -> Result<String, ExportError> {
    let writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    write_rows(writer, rows)
}

pub fn write_full_export(rows: &[ExportRow]) -> Result<String, ExportError> {
    let writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());
    write_rows(writer, rows)
}

fn write_rows<T: Serialize>(
    mut writer: csv::Writer<Vec<u8>>,
    rows: &[T],
) -> Result<String, ExportError> {
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| ExportError::Flush(error.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
