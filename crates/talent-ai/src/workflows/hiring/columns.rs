use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{AiSuggestion, ApplicantRecord, Stage, UserId};
use super::pipeline::Pipeline;
use super::selection::SelectionSet;

/// Per-column filter. Unset fields let every applicant through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    #[serde(default)]
    pub min_score: Option<u8>,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl ColumnFilter {
    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }

    /// Number of active criteria, as shown on the column's filter badge.
    pub fn active_count(&self) -> usize {
        self.required_skills.len() + usize::from(self.min_score.is_some())
    }

    pub fn admits(&self, record: &ApplicantRecord) -> bool {
        let score_ok = match self.min_score {
            None => true,
            Some(minimum) => record.fit_score().is_some_and(|score| score >= minimum),
        };
        let skills_ok = self.required_skills.is_empty()
            || record.ai_analysis.as_ref().is_some_and(|analysis| {
                self.required_skills
                    .iter()
                    .all(|skill| analysis.has_evidence_for(skill))
            });
        score_ok && skills_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Next state of the column's sort toggle: unsorted and ascending both go to descending.
    pub fn toggled(current: Option<SortOrder>) -> SortOrder {
        match current {
            Some(SortOrder::Desc) => SortOrder::Asc,
            None | Some(SortOrder::Asc) => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnState {
    pub filter: ColumnFilter,
    pub sort: Option<SortOrder>,
}

/// Filter and sort state for every column of one job, each column independent of the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnBoard {
    columns: BTreeMap<Stage, ColumnState>,
}

impl ColumnBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, stage: &Stage) -> ColumnState {
        self.columns.get(stage).cloned().unwrap_or_default()
    }

    pub fn toggle_sort(&mut self, stage: &Stage) -> SortOrder {
        let state = self.columns.entry(stage.clone()).or_default();
        let next = SortOrder::toggled(state.sort);
        state.sort = Some(next);
        next
    }

    pub fn set_filter(&mut self, stage: &Stage, filter: ColumnFilter) {
        self.columns.entry(stage.clone()).or_default().filter = filter;
    }

    pub fn clear_filter(&mut self, stage: &Stage) {
        if let Some(state) = self.columns.get_mut(stage) {
            state.filter = ColumnFilter::default();
        }
    }
}

/// Applicants in `stage` that pass `filter`, stably ordered by fit score when `sort` is set.
pub fn view_column(
    records: &[ApplicantRecord],
    stage: &Stage,
    filter: &ColumnFilter,
    sort: Option<SortOrder>,
) -> Vec<ApplicantRecord> {
    let mut column: Vec<ApplicantRecord> = records
        .iter()
        .filter(|record| &record.status == stage && filter.admits(record))
        .cloned()
        .collect();

    if let Some(order) = sort {
        // `sort_by_key` is stable, so equal scores keep application order.
        match order {
            SortOrder::Asc => column.sort_by_key(|record| record.fit_score().unwrap_or(0)),
            SortOrder::Desc => column.sort_by_key(|record| {
                std::cmp::Reverse(record.fit_score().unwrap_or(0))
            }),
        }
    }
    column
}

/// Rounded mean fit score of the scored applicants in `stage`; 0 when nobody is scored.
pub fn average_fit_score(records: &[ApplicantRecord], stage: &Stage) -> u8 {
    let scores: Vec<u32> = records
        .iter()
        .filter(|record| &record.status == stage)
        .filter_map(|record| record.fit_score().map(u32::from))
        .collect();
    if scores.is_empty() {
        return 0;
    }
    let mean = scores.iter().sum::<u32>() as f64 / scores.len() as f64;
    mean.round() as u8
}

/// Compact applicant summary rendered on a board card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantCard {
    pub user_id: UserId,
    pub status: Stage,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestion: Option<AiSuggestion>,
    pub has_been_reviewed: bool,
    pub interview_scheduled: bool,
    pub analysis_pending: bool,
    pub selected: bool,
}

impl ApplicantCard {
    pub fn from_record(record: &ApplicantRecord, selection: &SelectionSet) -> Self {
        Self {
            user_id: record.user_id.clone(),
            status: record.status.clone(),
            rating: record.rating,
            fit_score: record.fit_score(),
            ai_suggestion: record.ai_suggestion,
            has_been_reviewed: record.has_been_reviewed,
            interview_scheduled: record.scheduled_interview.is_some(),
            analysis_pending: record.analysis_pending(),
            selected: selection.is_selected(&record.user_id),
        }
    }
}

/// Rendered column: the filtered, sorted cards plus header metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub stage: Stage,
    pub terminal: bool,
    pub applicants: Vec<ApplicantCard>,
    /// Applicants in the stage before filtering.
    pub total: usize,
    pub average_fit_score: u8,
    pub unreviewed: usize,
    pub active_filters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    pub all_selected: bool,
}

impl ColumnView {
    pub fn build(
        records: &[ApplicantRecord],
        stage: &Stage,
        terminal: bool,
        state: &ColumnState,
        selection: &SelectionSet,
    ) -> Self {
        let visible = view_column(records, stage, &state.filter, state.sort);
        let visible_ids: Vec<UserId> = visible.iter().map(|r| r.user_id.clone()).collect();
        let in_stage = records.iter().filter(|record| &record.status == stage);

        Self {
            stage: stage.clone(),
            terminal,
            applicants: visible
                .iter()
                .map(|record| ApplicantCard::from_record(record, selection))
                .collect(),
            total: in_stage.clone().count(),
            average_fit_score: average_fit_score(records, stage),
            unreviewed: in_stage.filter(|record| !record.has_been_reviewed).count(),
            active_filters: state.filter.active_count(),
            sort: state.sort,
            all_selected: selection.all_selected(&visible_ids),
        }
    }
}

/// Every column of a job's board in display order.
pub fn board_view(
    pipeline: &Pipeline,
    records: &[ApplicantRecord],
    board: &ColumnBoard,
    selection: &SelectionSet,
) -> Vec<ColumnView> {
    pipeline
        .stages
        .iter()
        .map(|stage| (stage, false))
        .chain(pipeline.terminal.iter().map(|stage| (stage, true)))
        .map(|(stage, terminal)| {
            ColumnView::build(records, stage, terminal, &board.state(stage), selection)
        })
        .collect()
}
