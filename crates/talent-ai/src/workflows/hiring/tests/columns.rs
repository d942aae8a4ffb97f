use super::common::*;
use crate::workflows::hiring::columns::{
    average_fit_score, view_column, ColumnBoard, ColumnFilter, ColumnState, SortOrder,
};
use crate::workflows::hiring::domain::{Stage, UserId};
use crate::workflows::hiring::service::PipelineError;
use crate::workflows::hiring::transitions::TransitionError;

fn ids(records: &[crate::workflows::hiring::domain::ApplicantRecord]) -> Vec<UserId> {
    records.iter().map(|record| record.user_id.clone()).collect()
}

#[test]
fn minimum_score_excludes_unscored_applicants() {
    let records = vec![
        scored(ursula(), Stage::Applied, 60),
        scored(victor(), Stage::Applied, 85),
        record(wendy(), Stage::Applied),
    ];
    let filter = ColumnFilter {
        min_score: Some(80),
        required_skills: Vec::new(),
    };

    let visible = view_column(&records, &Stage::Applied, &filter, None);

    assert_eq!(ids(&visible), vec![victor()]);
    assert_eq!(filter.active_count(), 1);
}

#[test]
fn required_skills_need_validated_evidence() {
    let records = vec![
        record(ursula(), Stage::Applied)
            .with_analysis(analysis(90, &["Rust", "Postgres"], &["TypeScript"])),
        record(victor(), Stage::Applied).with_analysis(analysis(70, &["Rust"], &["Postgres"])),
        record(wendy(), Stage::Applied),
    ];
    let filter = ColumnFilter {
        min_score: None,
        required_skills: vec!["rust".to_string(), "POSTGRES".to_string()],
    };

    let visible = view_column(&records, &Stage::Applied, &filter, None);

    assert_eq!(ids(&visible), vec![ursula()]);
    assert!(filter.is_active());
    assert_eq!(filter.active_count(), 2);
}

#[test]
fn sorting_is_stable_and_treats_missing_scores_as_zero() {
    let records = vec![
        scored(ursula(), Stage::Applied, 70),
        record(victor(), Stage::Applied),
        scored(wendy(), Stage::Applied, 70),
        scored(xavier(), Stage::Applied, 90),
        scored(priya(), Stage::Shortlisted, 99),
    ];

    let descending = view_column(
        &records,
        &Stage::Applied,
        &ColumnFilter::default(),
        Some(SortOrder::Desc),
    );
    assert_eq!(ids(&descending), vec![xavier(), ursula(), wendy(), victor()]);

    let ascending = view_column(
        &records,
        &Stage::Applied,
        &ColumnFilter::default(),
        Some(SortOrder::Asc),
    );
    assert_eq!(ids(&ascending), vec![victor(), ursula(), wendy(), xavier()]);

    let unsorted = view_column(&records, &Stage::Applied, &ColumnFilter::default(), None);
    assert_eq!(ids(&unsorted), vec![ursula(), victor(), wendy(), xavier()]);
}

#[test]
fn sort_toggle_cycles_per_column() {
    let mut board = ColumnBoard::new();

    assert_eq!(board.toggle_sort(&Stage::Applied), SortOrder::Desc);
    assert_eq!(board.toggle_sort(&Stage::Applied), SortOrder::Asc);
    assert_eq!(board.toggle_sort(&Stage::Applied), SortOrder::Desc);

    assert_eq!(board.state(&Stage::Shortlisted), ColumnState::default());
    assert_eq!(board.state(&Stage::Applied).sort, Some(SortOrder::Desc));
}

#[test]
fn average_ignores_unscored_applicants() {
    let records = vec![
        scored(ursula(), Stage::Shortlisted, 80),
        scored(victor(), Stage::Shortlisted, 91),
        record(wendy(), Stage::Shortlisted),
        scored(xavier(), Stage::Applied, 10),
    ];

    assert_eq!(average_fit_score(&records, &Stage::Shortlisted), 86);
    assert_eq!(average_fit_score(&records, &Stage::Hired), 0);
    let unscored = [record(wendy(), Stage::Applied)];
    assert_eq!(average_fit_score(&unscored, &Stage::Applied), 0);
}

#[test]
fn column_view_reports_header_counts() {
    let mut reviewed = scored(ursula(), Stage::Applied, 92);
    reviewed.has_been_reviewed = true;
    let harness = harness(vec![
        reviewed,
        scored(victor(), Stage::Applied, 40),
        record(wendy(), Stage::Applied),
    ]);
    harness
        .service
        .set_filter(
            &job_id(),
            &Stage::Applied,
            ColumnFilter {
                min_score: Some(50),
                required_skills: Vec::new(),
            },
        )
        .expect("filter accepted");

    let column = harness
        .service
        .column(&job_id(), &Stage::Applied)
        .expect("column renders");

    assert_eq!(column.total, 3);
    assert_eq!(column.applicants.len(), 1);
    assert_eq!(column.applicants[0].user_id, ursula());
    assert_eq!(column.average_fit_score, 66);
    assert_eq!(column.unreviewed, 2);
    assert_eq!(column.active_filters, 1);
    assert!(!column.terminal);
}

#[test]
fn filters_on_one_column_leave_others_alone() {
    let harness = harness(vec![
        scored(ursula(), Stage::Applied, 30),
        scored(victor(), Stage::Shortlisted, 30),
    ]);
    let filter = ColumnFilter {
        min_score: Some(90),
        required_skills: vec![" Rust ".to_string(), "rust".to_string(), "".to_string()],
    };

    let state = harness
        .service
        .set_filter(&job_id(), &Stage::Applied, filter)
        .expect("filter accepted");
    assert_eq!(state.filter.required_skills, vec!["Rust".to_string()]);

    let board = harness.service.board(&job_id()).expect("board renders");
    let applied = board
        .columns
        .iter()
        .find(|column| column.stage == Stage::Applied)
        .expect("applied column");
    let shortlisted = board
        .columns
        .iter()
        .find(|column| column.stage == Stage::Shortlisted)
        .expect("shortlisted column");
    assert!(applied.applicants.is_empty());
    assert_eq!(shortlisted.applicants.len(), 1);
    assert_eq!(board.columns.len(), 6);
    assert!(board.columns.last().is_some_and(|column| column.terminal));

    let cleared = harness
        .service
        .clear_filter(&job_id(), &Stage::Applied)
        .expect("filter cleared");
    assert!(!cleared.filter.is_active());
}

#[test]
fn filter_validation_rejects_out_of_range_scores_and_unknown_columns() {
    let harness = harness(Vec::new());

    assert!(matches!(
        harness.service.set_filter(
            &job_id(),
            &Stage::Applied,
            ColumnFilter {
                min_score: Some(101),
                required_skills: Vec::new(),
            },
        ),
        Err(PipelineError::InvalidFilter(_))
    ));
    assert!(matches!(
        harness
            .service
            .toggle_sort(&job_id(), &Stage::Interview("Take-home".to_string())),
        Err(PipelineError::Transition(TransitionError::UnknownStage(_)))
    ));
}

#[test]
fn zero_minimum_score_keeps_unscored_applicants_visible() {
    let harness = harness(vec![
        scored(ursula(), Stage::Applied, 70),
        record(victor(), Stage::Applied),
    ]);

    let state = harness
        .service
        .set_filter(
            &job_id(),
            &Stage::Applied,
            ColumnFilter {
                min_score: Some(0),
                required_skills: Vec::new(),
            },
        )
        .expect("filter accepted");
    assert_eq!(state.filter.min_score, None);

    let column = harness
        .service
        .column(&job_id(), &Stage::Applied)
        .expect("column renders");
    assert_eq!(column.applicants.len(), 2);
    assert_eq!(column.active_filters, 0);
}
