use super::common::*;
use crate::workflows::hiring::columns::ColumnFilter;
use crate::workflows::hiring::domain::Stage;
use crate::workflows::hiring::selection::{SelectAllOutcome, SelectionSet};
use crate::workflows::hiring::transitions::Confirmation;

#[test]
fn select_all_selects_then_deselects() {
    let mut selection = SelectionSet::new(job_id());
    let column = [ursula(), victor(), wendy()];

    assert_eq!(selection.select_all(&column), SelectAllOutcome::Selected);
    assert!(selection.all_selected(&column));
    assert_eq!(selection.len(), 3);

    assert_eq!(selection.select_all(&column), SelectAllOutcome::Deselected);
    assert!(selection.is_empty());
}

#[test]
fn partial_selection_is_completed_by_select_all() {
    let mut selection = SelectionSet::new(job_id());
    let column = [ursula(), victor()];
    assert!(selection.toggle(&ursula()));

    assert!(!selection.all_selected(&column));
    assert_eq!(selection.select_all(&column), SelectAllOutcome::Selected);
    assert!(selection.all_selected(&column));

    assert!(!selection.toggle(&victor()));
    assert!(!selection.all_selected(&column));
    assert!(selection.is_selected(&ursula()));
}

#[test]
fn empty_columns_never_count_as_all_selected() {
    let selection = SelectionSet::new(job_id());
    assert!(!selection.all_selected(&[]));
    assert_eq!(selection.job_id(), &job_id());
}

#[test]
fn select_all_is_scoped_to_visible_applicants() {
    let harness = harness(vec![
        scored(ursula(), Stage::Applied, 90),
        scored(victor(), Stage::Applied, 20),
        scored(wendy(), Stage::Shortlisted, 70),
    ]);
    harness
        .service
        .toggle_selection(&job_id(), &wendy())
        .expect("toggle succeeds");
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

    let outcome = harness
        .service
        .select_all(&job_id(), &Stage::Applied)
        .expect("select all succeeds");

    assert_eq!(outcome, SelectAllOutcome::Selected);
    assert_eq!(
        harness.service.selection(&job_id()).expect("selection"),
        vec![ursula(), wendy()]
    );
    let column = harness
        .service
        .column(&job_id(), &Stage::Applied)
        .expect("column renders");
    assert!(column.all_selected);
    assert!(column.applicants[0].selected);
}

#[test]
fn bulk_moving_the_selection_clears_it() {
    let harness = harness(vec![
        record(ursula(), Stage::Applied),
        record(victor(), Stage::Applied),
        record(wendy(), Stage::Applied),
    ]);
    for user_id in [ursula(), wendy()] {
        harness
            .service
            .toggle_selection(&job_id(), &user_id)
            .expect("toggle succeeds");
    }

    let report = harness
        .service
        .bulk_move_selected(&job_id(), &Stage::Shortlisted, Confirmation::Unconfirmed)
        .expect("bulk move succeeds");

    assert_eq!(report.moved.len(), 2);
    assert_eq!(harness.stored(&ursula()).status, Stage::Shortlisted);
    assert_eq!(harness.stored(&victor()).status, Stage::Applied);
    assert_eq!(harness.stored(&wendy()).status, Stage::Shortlisted);
    assert!(harness
        .service
        .selection(&job_id())
        .expect("selection")
        .is_empty());
}

#[test]
fn selection_survives_a_refused_bulk_move() {
    let harness = harness(vec![record(ursula(), Stage::Applied)]);
    harness
        .service
        .toggle_selection(&job_id(), &ursula())
        .expect("toggle succeeds");

    assert!(harness
        .service
        .bulk_move_selected(&job_id(), &Stage::Rejected, Confirmation::Unconfirmed)
        .is_err());

    assert_eq!(
        harness.service.selection(&job_id()).expect("selection"),
        vec![ursula()]
    );
    harness
        .service
        .clear_selection(&job_id())
        .expect("clear succeeds");
    assert!(harness
        .service
        .selection(&job_id())
        .expect("selection")
        .is_empty());
}
