use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::columns::ColumnFilter;
use super::domain::{JobId, ScheduledInterview, Stage, UserId};
use super::export::ExportKind;
use super::gateway::InsightGateway;
use super::notifications::{MessageDraft, NotificationDispatcher};
use super::repository::{ApplicantRepository, TalentDirectory};
use super::service::{AnalysisMode, DropPayload, HiringPipelineService, PipelineError};
use super::transitions::Confirmation;

type Service<R, D, G, N> = State<Arc<HiringPipelineService<R, D, G, N>>>;

/// Router builder exposing the applicant board and pipeline actions for one job.
pub fn hiring_router<R, D, G, N>(service: Arc<HiringPipelineService<R, D, G, N>>) -> Router
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/jobs/:job_id/pipeline",
            get(pipeline_handler::<R, D, G, N>),
        )
        .route("/api/v1/jobs/:job_id/board", get(board_handler::<R, D, G, N>))
        .route(
            "/api/v1/jobs/:job_id/applicants",
            get(list_handler::<R, D, G, N>).post(register_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/applicants/:user_id",
            get(applicant_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/applicants/:user_id/move",
            post(move_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/applicants/:user_id/rating",
            post(rate_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/applicants/:user_id/review",
            post(review_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/applicants/:user_id/interview",
            put(schedule_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/applicants/:user_id/analysis",
            post(analyze_handler::<R, D, G, N>).delete(abandon_analysis_handler::<R, D, G, N>),
        )
        .route("/api/v1/jobs/:job_id/drop", post(drop_handler::<R, D, G, N>))
        .route(
            "/api/v1/jobs/:job_id/bulk-move",
            post(bulk_move_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/compare",
            post(compare_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/export",
            get(export_all_handler::<R, D, G, N>).post(export_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/messages",
            post(send_message_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/broadcast",
            post(broadcast_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/columns/:stage",
            get(column_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/columns/:stage/sort",
            post(sort_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/columns/:stage/filter",
            put(set_filter_handler::<R, D, G, N>).delete(clear_filter_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/columns/:stage/select-all",
            post(select_all_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/selection",
            get(selection_handler::<R, D, G, N>).delete(clear_selection_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/selection/:user_id",
            post(toggle_selection_handler::<R, D, G, N>),
        )
        .with_state(service)
}

fn failure(error: PipelineError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "code": error.code(),
    });
    (error.status_code(), axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, PipelineError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => failure(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoveRequest {
    pub(crate) stage: Stage,
    #[serde(default)]
    pub(crate) confirm: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DropRequest {
    #[serde(flatten)]
    pub(crate) payload: DropPayload,
    #[serde(default)]
    pub(crate) confirm: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkMoveRequest {
    /// Omitted to move the job's current selection.
    #[serde(default)]
    pub(crate) user_ids: Option<Vec<UserId>>,
    pub(crate) stage: Stage,
    #[serde(default)]
    pub(crate) confirm: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RatingRequest {
    pub(crate) rating: u8,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnalyzeRequest {
    #[serde(default)]
    pub(crate) force: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompareRequest {
    pub(crate) user_ids: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportRequest {
    #[serde(default)]
    pub(crate) user_ids: Vec<UserId>,
    #[serde(default)]
    pub(crate) kind: ExportKind,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    pub(crate) kind: ExportKind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BroadcastRequest {
    pub(crate) user_ids: Vec<UserId>,
    pub(crate) subject: String,
    pub(crate) body: String,
}

pub(crate) async fn pipeline_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let job_id = JobId(job_id);
    match service.pipeline(&job_id) {
        Ok(pipeline) => {
            let payload = json!({
                "job_id": job_id,
                "stages": pipeline.stages,
                "terminal": pipeline.terminal,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn board_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.board(&JobId(job_id)))
}

pub(crate) async fn list_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.list(&JobId(job_id)))
}

pub(crate) async fn register_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<RegisterRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.register_applicant(&JobId(job_id), &request.user_id) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(PipelineError::AlreadyApplied(user_id)) => {
            let payload = json!({
                "error": "applicant already exists",
                "user_id": user_id,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn applicant_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.get(&JobId(job_id), &UserId(user_id)))
}

pub(crate) async fn move_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<MoveRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let outcome = service.move_applicant(
        &JobId(job_id),
        &UserId(user_id),
        &request.stage,
        Confirmation::from(request.confirm),
    );
    respond(StatusCode::OK, outcome.map(|outcome| outcome.view()))
}

pub(crate) async fn drop_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<DropRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    if request.payload.job_id.0 != job_id {
        let payload = json!({
            "error": format!(
                "drop payload targets job {} but was sent to job {}",
                request.payload.job_id, job_id
            ),
            "code": "invalid_request",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    let outcome = service.drop_applicant(&request.payload, Confirmation::from(request.confirm));
    respond(StatusCode::OK, outcome.map(|outcome| outcome.view()))
}

pub(crate) async fn bulk_move_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<BulkMoveRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let job_id = JobId(job_id);
    let confirmation = Confirmation::from(request.confirm);
    let report = match request.user_ids {
        Some(user_ids) => {
            service.bulk_move_applicants(&job_id, &user_ids, &request.stage, confirmation)
        }
        None => service.bulk_move_selected(&job_id, &request.stage, confirmation),
    };
    respond(StatusCode::OK, report.map(|report| report.view()))
}

pub(crate) async fn rate_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<RatingRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.rate_applicant(&JobId(job_id), &UserId(user_id), request.rating),
    )
}

pub(crate) async fn review_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.mark_reviewed(&JobId(job_id), &UserId(user_id)),
    )
}

pub(crate) async fn schedule_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
    axum::Json(interview): axum::Json<ScheduledInterview>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.schedule_interview(&JobId(job_id), &UserId(user_id), interview),
    )
}

pub(crate) async fn analyze_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
    request: Option<axum::Json<AnalyzeRequest>>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let force = request.map(|axum::Json(body)| body.force).unwrap_or(false);
    let result = service
        .analyze_applicant(&JobId(job_id), &UserId(user_id), AnalysisMode::from(force))
        .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn abandon_analysis_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.abandon_analysis(&JobId(job_id), &UserId(user_id)),
    )
}

pub(crate) async fn compare_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<CompareRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let result = service
        .compare_applicants(&JobId(job_id), &request.user_ids)
        .await;
    respond(StatusCode::OK, result)
}

async fn export_response<R, D, G, N>(
    service: &HiringPipelineService<R, D, G, N>,
    job_id: JobId,
    user_ids: &[UserId],
    kind: ExportKind,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.export_applicants(&job_id, user_ids, kind).await {
        Ok(document) => {
            let content_type = match document.kind {
                ExportKind::Quick => "text/tab-separated-values; charset=utf-8",
                ExportKind::Full => "text/csv; charset=utf-8",
            };
            let disposition = format!("attachment; filename=\"{}\"", document.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.body,
            )
                .into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn export_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<ExportRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    export_response(&service, JobId(job_id), &request.user_ids, request.kind).await
}

pub(crate) async fn export_all_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    export_response(&service, JobId(job_id), &[], query.kind).await
}

pub(crate) async fn send_message_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    axum::Json(draft): axum::Json<MessageDraft>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    if draft.job_id.0 != job_id {
        let payload = json!({
            "error": "message draft belongs to a different job",
            "code": "invalid_request",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    let recipient = draft.recipient.clone();
    match service.send_message(draft) {
        Ok(()) => {
            let payload = json!({ "status": "sent", "recipient": recipient });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn broadcast_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<BroadcastRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.broadcast_message(
            &JobId(job_id),
            &request.user_ids,
            &request.subject,
            &request.body,
        ),
    )
}

pub(crate) async fn column_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, stage)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.column(&JobId(job_id), &Stage::from_label(&stage)),
    )
}

pub(crate) async fn sort_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, stage)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let stage = Stage::from_label(&stage);
    match service.toggle_sort(&JobId(job_id), &stage) {
        Ok(order) => {
            let payload = json!({ "stage": stage, "sort": order });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn set_filter_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, stage)): Path<(String, String)>,
    axum::Json(filter): axum::Json<ColumnFilter>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.set_filter(&JobId(job_id), &Stage::from_label(&stage), filter),
    )
}

pub(crate) async fn clear_filter_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, stage)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.clear_filter(&JobId(job_id), &Stage::from_label(&stage)),
    )
}

pub(crate) async fn select_all_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, stage)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let job_id = JobId(job_id);
    let outcome = service
        .select_all(&job_id, &Stage::from_label(&stage))
        .and_then(|outcome| {
            service
                .selection(&job_id)
                .map(|selected| json!({ "outcome": outcome, "selected": selected }))
        });
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn selection_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let selected = service
        .selection(&JobId(job_id))
        .map(|selected| json!({ "selected": selected }));
    respond(StatusCode::OK, selected)
}

pub(crate) async fn clear_selection_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path(job_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.clear_selection(&JobId(job_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn toggle_selection_handler<R, D, G, N>(
    State(service): Service<R, D, G, N>,
    Path((job_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: TalentDirectory + 'static,
    G: InsightGateway + 'static,
    N: NotificationDispatcher + 'static,
{
    let user_id = UserId(user_id);
    match service.toggle_selection(&JobId(job_id), &user_id) {
        Ok(selected) => {
            let payload = json!({ "user_id": user_id, "selected": selected });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => failure(error),
    }
}
