use crate::infra::{build_service, HiringService, LoggingDispatcher, SeedData, SAMPLE_JOB_ID};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use talent_ai::config::AppConfig;
use talent_ai::error::AppError;
use talent_ai::workflows::hiring::{
    AiAnalysis, AiSuggestion, AnalysisMode, AnalysisRequest, BoardView, ComparisonAnalysis,
    ComparisonRequest, Confirmation, ExportKind, FeedbackRequest, FeedbackResolution,
    GatewayError, HeuristicInsightGateway, InsightGateway, JobId, ScheduledInterview, Stage,
    UserId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON seed file. Defaults to the built-in founding engineer job.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Job to walk through (defaults to the sample job)
    #[arg(long)]
    pub(crate) job: Option<String>,
    /// Interview date for the top applicant (YYYY-MM-DD). Defaults to three days from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) interview_date: Option<NaiveDate>,
    /// Simulate a rejection feedback outage for this applicant id
    #[arg(long)]
    pub(crate) fail_feedback_for: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Job whose applicants are exported
    #[arg(long, default_value = SAMPLE_JOB_ID)]
    pub(crate) job: String,
    /// quick (contacts as TSV) or full (analysis as CSV)
    #[arg(long, default_value = "full", value_parser = crate::infra::parse_export_kind)]
    pub(crate) kind: ExportKind,
    /// JSON seed file. Defaults to the built-in founding engineer job.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Write to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

/// Heuristic gateway that can simulate a feedback outage for one applicant.
struct DemoGateway {
    inner: HeuristicInsightGateway,
    feedback_offline_for: Option<UserId>,
}

#[async_trait]
impl InsightGateway for DemoGateway {
    async fn analyze_applicant(
        &self,
        request: AnalysisRequest,
    ) -> Result<AiAnalysis, GatewayError> {
        self.inner.analyze_applicant(request).await
    }

    async fn compare_applicants(
        &self,
        request: ComparisonRequest,
    ) -> Result<ComparisonAnalysis, GatewayError> {
        self.inner.compare_applicants(request).await
    }

    async fn generate_rejection_feedback(
        &self,
        request: FeedbackRequest,
    ) -> Result<String, GatewayError> {
        if self.feedback_offline_for.as_ref() == Some(&request.applicant.user_id) {
            return Err(GatewayError::Transport("simulated network failure".to_string()));
        }
        self.inner.generate_rejection_feedback(request).await
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed,
        job,
        interview_date,
        fail_feedback_for,
    } = args;

    let config = AppConfig::load()?;
    let seed = SeedData::load_or_sample(seed.as_deref())?;
    let dispatcher = Arc::new(LoggingDispatcher::default());
    let gateway = Arc::new(DemoGateway {
        inner: HeuristicInsightGateway::new(),
        feedback_offline_for: fail_feedback_for.as_deref().map(UserId::from),
    });
    let service = build_service(seed, gateway, dispatcher.clone(), config.pipeline)?;
    let job_id = JobId(job.unwrap_or_else(|| SAMPLE_JOB_ID.to_string()));

    let pipeline = service.pipeline(&job_id)?;
    println!("Hiring pipeline demo for {job_id}");
    println!("Stages: {}", pipeline.labels().join(" -> "));

    println!("\nAnalyzing applicants");
    for record in service.list(&job_id)? {
        match service
            .analyze_applicant(&job_id, &record.user_id, AnalysisMode::UseCache)
            .await
        {
            Ok(analyzed) => println!(
                "- {:<10} fit {:>3} | {} stars | suggestion {}",
                analyzed.user_id,
                analyzed.fit_score().unwrap_or_default(),
                analyzed.rating,
                suggestion_label(analyzed.ai_suggestion),
            ),
            Err(err) => println!("- {:<10} analysis failed: {err}", record.user_id),
        }
    }

    let applied = service.list(&job_id)?;
    let top = applied
        .iter()
        .filter(|record| record.status == Stage::Applied)
        .max_by_key(|record| record.fit_score().unwrap_or_default());
    if let Some(top) = top {
        let outcome = service.move_applicant(
            &job_id,
            &top.user_id,
            &Stage::Shortlisted,
            Confirmation::Unconfirmed,
        )?;
        println!("\nShortlisted {}", outcome.record.user_id);
        if let Some(draft) = outcome.message {
            println!("  sending \"{}\"", draft.subject);
            service.send_message(draft)?;
        }

        if let Some(round) = pipeline
            .stages
            .iter()
            .find(|stage| matches!(stage, Stage::Interview(_)))
        {
            let moved =
                service.move_applicant(&job_id, &top.user_id, round, Confirmation::Unconfirmed)?;
            let date = interview_date
                .unwrap_or_else(|| Local::now().date_naive() + Duration::days(3));
            let time = NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default();
            service.schedule_interview(
                &job_id,
                &top.user_id,
                ScheduledInterview {
                    date,
                    time,
                    interviewer_ids: vec![UserId::from("u-founder")],
                    video_link: None,
                },
            )?;
            println!("  moved to {} on {date} at {time}", moved.record.status);
        }
    }

    let low_fit: Vec<UserId> = service
        .list(&job_id)?
        .into_iter()
        .filter(|record| {
            record.status == Stage::Applied && record.ai_suggestion == Some(AiSuggestion::Reject)
        })
        .map(|record| record.user_id)
        .collect();
    if !low_fit.is_empty() {
        let mut report = service.bulk_move_applicants(
            &job_id,
            &low_fit,
            &Stage::Rejected,
            Confirmation::Confirmed,
        )?;
        println!("\nRejected {} low-fit applicants", report.moved.len());
        for (user_id, resolution) in report.settle_feedback().await {
            let record = service.get(&job_id, &user_id)?;
            match resolution {
                FeedbackResolution::Failed { reason } => {
                    println!("- {user_id}: feedback unavailable ({reason})")
                }
                _ => println!(
                    "- {user_id}: {}",
                    record.ai_reasoning.as_deref().unwrap_or("(no feedback)")
                ),
            }
        }
    }

    let finalists: Vec<UserId> = service
        .list(&job_id)?
        .into_iter()
        .filter(|record| !record.status.is_rejected() && record.ai_analysis.is_some())
        .map(|record| record.user_id)
        .take(4)
        .collect();
    if finalists.len() >= 2 {
        let report = service.compare_applicants(&job_id, &finalists).await?;
        println!("\nComparison: {}", report.comparison.summary);
        println!(
            "Recommended {}: {}",
            report.comparison.recommendation.user_id, report.comparison.recommendation.reasoning
        );
    }

    render_board(&service.board(&job_id)?);
    println!("\nMessages dispatched: {}", dispatcher.sent().len());
    Ok(())
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        job,
        kind,
        seed,
        output,
    } = args;

    let config = AppConfig::load()?;
    let service: Arc<HiringService<HeuristicInsightGateway>> = build_service(
        SeedData::load_or_sample(seed.as_deref())?,
        Arc::new(HeuristicInsightGateway::new()),
        Arc::new(LoggingDispatcher::default()),
        config.pipeline,
    )?;

    let document = service.export_applicants(&JobId(job), &[], kind).await?;
    for failure in &document.failed_analyses {
        eprintln!(
            "warning: {} exported without analysis ({})",
            failure.user_id, failure.reason
        );
    }

    match output {
        Some(path) => {
            std::fs::write(&path, document.body)?;
            eprintln!("wrote {} rows to {}", document.rows, path.display());
        }
        None => print!("{}", document.body),
    }
    Ok(())
}

fn suggestion_label(suggestion: Option<AiSuggestion>) -> &'static str {
    match suggestion {
        Some(AiSuggestion::Shortlist) => "shortlist",
        Some(AiSuggestion::Reject) => "reject",
        None => "none",
    }
}

fn render_board(board: &BoardView) {
    println!("\nBoard for {}", board.title);
    for column in &board.columns {
        let marker = if column.terminal { " (terminal)" } else { "" };
        println!(
            "{}{marker}: {} applicants, avg fit {}, {} unreviewed",
            column.stage, column.total, column.average_fit_score, column.unreviewed
        );
        for card in &column.applicants {
            let interview = if card.interview_scheduled { " [interview booked]" } else { "" };
            println!(
                "  - {} fit {} rating {}{interview}",
                card.user_id,
                card.fit_score
                    .map(|score| score.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                card.rating
            );
        }
    }
}
