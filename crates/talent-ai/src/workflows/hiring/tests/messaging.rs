use super::common::*;
use crate::config::PipelineConfig;
use crate::workflows::hiring::domain::Stage;
use crate::workflows::hiring::notifications::{
    template_for, MessageContext, MessageDraft, MessageTemplate,
};
use crate::workflows::hiring::service::PipelineError;
use crate::workflows::hiring::transitions::Confirmation;

#[test]
fn templates_exist_for_forward_stages_only() {
    let job = job();

    assert!(template_for(&job, &Stage::Shortlisted).is_some());
    assert!(template_for(&job, &technical_interview()).is_some());
    assert!(template_for(&job, &Stage::Hired).is_some());
    assert!(template_for(&job, &Stage::Applied).is_none());
    assert!(template_for(&job, &Stage::Rejected).is_none());
    assert!(template_for(&job, &Stage::Interview("Take-home".to_string())).is_none());
}

#[test]
fn round_templates_include_the_round_description() {
    let template = template_for(&job(), &technical_interview()).expect("round template");
    let context = MessageContext {
        applicant_name: "Wendy".to_string(),
        job_title: "Founding Engineer".to_string(),
        company_name: "Acme Labs".to_string(),
        recruiter_name: "Dana".to_string(),
    };

    let (subject, body) = template.render(&context);

    assert_eq!(subject, "Next Steps: Technical Interview for Founding Engineer");
    assert!(body.contains("Technical Interview stage for the Founding Engineer position at Acme Labs. Pair on a small service."));
    assert!(body.ends_with("Dana"));
    assert!(!body.contains('{'));
}

#[test]
fn sending_a_draft_dispatches_it() {
    let harness = harness(vec![record(ursula(), Stage::Applied)]);
    let draft = harness
        .service
        .move_applicant(&job_id(), &ursula(), &Stage::Shortlisted, Confirmation::Unconfirmed)
        .expect("move succeeds")
        .message
        .expect("draft offered");

    harness
        .service
        .send_message(draft.clone())
        .expect("send succeeds");

    assert_eq!(harness.dispatcher.sent(), vec![draft]);
}

#[test]
fn blank_messages_are_refused() {
    let harness = harness(vec![record(ursula(), Stage::Applied)]);
    let draft = MessageDraft {
        job_id: job_id(),
        recipient: ursula(),
        stage: None,
        subject: "Hello".to_string(),
        body: "  \n".to_string(),
    };

    assert!(matches!(
        harness.service.send_message(draft),
        Err(PipelineError::EmptyMessage)
    ));
    assert!(harness.dispatcher.sent().is_empty());
}

#[test]
fn dispatch_failures_are_reported() {
    let harness = harness_with(
        ScriptedGateway::default(),
        MemoryDispatcher::unreachable(victor()),
        PipelineConfig::default(),
        vec![record(victor(), Stage::Applied)],
    );
    let draft = MessageDraft {
        job_id: job_id(),
        recipient: victor(),
        stage: None,
        subject: "Checking in".to_string(),
        body: "Are you still interested?".to_string(),
    };

    let error = harness
        .service
        .send_message(draft)
        .expect_err("recipient unreachable");

    assert!(matches!(error, PipelineError::Dispatch(_)));
    assert_eq!(error.code(), "dispatch_failed");
}

#[test]
fn broadcasts_personalize_and_report_each_recipient() {
    let config = PipelineConfig {
        recruiter_name: "Dana".to_string(),
        ..PipelineConfig::default()
    };
    let harness = harness_with(
        ScriptedGateway::default(),
        MemoryDispatcher::unreachable(victor()),
        config,
        vec![
            record(ursula(), Stage::Shortlisted),
            record(victor(), Stage::Shortlisted),
            record(wendy(), Stage::Shortlisted),
        ],
    );
    let template = MessageTemplate::new(
        "{jobTitle} update",
        "Hi {applicantName}, thanks for your patience. {recruiterName}",
    );

    let report = harness
        .service
        .broadcast_message(
            &job_id(),
            &[ursula(), victor(), wendy()],
            &template.subject,
            &template.body,
        )
        .expect("broadcast runs");

    assert_eq!(report.sent, vec![ursula(), wendy()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].user_id, victor());

    let sent = harness.dispatcher.sent();
    assert_eq!(sent[0].subject, "Founding Engineer update");
    assert_eq!(sent[0].body, "Hi Ursula, thanks for your patience. Dana");
    assert_eq!(sent[1].body, "Hi Wendy, thanks for your patience. Dana");
    assert!(sent.iter().all(|draft| draft.stage.is_none()));
}
