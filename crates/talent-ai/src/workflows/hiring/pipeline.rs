use serde::Serialize;

use super::domain::{JobPosting, Stage};

/// Ordered pipeline for a job: `Applied`, `Shortlisted`, each interview round, `Hired`.
pub fn resolve_pipeline(job: &JobPosting) -> Vec<Stage> {
    let mut stages = Vec::with_capacity(job.interview_rounds.len() + 3);
    stages.push(Stage::Applied);
    stages.push(Stage::Shortlisted);
    stages.extend(
        job.interview_rounds
            .iter()
            .map(|round| Stage::Interview(round.name.clone())),
    );
    stages.push(Stage::Hired);
    stages
}

/// Stages rendered apart from the ordered pipeline.
pub fn resolve_terminal_stages(_job: &JobPosting) -> Vec<Stage> {
    vec![Stage::Rejected]
}

/// Resolved stage layout for one job, used to validate statuses and lay out the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub terminal: Vec<Stage>,
}

impl Pipeline {
    pub fn resolve(job: &JobPosting) -> Self {
        Self {
            stages: resolve_pipeline(job),
            terminal: resolve_terminal_stages(job),
        }
    }

    /// True when `stage` is a pipeline entry or a terminal group.
    pub fn accepts(&self, stage: &Stage) -> bool {
        self.stages.contains(stage) || self.terminal.contains(stage)
    }

    /// Every column in display order, pipeline first.
    pub fn columns(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter().chain(self.terminal.iter())
    }

    pub fn labels(&self) -> Vec<String> {
        self.stages.iter().map(|stage| stage.to_string()).collect()
    }
}
