//! Process-local store and directory backing the service and demos.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{ApplicantRecord, CandidateProfile, JobId, JobPosting, UserId};
use super::repository::{ApplicantPatch, ApplicantRepository, RepositoryError, TalentDirectory};

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("store lock poisoned".to_string())
}

/// Applicant records grouped per job, kept in application order.
#[derive(Default, Clone)]
pub struct InMemoryApplicantStore {
    records: Arc<Mutex<HashMap<JobId, Vec<ApplicantRecord>>>>,
}

impl InMemoryApplicantStore {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<JobId, Vec<ApplicantRecord>>>, RepositoryError> {
        self.records.lock().map_err(poisoned)
    }
}

impl ApplicantRepository for InMemoryApplicantStore {
    fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let column = guard.entry(record.job_id.clone()).or_default();
        if column.iter().any(|existing| existing.user_id == record.user_id) {
            return Err(RepositoryError::Conflict);
        }
        column.push(record.clone());
        Ok(record)
    }

    fn fetch(
        &self,
        job_id: &JobId,
        user_id: &UserId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .get(job_id)
            .and_then(|records| records.iter().find(|record| &record.user_id == user_id))
            .cloned())
    }

    fn list(&self, job_id: &JobId) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(job_id).cloned().unwrap_or_default())
    }

    fn update(
        &self,
        job_id: &JobId,
        user_id: &UserId,
        patch: &ApplicantPatch,
    ) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let record = guard
            .get_mut(job_id)
            .and_then(|records| records.iter_mut().find(|record| &record.user_id == user_id))
            .ok_or(RepositoryError::NotFound)?;
        patch.apply(record)?;
        Ok(record.clone())
    }
}

/// Directory seeded up front with jobs and candidate profiles.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    jobs: Arc<Mutex<HashMap<JobId, JobPosting>>>,
    candidates: Arc<Mutex<HashMap<UserId, CandidateProfile>>>,
}

impl InMemoryDirectory {
    pub fn with_job(self, job: JobPosting) -> Self {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(job.id.clone(), job);
        }
        self
    }

    pub fn with_candidate(self, candidate: CandidateProfile) -> Self {
        if let Ok(mut candidates) = self.candidates.lock() {
            candidates.insert(candidate.user_id.clone(), candidate);
        }
        self
    }
}

impl TalentDirectory for InMemoryDirectory {
    fn job(&self, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        let jobs = self.jobs.lock().map_err(poisoned)?;
        Ok(jobs.get(job_id).cloned())
    }

    fn candidate(&self, user_id: &UserId) -> Result<Option<CandidateProfile>, RepositoryError> {
        let candidates = self.candidates.lock().map_err(poisoned)?;
        Ok(candidates.get(user_id).cloned())
    }
}
