//! Batch screening: score every candidate, keep going past per-candidate
//! failures, and rank the survivors.

use serde::Serialize;

use talentrag_core::cancel::CancelFlag;
use talentrag_core::data_processor::{DocumentExtractor, SourceFile};
use talentrag_core::error::{Error, Result};
use talentrag_core::traits::TextExtractor;
use talentrag_core::types::{Candidate, Requirement, ScoreResult, ScreeningWarning};

use crate::context::Engine;
use crate::scoring::validate_threshold;

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub score: ScoreResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedCandidate {
    pub candidate_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningReport {
    pub requirement: Requirement,
    /// Best first. Equal final scores keep input order.
    pub results: Vec<RankedCandidate>,
    pub skipped: Vec<SkippedCandidate>,
    /// Run-level warnings, e.g. the skill fallback was used for the job.
    pub warnings: Vec<ScreeningWarning>,
}

impl ScreeningReport {
    pub fn shortlisted(&self) -> impl Iterator<Item = &RankedCandidate> {
        self.results.iter().filter(|r| r.score.shortlisted)
    }
}

/// Sorts by final score, highest first. The sort is stable, so ties keep
/// their input order.
pub fn rank(results: &mut [RankedCandidate]) {
    results.sort_by(|a, b| b.score.final_score.total_cmp(&a.score.final_score));
}

impl Engine {
    /// Scores `candidates` against `requirement`. Candidates that cannot be
    /// scored are listed in `skipped`; cancellation is checked between
    /// candidates.
    pub fn screen(
        &self,
        candidates: &[Candidate],
        requirement: &Requirement,
        threshold: f64,
        cancel: &CancelFlag,
    ) -> Result<ScreeningReport> {
        validate_threshold(threshold)?;
        let job_vector = self.embed_requirement(requirement)?;
        let mut warnings = Vec::new();
        if requirement.skills.is_empty() {
            tracing::warn!("requirement lists no skills, skill match will be 0 for everyone");
            warnings.push(ScreeningWarning::EmptyRequirementSkills);
        }

        let mut results = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();
        for (i, candidate) in candidates.iter().enumerate() {
            cancel.check()?;
            tracing::info!(candidate = %candidate.id, "screening {}/{}", i + 1, candidates.len());
            match self.score_against(candidate, requirement, &job_vector, threshold) {
                Ok(score) => results.push(RankedCandidate { candidate: candidate.clone(), score }),
                Err(e) => {
                    tracing::warn!(candidate = %candidate.id, error = %e, "skipping candidate");
                    skipped.push(SkippedCandidate { candidate_id: candidate.id.clone(), reason: e.to_string() });
                }
            }
        }
        rank(&mut results);
        self.cache().flush()?;
        tracing::info!(
            scored = results.len(),
            skipped = skipped.len(),
            shortlisted = results.iter().filter(|r| r.score.shortlisted).count(),
            "screening finished"
        );
        Ok(ScreeningReport { requirement: requirement.clone(), results, skipped, warnings })
    }

    /// Full pipeline from raw files: derive the requirement from `job_text`,
    /// parse each resume, then [`Engine::screen`].
    pub async fn screen_resumes(
        &self,
        job_text: &str,
        resumes: &[SourceFile],
        threshold: f64,
        cancel: &CancelFlag,
    ) -> Result<ScreeningReport> {
        self.screen_resumes_with(job_text, resumes, &DocumentExtractor, threshold, cancel).await
    }

    pub async fn screen_resumes_with(
        &self,
        job_text: &str,
        resumes: &[SourceFile],
        extractor: &dyn TextExtractor,
        threshold: f64,
        cancel: &CancelFlag,
    ) -> Result<ScreeningReport> {
        validate_threshold(threshold)?;
        let (requirement, mut warnings) = self.requirement_from_job(job_text).await?;
        tracing::info!(skills = ?requirement.skills, "requirement extracted");

        let mut candidates = Vec::with_capacity(resumes.len());
        let mut skipped = Vec::new();
        for resume in resumes {
            cancel.check()?;
            let text = extractor.extract_text(&resume.name, &resume.bytes);
            match self.parse_resume(&resume.name, &text).await {
                Ok(parsed) => candidates.push(parsed.candidate),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::warn!(resume = %resume.name, error = %e, "skipping resume");
                    skipped.push(SkippedCandidate { candidate_id: resume.name.clone(), reason: e.to_string() });
                }
            }
        }

        let mut report = self.screen(&candidates, &requirement, threshold, cancel)?;
        skipped.append(&mut report.skipped);
        report.skipped = skipped;
        for w in report.warnings.drain(..) {
            if !warnings.contains(&w) {
                warnings.push(w);
            }
        }
        report.warnings = warnings;
        Ok(report)
    }
}
