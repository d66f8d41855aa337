//! Candidate scoring: semantic similarity blended with skill coverage.
//!
//! `final = 0.6 * similarity + 0.4 * skill_match`, both on a 0..100 scale
//! and rounded to two decimals at each step.

use std::collections::{BTreeSet, HashSet};

use talentrag_core::config::NegativeSimilarity;
use talentrag_core::error::{Error, Result};
use talentrag_core::types::{Candidate, Requirement, ScoreResult, ScreeningWarning};
use talentrag_vector::index::cosine_similarity;

use crate::context::Engine;
use crate::resume::prefix_chars;

pub const SIMILARITY_WEIGHT: f64 = 0.6;
pub const SKILL_WEIGHT: f64 = 0.4;

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Cosine similarity scaled to percent, with the negative-value policy applied.
pub fn similarity_score(cosine: f32, policy: NegativeSimilarity) -> f64 {
    let score = round2(f64::from(cosine) * 100.0);
    match policy {
        NegativeSimilarity::Keep => score,
        NegativeSimilarity::Clamp => score.max(0.0),
    }
}

/// Percentage of required skills the candidate lists, compared
/// case-insensitively, plus the matched skills as the requirement spells them.
/// An empty requirement yields 0.
pub fn skill_match(candidate: &BTreeSet<String>, required: &BTreeSet<String>) -> (f64, Vec<String>) {
    let have: HashSet<String> = candidate.iter().map(|s| s.trim().to_lowercase()).collect();
    let mut seen = HashSet::new();
    let mut total = 0usize;
    let mut matched = Vec::new();
    for skill in required {
        let key = skill.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        total += 1;
        if have.contains(&key) {
            matched.push(skill.clone());
        }
    }
    if total == 0 {
        return (0.0, matched);
    }
    (round2(matched.len() as f64 / total as f64 * 100.0), matched)
}

pub fn final_score(similarity: f64, skill_match_rate: f64) -> f64 {
    round2(SIMILARITY_WEIGHT * similarity + SKILL_WEIGHT * skill_match_rate)
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(Error::InvalidInput(format!("threshold must be within [0, 100], got {threshold}")));
    }
    Ok(())
}

/// Assembles a [`ScoreResult`] from an already computed cosine similarity.
pub fn score_from_similarity(
    candidate: &Candidate,
    requirement: &Requirement,
    cosine: f32,
    threshold: f64,
    policy: NegativeSimilarity,
) -> ScoreResult {
    let similarity = similarity_score(cosine, policy);
    let (rate, matched) = skill_match(&candidate.skills, &requirement.skills);
    let mut warnings = Vec::new();
    if requirement.skills.iter().all(|s| s.trim().is_empty()) {
        warnings.push(ScreeningWarning::EmptyRequirementSkills);
    }
    let final_score = final_score(similarity, rate);
    ScoreResult {
        candidate_id: candidate.id.clone(),
        candidate_name: candidate.name.clone(),
        similarity_score: similarity,
        skill_match_rate: rate,
        final_score,
        shortlisted: final_score >= threshold,
        matched_skills: matched,
        warnings,
    }
}

impl Engine {
    /// Scores one candidate against a requirement.
    pub fn score(&self, candidate: &Candidate, requirement: &Requirement, threshold: f64) -> Result<ScoreResult> {
        validate_threshold(threshold)?;
        let job_vector = self.embed_requirement(requirement)?;
        self.score_against(candidate, requirement, &job_vector, threshold)
    }

    pub(crate) fn embed_requirement(&self, requirement: &Requirement) -> Result<Vec<f32>> {
        if requirement.raw_text.trim().is_empty() {
            return Err(Error::InvalidInput("requirement has no text".into()));
        }
        self.embed_cached(&requirement.raw_text)
    }

    pub(crate) fn score_against(
        &self,
        candidate: &Candidate,
        requirement: &Requirement,
        job_vector: &[f32],
        threshold: f64,
    ) -> Result<ScoreResult> {
        let text = prefix_chars(&candidate.raw_text, self.settings().screening.resume_chars);
        if text.trim().is_empty() {
            return Err(Error::ingestion(&candidate.id, "candidate has no text to score"));
        }
        let candidate_vector = self.embed_cached(text)?;
        let cosine = cosine_similarity(&candidate_vector, job_vector);
        let result = score_from_similarity(
            candidate,
            requirement,
            cosine,
            threshold,
            self.settings().screening.negative_similarity,
        );
        tracing::debug!(
            candidate = %candidate.id,
            similarity = result.similarity_score,
            skill_match = result.skill_match_rate,
            final_score = result.final_score,
            shortlisted = result.shortlisted,
            "candidate scored"
        );
        Ok(result)
    }
}
