//! Domain types shared by the retrieval and screening engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type DocumentId = String;
pub type ChunkId = String;
pub type Vector = Vec<f32>;

/// A source document as extracted at ingestion time. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub source_name: String,
    pub raw_text: String,
}

/// A word window of a document.
///
/// - `id`: `"{document_id}:{ordinal}"`
/// - `ordinal`: contiguous per document, starting at 0
/// - `word_count`: number of whitespace-separated words in `text`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub ordinal: usize,
    pub text: String,
    pub word_count: usize,
}

impl Chunk {
    pub fn make_id(document_id: &str, ordinal: usize) -> ChunkId {
        format!("{document_id}:{ordinal}")
    }
}

/// One vector in the index with a weak back-reference to its chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub chunk_id: ChunkId,
    pub vector: Vector,
}

/// A scored neighbor returned by the index. Lower distance is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk_id: ChunkId,
    pub distance: f32,
}

/// A chunk selected for a query, resolved back to its text and source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub chunk_text: String,
    pub source_name: String,
    pub distance: f32,
}

/// Result of a grounded question answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: BTreeSet<String>,
    pub experience_years: u32,
    pub raw_text: String,
}

/// What a job asks for, derived from its description.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    pub skills: BTreeSet<String>,
    pub raw_text: String,
}

/// Non-fatal conditions noticed while scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScreeningWarning {
    /// The requirement has no skills, so the skill signal is always 0.
    EmptyRequirementSkills,
    /// Skill extraction output was malformed and the keyword fallback was used.
    SkillFallbackUsed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub candidate_id: String,
    pub candidate_name: String,
    pub similarity_score: f64,
    pub skill_match_rate: f64,
    pub final_score: f64,
    pub shortlisted: bool,
    pub matched_skills: Vec<String>,
    pub warnings: Vec<ScreeningWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterviewQuestion {
    pub question: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}
