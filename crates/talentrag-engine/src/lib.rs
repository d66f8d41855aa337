//! Retrieval-augmented question answering and candidate screening on top of
//! the embedding, vector and language model crates.

pub mod context;
pub mod prompts;
pub mod questions;
pub mod resume;
pub mod retrieval;
pub mod scoring;
pub mod screening;
pub mod skills;

pub use context::{Engine, IngestReport};
pub use questions::template_questions;
pub use resume::{parse_resume_fallback, ParsedResume};
pub use retrieval::{build_context, cite_sources, FALLBACK_ANSWER};
pub use scoring::{final_score, score_from_similarity, similarity_score, skill_match};
pub use screening::{rank, RankedCandidate, ScreeningReport, SkippedCandidate};
pub use skills::{keyword_skills, SkillExtraction};
