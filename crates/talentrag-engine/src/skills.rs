//! Skill extraction from job descriptions, with a keyword fallback.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use talentrag_core::error::{Error, Result};
use talentrag_core::types::{Requirement, ScreeningWarning};
use talentrag_llm::parse_structured;

use crate::context::Engine;
use crate::prompts;

/// Keywords recognised when the model's skill list cannot be used.
pub const SKILL_VOCABULARY: &[&str] = &[
    "Python", "Java", "JavaScript", "TypeScript", "C++", "C#", "Go", "Rust", "Ruby", "PHP", "Kotlin", "Swift",
    "Scala", "R", "SQL", "NoSQL", "HTML", "CSS", "React", "Angular", "Vue", "Node.js", "Django", "Flask",
    "FastAPI", "Spring", "Spring Boot", ".NET", "GraphQL", "REST", "PostgreSQL", "MySQL", "MongoDB", "Redis",
    "Elasticsearch", "Kafka", "Spark", "Hadoop", "Airflow", "AWS", "Azure", "GCP", "Docker", "Kubernetes",
    "Terraform", "Ansible", "Jenkins", "CI/CD", "Git", "Linux", "Machine Learning", "Deep Learning", "NLP",
    "Computer Vision", "TensorFlow", "PyTorch", "scikit-learn", "Pandas", "NumPy", "Tableau", "Power BI",
    "Excel", "Agile", "Scrum", "Microservices",
];

/// Entries that double as ordinary words or letters. They only count when
/// written as listed skills: exact case, next to a list separator.
const AMBIGUOUS_SKILLS: &[&str] = &["Go", "R"];

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9.#+/&_-]+").expect("token pattern is valid"));

/// Tokens of `text` with their byte offsets, trailing punctuation trimmed.
fn spans(text: &str) -> Vec<(usize, &str)> {
    TOKEN
        .find_iter(text)
        .map(|m| (m.start(), m.as_str().trim_end_matches(['.', ',', '/', '-', '&'])))
        .filter(|(_, t)| !t.is_empty())
        .collect()
}

fn tokens(text: &str) -> Vec<String> {
    spans(text).into_iter().map(|(_, t)| t.to_lowercase()).collect()
}

/// `text[start..end]` sits in a list: after `,` `;` `(` `:` or "and"/"or",
/// or before `,` `;` `)`.
fn in_skill_list(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].trim_end();
    let after = text[end..].trim_start();
    before.ends_with([',', ';', '(', ':'])
        || after.starts_with([',', ';', ')'])
        || before
            .split_whitespace()
            .next_back()
            .is_some_and(|w| w.eq_ignore_ascii_case("and") || w.eq_ignore_ascii_case("or"))
}

/// Vocabulary entries that occur in `text` as whole tokens (case-insensitive),
/// in vocabulary order.
pub fn keyword_skills(text: &str) -> Vec<String> {
    let spans = spans(text);
    let toks: Vec<String> = spans.iter().map(|(_, t)| t.to_lowercase()).collect();
    SKILL_VOCABULARY
        .iter()
        .filter(|skill| {
            if AMBIGUOUS_SKILLS.contains(*skill) {
                return spans.iter().any(|&(start, tok)| tok == **skill && in_skill_list(text, start, start + tok.len()));
            }
            let words = tokens(skill);
            !words.is_empty() && toks.windows(words.len()).any(|w| w == words.as_slice())
        })
        .map(|s| s.to_string())
        .collect()
}

/// Skills found for a job description and whether the keyword fallback was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillExtraction {
    pub skills: Vec<String>,
    pub fallback_used: bool,
}

impl Engine {
    /// Asks the model for the job's required skills as a JSON array.
    ///
    /// Malformed replies fall back to [`keyword_skills`]; provider failures
    /// are returned to the caller.
    pub async fn extract_required_skills(&self, job_text: &str) -> Result<SkillExtraction> {
        let reply = self.llm().complete(None, &prompts::required_skills(job_text), prompts::SKILLS_PARAMS).await?;
        match parse_structured::<Vec<String>>(&reply) {
            Ok(skills) => {
                let skills: Vec<String> =
                    skills.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
                tracing::debug!(count = skills.len(), "required skills extracted");
                Ok(SkillExtraction { skills, fallback_used: false })
            }
            Err(Error::SkillParse(reason)) => {
                tracing::warn!(%reason, "skill list was not a JSON array of strings, using keyword fallback");
                Ok(SkillExtraction { skills: keyword_skills(job_text), fallback_used: true })
            }
            Err(e) => Err(e),
        }
    }

    /// Builds the requirement for a job description plus any warnings raised
    /// while doing so.
    pub async fn requirement_from_job(&self, job_text: &str) -> Result<(Requirement, Vec<ScreeningWarning>)> {
        if job_text.trim().is_empty() {
            return Err(Error::InvalidInput("job description is empty".into()));
        }
        let extraction = self.extract_required_skills(job_text).await?;
        let mut warnings = Vec::new();
        if extraction.fallback_used {
            warnings.push(ScreeningWarning::SkillFallbackUsed);
        }
        let skills: BTreeSet<String> = extraction.skills.into_iter().collect();
        Ok((Requirement { skills, raw_text: job_text.to_string() }, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_match_whole_tokens_case_insensitively() {
        let found = keyword_skills("We need python, Node.js and AWS. Experience with machine learning is a plus.");
        assert_eq!(found, vec!["Python", "Node.js", "AWS", "Machine Learning"]);
    }

    #[test]
    fn partial_words_do_not_match() {
        assert!(keyword_skills("Gopher mascots and rusty javascripting").is_empty());
    }

    #[test]
    fn symbols_in_skill_names_are_kept() {
        assert_eq!(keyword_skills("C++ and C# developers, CI/CD pipelines"), vec!["C++", "C#", "CI/CD"]);
    }

    #[test]
    fn ampersand_words_and_everyday_phrases_are_not_skills() {
        assert!(keyword_skills("Led the R&D group. Ready to go live with Excel-free reporting.").is_empty());
        assert!(keyword_skills("Go live in March").is_empty());
    }

    #[test]
    fn short_skills_count_when_listed() {
        assert_eq!(keyword_skills("Stack: Python, Go and R."), vec!["Python", "Go", "R"]);
        assert_eq!(keyword_skills("Go, Kafka (R) or Rust"), vec!["Go", "Rust", "R", "Kafka"]);
    }
}
