//! Resume parsing: model-extracted fields with a deterministic regex fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use talentrag_core::error::{Error, Result};
use talentrag_core::types::Candidate;
use talentrag_llm::parse_structured;

use crate::context::Engine;
use crate::prompts;
use crate::skills::keyword_skills;

/// Only this many leading characters are sent to the model.
const RESUME_PROMPT_CHARS: usize = 3000;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern is valid")
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").expect("phone pattern is valid")
});
static EXPERIENCE: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(\d+)\+?\s*years?\s+(?:of\s+)?experience").expect("experience pattern is valid"),
        Regex::new(r"(\d+)\+?\s*years?\s+in").expect("experience pattern is valid"),
    ]
});

/// Shape the model is asked to return.
#[derive(Debug, Deserialize)]
struct ResumeFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_skills")]
    skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_years")]
    experience_years: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkillList {
    List(Vec<String>),
    Text(String),
}

/// `null`, a list, or one comma-separated string.
fn lenient_skills<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Option::<SkillList>::deserialize(d)? {
        Some(SkillList::List(v)) => v,
        Some(SkillList::Text(s)) => s.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Years {
    Number(f64),
    Text(String),
}

/// A number, or a string that starts with one ("5", "5+", "5 years").
fn lenient_years<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(match Option::<Years>::deserialize(d)? {
        Some(Years::Number(n)) => Some(n),
        Some(Years::Text(s)) => {
            s.trim().split(|c: char| !(c.is_ascii_digit() || c == '.')).next().and_then(|n| n.parse().ok())
        }
        None => None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResume {
    pub candidate: Candidate,
    pub fallback_used: bool,
}

impl Engine {
    /// Turns resume text into a [`Candidate`].
    ///
    /// Any model failure, malformed output included, falls back to
    /// [`parse_resume_fallback`]. Empty text is an ingestion error.
    pub async fn parse_resume(&self, id: &str, text: &str) -> Result<ParsedResume> {
        if text.trim().is_empty() {
            return Err(Error::ingestion(id, "resume has no extractable text"));
        }
        let prompt = prompts::resume(prefix_chars(text, RESUME_PROMPT_CHARS));
        let parsed = match self.llm().complete(None, &prompt, prompts::RESUME_PARAMS).await {
            Ok(reply) => parse_structured::<ResumeFields>(&reply),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(fields) => Ok(ParsedResume { candidate: from_fields(id, text, fields), fallback_used: false }),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(resume = id, error = %e, "model could not parse resume, using regex fallback");
                Ok(ParsedResume { candidate: parse_resume_fallback(id, text), fallback_used: true })
            }
        }
    }
}

fn from_fields(id: &str, text: &str, fields: ResumeFields) -> Candidate {
    let non_empty = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty() && v != "null");
    Candidate {
        id: id.to_string(),
        name: non_empty(fields.name).unwrap_or_else(|| extract_name(text)),
        email: non_empty(fields.email),
        phone: non_empty(fields.phone),
        skills: fields.skills.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
        experience_years: fields.experience_years.map(|y| y.max(0.0).round() as u32).unwrap_or(0),
        raw_text: text.to_string(),
    }
}

/// Regex-only extraction used when the model is unavailable or unhelpful.
pub fn parse_resume_fallback(id: &str, text: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: extract_name(text),
        email: EMAIL.find(text).map(|m| m.as_str().to_string()),
        phone: PHONE.find(text).map(|m| m.as_str().trim().to_string()),
        skills: keyword_skills(text).into_iter().collect(),
        experience_years: extract_experience(text),
        raw_text: text.to_string(),
    }
}

/// First of the first five lines with at most four words and more than five
/// characters, else `"Unknown"`.
pub fn extract_name(text: &str) -> String {
    text.lines()
        .take(5)
        .map(str::trim)
        .find(|line| !line.is_empty() && line.split_whitespace().count() <= 4 && line.chars().count() > 5)
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Largest "N years (of) experience" / "N years in" figure, or 0.
pub fn extract_experience(text: &str) -> u32 {
    let lower = text.to_lowercase();
    EXPERIENCE
        .iter()
        .flat_map(|re| re.captures_iter(&lower).filter_map(|c| c[1].parse::<u32>().ok()).collect::<Vec<_>>())
        .max()
        .unwrap_or(0)
}

pub(crate) fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
