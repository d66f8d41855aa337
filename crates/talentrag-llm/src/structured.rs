//! Strict parsing of JSON replies from a language model.
//!
//! Models sometimes wrap JSON in a Markdown fence; that wrapper is removed and
//! the remainder must deserialize into the requested schema. Anything else is
//! a `SkillParse` error for the caller to recover from.

use serde::de::DeserializeOwned;

use talentrag_core::error::{Error, Result};

/// Returns the body of the first ```` ```json ```` or ```` ``` ```` fence, or
/// the trimmed input when there is none.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(start) = trimmed.find("```") else { return trimmed };
    let after = &trimmed[start + 3..];
    // Skip an info string such as `json` up to the end of the line.
    let body = match after.find('\n') {
        Some(nl) if after[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &after[nl + 1..],
        _ => after.strip_prefix("json").unwrap_or(after),
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

pub fn parse_structured<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let body = strip_code_fence(reply);
    if body.is_empty() {
        return Err(Error::SkillParse("empty model reply".into()));
    }
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!(error = %e, reply = %truncate(body, 200), "model reply does not match schema");
        Error::SkillParse(e.to_string())
    })
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Q {
        question: String,
        #[serde(default)]
        keywords: Vec<String>,
    }

    #[test]
    fn plain_and_fenced_arrays_parse() {
        let plain: Vec<String> = parse_structured(r#"["Rust", "SQL"]"#).expect("plain");
        let fenced: Vec<String> = parse_structured("Here you go:\n```json\n[\"Rust\", \"SQL\"]\n```\nThanks").expect("fenced");
        let bare: Vec<String> = parse_structured("```\n[\"Rust\", \"SQL\"]\n```").expect("bare fence");
        assert_eq!(plain, vec!["Rust", "SQL"]);
        assert_eq!(fenced, plain);
        assert_eq!(bare, plain);
    }

    #[test]
    fn objects_follow_schema() {
        let qs: Vec<Q> = parse_structured(r#"[{"question": "Why?", "keywords": ["a"]}, {"question": "How?"}]"#).expect("parse");
        assert_eq!(qs[1], Q { question: "How?".into(), keywords: vec![] });
    }

    #[test]
    fn schema_mismatch_is_skill_parse_error() {
        assert!(matches!(parse_structured::<Vec<String>>("Python, Java"), Err(Error::SkillParse(_))));
        assert!(matches!(parse_structured::<Vec<String>>(r#"{"skills": []}"#), Err(Error::SkillParse(_))));
        assert!(matches!(parse_structured::<Vec<String>>("   "), Err(Error::SkillParse(_))));
    }
}
