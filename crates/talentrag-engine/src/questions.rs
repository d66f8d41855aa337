//! Interview question generation for shortlisted candidates.

use talentrag_core::error::{Error, Result};
use talentrag_core::types::{InterviewQuestion, ScoreResult};
use talentrag_llm::parse_structured;

use crate::context::Engine;
use crate::prompts;
use crate::resume::prefix_chars;

const JOB_PROMPT_CHARS: usize = 1000;
const MAX_PROMPT_SKILLS: usize = 10;

impl Engine {
    /// Asks the model for `count` questions tailored to the candidate.
    ///
    /// A reply that is not a JSON array of `{question, keywords}` falls back
    /// to [`template_questions`]. Provider failures are returned.
    pub async fn interview_questions(
        &self,
        job_text: &str,
        result: &ScoreResult,
        experience_years: u32,
        count: usize,
    ) -> Result<Vec<InterviewQuestion>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let skills: Vec<String> = result.matched_skills.iter().take(MAX_PROMPT_SKILLS).cloned().collect();
        let prompt = prompts::interview_questions(prefix_chars(job_text, JOB_PROMPT_CHARS), &skills, experience_years, count);
        let reply = self.llm().complete(None, &prompt, prompts::QUESTIONS_PARAMS).await?;
        match parse_structured::<Vec<InterviewQuestion>>(&reply) {
            Ok(questions) => {
                let mut questions: Vec<InterviewQuestion> =
                    questions.into_iter().filter(|q| !q.question.trim().is_empty()).collect();
                questions.truncate(count);
                tracing::info!(candidate = %result.candidate_id, count = questions.len(), "interview questions generated");
                Ok(questions)
            }
            Err(Error::SkillParse(reason)) => {
                tracing::warn!(candidate = %result.candidate_id, %reason, "question reply malformed, using templates");
                Ok(template_questions(&skills, experience_years, count))
            }
            Err(e) => Err(e),
        }
    }
}

/// Deterministic questions built from the matched skills, or generic ones
/// when there are none.
pub fn template_questions(skills: &[String], experience_years: u32, count: usize) -> Vec<InterviewQuestion> {
    let mut out: Vec<InterviewQuestion> = skills
        .iter()
        .map(|skill| InterviewQuestion {
            question: format!("Describe a project where you used {skill}. What problem did it solve and what would you change?"),
            keywords: vec![skill.clone(), "trade-offs".into(), "design decisions".into()],
        })
        .collect();
    let generic = [
        (
            format!("Walk us through the most complex system you worked on in your {experience_years} years of experience."),
            vec!["architecture", "scale", "ownership"],
        ),
        (
            "How do you debug a production issue you cannot reproduce locally?".to_string(),
            vec!["logs", "monitoring", "hypotheses", "rollback"],
        ),
        (
            "How do you make sure code you ship is tested and maintainable?".to_string(),
            vec!["unit tests", "code review", "refactoring"],
        ),
    ];
    out.extend(generic.into_iter().map(|(question, keywords)| InterviewQuestion {
        question,
        keywords: keywords.into_iter().map(String::from).collect(),
    }));
    out.truncate(count);
    out
}
