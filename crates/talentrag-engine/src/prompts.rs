//! Prompt text sent to the language model.

use talentrag_core::traits::CompletionParams;

pub const ANSWER_PARAMS: CompletionParams = CompletionParams::new(0.3, 500);
pub const SKILLS_PARAMS: CompletionParams = CompletionParams::new(0.1, 500);
pub const RESUME_PARAMS: CompletionParams = CompletionParams::new(0.1, 1000);
pub const QUESTIONS_PARAMS: CompletionParams = CompletionParams::new(0.7, 1500);

pub const ANSWER_SYSTEM: &str =
    "You answer employee questions using only the policy documents you are given. Never invent information.";

pub fn answer(context: &str, question: &str) -> String {
    format!(
        "Answer the question using ONLY the policy excerpts below.\n\n\
         Policy excerpts:\n{context}\n\n\
         Question: {question}\n\n\
         Rules:\n\
         - Use only information found in the excerpts.\n\
         - Name the document the information comes from (e.g. \"According to leave_policy.txt ...\").\n\
         - If the excerpts do not contain the answer, say that you do not know.\n\n\
         Answer:"
    )
}

pub fn required_skills(job_text: &str) -> String {
    format!(
        "List the technical skills this job description requires.\n\n\
         Job description:\n{job_text}\n\n\
         Reply with ONLY a JSON array of strings (languages, frameworks, tools, platforms), \
         for example [\"Python\", \"Docker\", \"AWS\"].\n\n\
         JSON array:"
    )
}

pub fn resume(resume_text: &str) -> String {
    format!(
        "Extract structured data from the resume below.\n\n\
         Resume:\n{resume_text}\n\n\
         Reply with ONLY a JSON object of this shape:\n\
         {{\"name\": \"full name\", \"email\": \"address or null\", \"phone\": \"number or null\", \
         \"skills\": [\"technical skills\"], \"experience_years\": 0}}\n\n\
         Only include what the resume states. Estimate experience_years from the work history.\n\n\
         JSON:"
    )
}

pub fn interview_questions(job_text: &str, skills: &[String], experience_years: u32, count: usize) -> String {
    format!(
        "Write {count} interview questions for a candidate.\n\n\
         Job description:\n{job_text}\n\n\
         Candidate:\n\
         - Relevant skills: {skills}\n\
         - Years of experience: {experience_years}\n\n\
         Questions should target technologies named in the job description, suit the candidate's \
         experience level, and mix depth with practical application. For each question give the \
         keywords a strong answer would mention.\n\n\
         Reply with ONLY a JSON array:\n\
         [{{\"question\": \"...\", \"keywords\": [\"...\", \"...\"]}}]",
        skills = skills.join(", "),
    )
}
