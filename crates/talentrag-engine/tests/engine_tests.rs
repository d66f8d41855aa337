use std::collections::BTreeSet;
use std::sync::Arc;

use tempfile::TempDir;

use talentrag_core::cancel::CancelFlag;
use talentrag_core::config::Settings;
use talentrag_core::data_processor::SourceFile;
use talentrag_core::error::Error;
use talentrag_core::traits::Embedder;
use talentrag_core::types::{Candidate, Requirement, ScreeningWarning};
use talentrag_embed::FakeEmbedder;
use talentrag_engine::{Engine, FALLBACK_ANSWER};
use talentrag_llm::ScriptedModel;
use talentrag_vector::EmbeddingCache;

fn settings() -> Settings {
    let mut s = Settings::default();
    s.chunking.size = 8;
    s.chunking.overlap = 2;
    s.retrieval.top_k = 3;
    s.embedding.workers = 2;
    s.embedding.batch_size = 4;
    s
}

fn engine(llm: Arc<ScriptedModel>) -> Engine {
    Engine::in_memory(settings(), Arc::new(FakeEmbedder::new(64)), llm).expect("engine")
}

fn policies() -> Vec<SourceFile> {
    vec![
        SourceFile::new("leave_policy.txt", "Employees receive twenty vacation days per year plus public holidays."),
        SourceFile::new("remote_policy.txt", "Remote work requires written manager approval for each week."),
        SourceFile::new("scanned.txt", "   \n  "),
    ]
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn empty_index_answers_with_fallback_and_no_model_call() {
    let llm = Arc::new(ScriptedModel::always("should not be used"));
    let engine = engine(llm.clone());
    let answer = engine.generate_answer("How many vacation days?").await.expect("answer");
    assert_eq!(answer.answer, FALLBACK_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(llm.calls(), 0);
    assert!(matches!(engine.retrieve("anything", 3), Err(Error::IndexNotReady)));
}

#[tokio::test]
async fn ingest_retrieve_and_answer_with_citations() {
    let llm = Arc::new(ScriptedModel::with_replies(["According to leave_policy.txt you get twenty days."]));
    let engine = engine(llm.clone());
    let report = engine.ingest(&policies(), &CancelFlag::new()).expect("ingest");
    assert_eq!(report.documents, 2);
    assert_eq!(report.skipped, vec!["scanned.txt"]);
    assert_eq!(report.chunks, engine.chunk_count());
    assert_eq!(report.embedded, report.chunks);

    let hits = engine.retrieve("twenty vacation days per year", 50).expect("retrieve");
    assert_eq!(hits.len(), engine.chunk_count());
    assert_eq!(hits[0].source_name, "leave_policy.txt");
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(engine.cache().len(), report.chunks, "queries are not cached");

    let answer = engine.generate_answer("twenty vacation days per year").await.expect("answer");
    assert_eq!(answer.sources[0], "leave_policy.txt");
    let mut unique = answer.sources.clone();
    unique.dedup();
    assert_eq!(unique, answer.sources);

    let call = &llm.recorded()[0];
    assert!(call.prompt.contains("[From leave_policy.txt]"));
    assert!(call.system.is_some());
    assert_eq!(call.params.max_tokens, 500);
}

#[tokio::test]
async fn explicit_top_k_limits_answer_context() {
    let llm = Arc::new(ScriptedModel::always("twenty days"));
    let engine = engine(llm.clone());
    engine.ingest(&policies(), &CancelFlag::new()).expect("ingest");
    assert!(engine.chunk_count() >= 2);

    let answer = engine.generate_answer_with("vacation days", 1).await.expect("answer");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(llm.recorded()[0].prompt.matches("[From ").count(), 1);

    engine.generate_answer_with("vacation days", 2).await.expect("answer");
    assert_eq!(llm.recorded()[1].prompt.matches("[From ").count(), 2);

    assert!(matches!(engine.generate_answer_with("vacation days", 0).await, Err(Error::InvalidInput(_))));
    assert_eq!(llm.calls(), 2);
}

#[test]
fn retrieve_rejects_zero_top_k() {
    let engine = engine(Arc::new(ScriptedModel::new()));
    engine.ingest(&policies(), &CancelFlag::new()).expect("ingest");
    assert!(matches!(engine.retrieve("days", 0), Err(Error::InvalidInput(_))));
}

#[test]
fn cancelled_ingest_leaves_corpus_untouched() {
    let engine = engine(Arc::new(ScriptedModel::new()));
    let cancel = CancelFlag::new();
    cancel.cancel();
    assert!(matches!(engine.ingest(&policies(), &cancel), Err(Error::Cancelled)));
    assert_eq!(engine.chunk_count(), 0);
    assert!(!engine.is_indexed());
}

#[test]
fn snapshot_and_cache_are_reused_across_restarts() {
    let tmp = TempDir::new().expect("tmp");
    let mut s = settings();
    s.storage.cache_path = tmp.path().join("cache.json").to_string_lossy().into_owned();
    s.storage.index_path = tmp.path().join("index.json").to_string_lossy().into_owned();
    let open = || {
        Engine::open(s.clone(), Arc::new(FakeEmbedder::new(64)), Arc::new(ScriptedModel::new())).expect("open")
    };

    let first = open();
    let built = first.ingest(&policies(), &CancelFlag::new()).expect("first ingest");
    assert!(!built.reused_snapshot);
    let before = first.retrieve("manager approval", 2).expect("search");
    first.shutdown().expect("shutdown");

    let second = open();
    let reused = second.ingest(&policies(), &CancelFlag::new()).expect("second ingest");
    assert!(reused.reused_snapshot);
    assert_eq!(reused.embedded, 0);
    assert_eq!(second.retrieve("manager approval", 2).expect("search"), before);

    let mut changed = policies();
    changed.push(SourceFile::new("travel_policy.txt", "Book flights through the travel desk."));
    let rebuilt = second.ingest(&changed, &CancelFlag::new()).expect("third ingest");
    assert!(!rebuilt.reused_snapshot);
    assert_eq!(rebuilt.cache_hits, built.chunks, "old chunks come from the cache");
}

#[test]
fn screen_ranks_and_skips_unscorable_candidates() {
    let engine = engine(Arc::new(ScriptedModel::new()));
    let job = "Backend engineer with Rust PostgreSQL and Kafka experience";
    let requirement = Requirement { skills: set(&["Rust", "PostgreSQL", "Kafka"]), raw_text: job.into() };
    let candidates = vec![
        Candidate { id: "weak".into(), raw_text: "Florist arranging bouquets".into(), ..Candidate::default() },
        Candidate {
            id: "strong".into(),
            skills: set(&["rust", "postgresql", "kafka"]),
            raw_text: job.into(),
            ..Candidate::default()
        },
        Candidate { id: "empty".into(), raw_text: "  ".into(), ..Candidate::default() },
    ];
    let report = engine.screen(&candidates, &requirement, 50.0, &CancelFlag::new()).expect("screen");
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.skipped[0].candidate_id, "empty");

    let top = &report.results[0].score;
    assert_eq!(top.candidate_id, "strong");
    assert_eq!(top.similarity_score, 100.0);
    assert_eq!(top.skill_match_rate, 100.0);
    assert_eq!(top.final_score, 100.0);
    assert!(top.shortlisted);
    for r in &report.results {
        assert_eq!(r.score.shortlisted, r.score.final_score >= 50.0);
    }
}

#[test]
fn screening_persists_new_vectors_once_at_the_end() {
    let tmp = TempDir::new().expect("tmp");
    let mut s = settings();
    s.storage.cache_path = tmp.path().join("cache.json").to_string_lossy().into_owned();
    s.storage.index_path = tmp.path().join("index.json").to_string_lossy().into_owned();
    let engine = Engine::open(s.clone(), Arc::new(FakeEmbedder::new(64)), Arc::new(ScriptedModel::new())).expect("open");
    let requirement = Requirement { skills: set(&["Rust"]), raw_text: "Rust developer".into() };
    let candidates: Vec<Candidate> = ["Rust services", "Python scripts", "Kafka streams"]
        .iter()
        .enumerate()
        .map(|(i, text)| Candidate { id: format!("c{i}"), raw_text: text.to_string(), ..Candidate::default() })
        .collect();
    engine.screen(&candidates, &requirement, 50.0, &CancelFlag::new()).expect("screen");
    assert!(!engine.cache().is_dirty());

    let reopened = EmbeddingCache::open(&s.storage.cache_path, FakeEmbedder::new(64).embedder_id()).expect("reopen");
    assert_eq!(reopened.len(), 4, "job text plus three resumes");
}

#[test]
fn equal_scores_keep_input_order() {
    let engine = engine(Arc::new(ScriptedModel::new()));
    let requirement = Requirement { skills: set(&["Go"]), raw_text: "Go developer".into() };
    let twin = |id: &str| Candidate { id: id.into(), raw_text: "Go developer for APIs".into(), ..Candidate::default() };
    let report = engine
        .screen(&[twin("first"), twin("second"), twin("third")], &requirement, 0.0, &CancelFlag::new())
        .expect("screen");
    let ids: Vec<_> = report.results.iter().map(|r| r.score.candidate_id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn screen_validates_threshold_and_honours_cancel() {
    let engine = engine(Arc::new(ScriptedModel::new()));
    let requirement = Requirement { skills: set(&["Go"]), raw_text: "Go developer".into() };
    let one = [Candidate { id: "a".into(), raw_text: "Go".into(), ..Candidate::default() }];
    assert!(matches!(engine.screen(&one, &requirement, 120.0, &CancelFlag::new()), Err(Error::InvalidInput(_))));
    let cancel = CancelFlag::new();
    cancel.cancel();
    assert!(matches!(engine.screen(&one, &requirement, 50.0, &cancel), Err(Error::Cancelled)));
}

#[tokio::test]
async fn screen_resumes_uses_fallbacks_for_malformed_model_output() {
    let llm = Arc::new(ScriptedModel::with_replies([
        // required skills: not JSON, so keyword fallback on the job text
        "Rust, Kafka",
        // first resume: valid structured reply
        r#"{"name": "Ada Park", "email": "ada@example.com", "phone": null, "skills": ["Rust", "Kafka"], "experience_years": 6}"#,
        // second resume: garbage, so regex fallback
        "I cannot help with that.",
    ]));
    let engine = engine(llm.clone());
    let job = "We are hiring a Rust engineer who knows Kafka.";
    let resumes = vec![
        SourceFile::new("ada.txt", "Ada Park\nRust and Kafka engineer, 6 years of experience."),
        SourceFile::new("bo.txt", "Bo Lindqvist\n2 years in Python scripting."),
        SourceFile::new("blank.txt", ""),
    ];
    let report = engine.screen_resumes(job, &resumes, 40.0, &CancelFlag::new()).await.expect("screen");

    assert_eq!(report.requirement.skills, set(&["Kafka", "Rust"]));
    assert_eq!(report.warnings, vec![ScreeningWarning::SkillFallbackUsed]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].candidate_id, "blank.txt");
    assert_eq!(llm.calls(), 3, "blank resume never reaches the model");

    let top = &report.results[0];
    assert_eq!(top.candidate.name, "Ada Park");
    assert_eq!(top.candidate.experience_years, 6);
    assert_eq!(top.score.matched_skills, vec!["Kafka", "Rust"]);
    let bo = &report.results[1].candidate;
    assert_eq!(bo.name, "Bo Lindqvist");
    assert_eq!(bo.experience_years, 2);
}

#[tokio::test]
async fn provider_failure_during_skill_extraction_is_surfaced() {
    let llm = Arc::new(ScriptedModel::new());
    let engine = engine(llm);
    let err = engine
        .screen_resumes("Rust engineer", &[SourceFile::new("a.txt", "Ann Smith\nRust")], 50.0, &CancelFlag::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
}

#[tokio::test]
async fn interview_questions_parse_or_fall_back() {
    let llm = Arc::new(ScriptedModel::with_replies([
        "```json\n[{\"question\": \"How does Kafka guarantee ordering?\", \"keywords\": [\"partition\", \"offset\"]}, {\"question\": \"Explain Rust ownership.\"}]\n```",
        "Sure! Here are some questions: 1. ...",
    ]));
    let engine = engine(llm.clone());
    let requirement = Requirement { skills: set(&["Kafka", "Rust"]), raw_text: "Rust and Kafka engineer".into() };
    let candidate = Candidate {
        id: "ada".into(),
        skills: set(&["Rust", "Kafka"]),
        raw_text: "Rust and Kafka engineer".into(),
        ..Candidate::default()
    };
    let score = engine.score(&candidate, &requirement, 50.0).expect("score");

    let generated = engine.interview_questions(&requirement.raw_text, &score, 6, 5).await.expect("questions");
    assert_eq!(generated.len(), 2);
    assert_eq!(generated[0].keywords, vec!["partition", "offset"]);
    assert!(generated[1].keywords.is_empty());
    assert_eq!(llm.recorded()[0].params.temperature, 0.7);

    let templated = engine.interview_questions(&requirement.raw_text, &score, 6, 3).await.expect("fallback");
    assert_eq!(templated.len(), 3);
    assert!(templated[0].question.contains("Kafka"));
}
