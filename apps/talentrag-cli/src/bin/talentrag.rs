use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use talentrag_core::cancel::CancelFlag;
use talentrag_core::config::Config;
use talentrag_core::data_processor::{DataProcessor, DocumentExtractor, SourceFile};
use talentrag_core::traits::TextExtractor;
use talentrag_engine::{Engine, ScreeningReport};

#[derive(Parser)]
#[command(name = "talentrag", version, about = "Policy question answering and resume screening")]
struct Cli {
    /// Use the deterministic hashing embedder instead of the local model.
    #[arg(long, global = true)]
    fake_embeddings: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build or refresh the embedding cache and index snapshot for a folder of documents.
    Ingest { dir: PathBuf },
    /// Answer a question from the documents in a folder.
    Ask {
        question: String,
        #[arg(long, default_value = "data/policies")]
        docs: PathBuf,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Rank resumes against a job description.
    Screen {
        #[arg(long)]
        job: PathBuf,
        #[arg(required = true)]
        resumes: Vec<PathBuf>,
        #[arg(long)]
        threshold: Option<f64>,
        /// Also generate interview questions for shortlisted candidates.
        #[arg(long)]
        questions: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Generate interview questions for a single resume.
    Questions {
        #[arg(long)]
        job: PathBuf,
        resume: PathBuf,
        #[arg(long)]
        count: Option<usize>,
    },
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn read_source(path: &Path) -> anyhow::Result<SourceFile> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, bytes))
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    let source = read_source(path)?;
    Ok(DocumentExtractor.extract_text(&source.name, &source.bytes))
}

fn cancel_on_ctrl_c() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current item...");
            flag.cancel();
        }
    });
    cancel
}

fn print_report(report: &ScreeningReport, threshold: f64) {
    let skills: Vec<&str> = report.requirement.skills.iter().map(String::as_str).collect();
    println!("Required skills: {}", if skills.is_empty() { "(none)".to_string() } else { skills.join(", ") });
    for w in &report.warnings {
        println!("Warning: {w:?}");
    }
    println!();
    println!("{:<4} {:<28} {:>8} {:>8} {:>8}  {}", "#", "candidate", "semantic", "skills", "final", "status");
    for (i, r) in report.results.iter().enumerate() {
        let s = &r.score;
        let status = if s.shortlisted { "SHORTLISTED" } else { "-" };
        println!(
            "{:<4} {:<28} {:>8.2} {:>8.2} {:>8.2}  {}",
            i + 1,
            s.candidate_name,
            s.similarity_score,
            s.skill_match_rate,
            s.final_score,
            status
        );
    }
    for skipped in &report.skipped {
        println!("skipped {}: {}", skipped.candidate_id, skipped.reason);
    }
    println!("\n{} of {} shortlisted at threshold {threshold}", report.shortlisted().count(), report.results.len());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Config::load().context("loading configuration")?.into_settings();
    if cli.fake_embeddings {
        settings.embedding.use_fake = true;
    }
    let engine = Engine::from_settings(settings)?;
    let cancel = cancel_on_ctrl_c();

    match cli.command {
        Command::Ingest { dir } => {
            let pb = spinner(&format!("Ingesting {}", dir.display()));
            let report = engine.ingest_directory(&dir, &cancel);
            pb.finish_and_clear();
            let report = report?;
            println!(
                "Indexed {} documents into {} chunks ({} embedded, {} from cache{})",
                report.documents,
                report.chunks,
                report.embedded,
                report.cache_hits,
                if report.reused_snapshot { ", snapshot reused" } else { "" }
            );
            for name in &report.skipped {
                println!("skipped {name}: no extractable text");
            }
        }
        Command::Ask { question, docs, top_k } => {
            let sources = DataProcessor::new().read_directory(&docs)?;
            engine.ingest(&sources, &cancel)?;
            let top_k = top_k.unwrap_or(engine.settings().retrieval.top_k);
            let answer = engine.generate_answer_with(&question, top_k).await?;
            tracing::info!(top_k, sources = answer.sources.len(), "answer ready");
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources: {}", answer.sources.join(", "));
            }
        }
        Command::Screen { job, resumes, threshold, questions, json } => {
            let threshold = threshold.unwrap_or(engine.settings().screening.threshold);
            let job_text = read_text(&job)?;
            let files = resumes.iter().map(|p| read_source(p)).collect::<anyhow::Result<Vec<_>>>()?;
            let pb = spinner(&format!("Screening {} resumes", files.len()));
            let report = engine.screen_resumes(&job_text, &files, threshold, &cancel).await;
            pb.finish_and_clear();
            let report = report?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, threshold);
            }
            if questions {
                let count = engine.settings().screening.question_count;
                for ranked in report.shortlisted() {
                    cancel.check()?;
                    let qs = engine
                        .interview_questions(&job_text, &ranked.score, ranked.candidate.experience_years, count)
                        .await?;
                    println!("\nInterview questions for {}:", ranked.candidate.name);
                    for (i, q) in qs.iter().enumerate() {
                        println!("  {}. {}", i + 1, q.question);
                        if !q.keywords.is_empty() {
                            println!("     look for: {}", q.keywords.join(", "));
                        }
                    }
                }
            }
        }
        Command::Questions { job, resume, count } => {
            let job_text = read_text(&job)?;
            let source = read_source(&resume)?;
            let text = DocumentExtractor.extract_text(&source.name, &source.bytes);
            if text.is_empty() {
                bail!("{} has no extractable text", resume.display());
            }
            let (requirement, _) = engine.requirement_from_job(&job_text).await?;
            let parsed = engine.parse_resume(&source.name, &text).await?;
            let score = engine.score(&parsed.candidate, &requirement, engine.settings().screening.threshold)?;
            let count = count.unwrap_or(engine.settings().screening.question_count);
            let qs = engine.interview_questions(&job_text, &score, parsed.candidate.experience_years, count).await?;
            println!("Candidate: {} (final score {:.2})", parsed.candidate.name, score.final_score);
            for (i, q) in qs.iter().enumerate() {
                println!("{}. {}", i + 1, q.question);
            }
        }
    }

    engine.shutdown()?;
    Ok(())
}
