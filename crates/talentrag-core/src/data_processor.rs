//! Turning uploaded files into `Document`s.
//!
//! Extraction itself is a capability (`TextExtractor`); this module owns the
//! skip-with-warning policy for empty extractions and the directory walk used
//! by the CLI.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cancel::CancelFlag;
use crate::error::{Error, Result};
use crate::traits::TextExtractor;
use crate::types::Document;

/// Raw bytes of one uploaded file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }
}

/// Plain-text extraction: UTF-8, falling back to lossy decoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, _source_name: &str, bytes: &[u8]) -> String {
        match std::str::from_utf8(bytes) {
            Ok(s) => s.trim().to_string(),
            Err(_) => String::from_utf8_lossy(bytes).trim().to_string(),
        }
    }
}

/// PDF text via `pdf-extract`. Unreadable or image-only PDFs give an empty
/// string, which the caller treats as "nothing to extract".
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, source_name: &str, bytes: &[u8]) -> String {
        // pdf-extract panics on some malformed files instead of returning an error.
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(text)) => text.trim().to_string(),
            Ok(Err(e)) => {
                tracing::warn!(file = source_name, error = ?e, "pdf extraction failed");
                String::new()
            }
            Err(_) => {
                tracing::warn!(file = source_name, "pdf extraction panicked");
                String::new()
            }
        }
    }
}

/// Picks the extractor from the file extension: `.pdf` goes through
/// [`PdfTextExtractor`], anything else is read as plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract_text(&self, source_name: &str, bytes: &[u8]) -> String {
        let is_pdf = Path::new(source_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            PdfTextExtractor.extract_text(source_name, bytes)
        } else {
            PlainTextExtractor.extract_text(source_name, bytes)
        }
    }
}

/// Documents that made it through extraction plus the ones that were skipped.
#[derive(Debug, Default)]
pub struct ExtractedBatch {
    pub documents: Vec<Document>,
    pub failures: Vec<Error>,
}

#[derive(Debug, Default)]
pub struct DataProcessor {
    extensions: Vec<String>,
}

impl DataProcessor {
    pub fn new() -> Self {
        Self { extensions: ["txt", "md", "pdf"].map(String::from).to_vec() }
    }

    /// Reads every matching file under `root`, sorted by path.
    pub fn read_directory(&self, root: &Path) -> Result<Vec<SourceFile>> {
        let files = self.list_files(root);
        if files.is_empty() {
            tracing::warn!(dir = %root.display(), "no matching files found");
        }
        let mut out = Vec::with_capacity(files.len());
        for path in files {
            let name = path.strip_prefix(root).unwrap_or(path.as_path()).to_string_lossy().to_string();
            out.push(SourceFile { name, bytes: fs::read(&path)? });
        }
        Ok(out)
    }

    /// Extracts each file in order. Empty extractions are recorded as
    /// `Error::Ingestion` and skipped; cancellation stops between files.
    pub fn extract_documents(
        &self,
        sources: &[SourceFile],
        extractor: &dyn TextExtractor,
        cancel: &CancelFlag,
    ) -> Result<ExtractedBatch> {
        let mut batch = ExtractedBatch::default();
        let mut seen_ids = HashSet::new();
        for (i, source) in sources.iter().enumerate() {
            cancel.check()?;
            tracing::debug!(file = %source.name, "extracting {}/{}", i + 1, sources.len());
            let text = extractor.extract_text(&source.name, &source.bytes);
            if text.trim().is_empty() {
                tracing::warn!(file = %source.name, "no extractable text, skipping");
                batch.failures.push(Error::ingestion(&source.name, "no extractable text"));
                continue;
            }
            let id = unique_doc_id(&source.name, &mut seen_ids);
            batch.documents.push(Document { id, source_name: source.name.clone(), raw_text: text });
        }
        tracing::info!(documents = batch.documents.len(), skipped = batch.failures.len(), "extraction finished");
        Ok(batch)
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
            })
            .collect();
        files.sort();
        files
    }
}

/// File stem, lowercased, with a numeric suffix when the stem was already taken.
fn unique_doc_id(source_name: &str, seen: &mut HashSet<String>) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "doc".to_string());
    let mut id = stem.clone();
    let mut n = 1;
    while !seen.insert(id.clone()) {
        id = format!("{stem}-{n}");
        n += 1;
    }
    id
}
