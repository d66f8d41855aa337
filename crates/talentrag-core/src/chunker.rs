//! Word-window chunking with overlap.

use std::ops::Range;

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidInput("chunk size must be at least 1 word".into()));
        }
        if overlap >= size {
            return Err(Error::InvalidInput(format!("overlap ({overlap}) must be smaller than chunk size ({size})")));
        }
        Ok(Self { size, overlap })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.size, settings.overlap)
    }

    pub fn size(&self) -> usize { self.size }
    pub fn overlap(&self) -> usize { self.overlap }

    /// Lazily yields chunk texts. Calling again restarts from the beginning.
    pub fn chunks<'a>(&self, text: &'a str) -> ChunkIter<'a> {
        let words: Vec<&'a str> = text.split_whitespace().collect();
        let whole = words.len() <= self.size;
        ChunkIter { text, ranges: WordRanges::new(words.len(), self.size, self.overlap), words, whole, done: false }
    }

    /// Word-index ranges of each window for a text of `word_count` words.
    pub fn word_ranges(&self, word_count: usize) -> WordRanges {
        WordRanges::new(word_count, self.size, self.overlap)
    }

    /// Splits a document into `Chunk`s with contiguous ordinals.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.chunks(&doc.raw_text)
            .enumerate()
            .map(|(ordinal, text)| Chunk {
                id: Chunk::make_id(&doc.id, ordinal),
                document_id: doc.id.clone(),
                ordinal,
                word_count: text.split_whitespace().count(),
                text,
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        let d = ChunkingSettings::default();
        Self { size: d.size, overlap: d.overlap }
    }
}

/// Window start advances by `size - overlap`; the last window ends at the last word.
#[derive(Debug, Clone)]
pub struct WordRanges {
    len: usize,
    size: usize,
    step: usize,
    start: usize,
    done: bool,
}

impl WordRanges {
    fn new(len: usize, size: usize, overlap: usize) -> Self {
        Self { len, size, step: size - overlap, start: 0, done: len == 0 }
    }
}

impl Iterator for WordRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.done {
            return None;
        }
        let end = (self.start + self.size).min(self.len);
        let range = self.start..end;
        if end >= self.len {
            self.done = true;
        } else {
            self.start += self.step;
        }
        Some(range)
    }
}

#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    text: &'a str,
    words: Vec<&'a str>,
    ranges: WordRanges,
    whole: bool,
    done: bool,
}

impl Iterator for ChunkIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        // Short documents come back untouched.
        if self.whole {
            self.done = true;
            return Some(self.text.to_string());
        }
        for range in self.ranges.by_ref() {
            let window = self.words[range].join(" ");
            if !window.trim().is_empty() {
                return Some(window);
            }
        }
        self.done = true;
        None
    }
}
