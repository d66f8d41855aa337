use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use talentrag_core::error::{Error, ProviderErrorKind, Result};
use talentrag_core::traits::{CompletionParams, LanguageModel};

/// One recorded call to a [`ScriptedModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub system: Option<String>,
    pub prompt: String,
    pub params: CompletionParams,
}

/// Deterministic language model that replays queued replies in order.
///
/// When the script runs out it answers with the fallback reply if one was
/// set, otherwise with an `Unavailable` provider error.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    log: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new();
        model.replies.lock().extend(replies.into_iter().map(|r| Ok(r.into())));
        model
    }

    /// Answers every unscripted call with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        Self { fallback: Some(reply.into()), ..Self::default() }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: Error) {
        self.replies.lock().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, system: Option<&str>, prompt: &str, params: CompletionParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(RecordedCall { system: system.map(str::to_string), prompt: prompt.to_string(), params });
        let next = self.replies.lock().pop_front();
        match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(Error::provider(ProviderErrorKind::Unavailable, "script exhausted")),
        }
    }
}
