//! Language model providers: an OpenAI-compatible HTTP client, retry policy,
//! strict structured-output parsing and a scripted mock for tests.

pub mod mock;
pub mod openai_compatible;
pub mod retry;
pub mod structured;

pub use mock::{RecordedCall, ScriptedModel};
pub use openai_compatible::OpenAiCompatibleClient;
pub use retry::RetryPolicy;
pub use structured::{parse_structured, strip_code_fence};
