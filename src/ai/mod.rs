/// Risk analyzer and backend implementations
pub mod analyzer;
pub mod backends;

pub use analyzer::{format_prompt, RiskAnalyzer, FAILURE_FALLBACK, MISSING_KEY_FALLBACK};
pub use backends::{AnalysisBackend, GeminiBackend, MockBackend};
