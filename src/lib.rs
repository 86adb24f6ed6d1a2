pub mod classifier;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod stages;

pub use classifier::{classify_speakers, ClassificationResult, ClassifierConfig};
pub use error::{ClassifyError, ErrorKind};
pub use io::{format_log, read_transcript, write_json, write_text};
pub use llm::{AnthropicClient, AnthropicConfig, LlmClient};
pub use models::{LogEntry, RoleMapping, TargetRoles, Transcript};
pub use stages::{
    analyze_labels, apply_mapping, extract_tags, request_mapping, run_safeguard, SafeguardConfig,
    MAX_ITERATIONS,
};
