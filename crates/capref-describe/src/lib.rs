use thiserror::Error;

pub mod generator;
pub mod prompt;
pub mod provider;
pub mod request;

pub use generator::{DescriptionGenerator, DescriptionResult, UsageTotals, description_confidence};
pub use prompt::{SYSTEM_MESSAGE, build_prompt};
pub use provider::{DescriptionProvider, OfflineProvider, ProviderResponse, TokenUsage};
pub use request::{DescriptionRequest, MAX_CONTEXTS, TypeLabel};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescribeError {
    #[error("provider {0} is not available")]
    Unavailable(String),
    #[error("provider error: {0}")]
    Provider(String),
}
