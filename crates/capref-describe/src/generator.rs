use std::collections::HashSet;
use std::time::Instant;

use capref_core::CaptionContextPair;
use serde::Serialize;

use crate::DescribeError;
use crate::prompt::build_prompt;
use crate::provider::{DescriptionProvider, TokenUsage};
use crate::request::DescriptionRequest;

const ANSWER_PREFIX: &str = "描述：";
const COMPLETENESS_MARKERS: [&str; 3] = ["圖", "表", "顯示"];

/// Outcome of describing one caption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptionResult {
    pub original_caption: String,
    pub description: String,
    pub confidence: f64,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Running token totals over successful requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageTotals {
    pub requests: u64,
    pub total_tokens: u64,
}

impl UsageTotals {
    pub fn average(&self) -> f64 {
        self.total_tokens as f64 / self.requests.max(1) as f64
    }
}

/// Score a generated description in `[0.5, 1.0]`.
pub fn description_confidence(description: &str, request: &DescriptionRequest) -> f64 {
    let mut tenths = 5u32;

    if (50..=300).contains(&description.chars().count()) {
        tenths += 2;
    }
    if description.contains(request.caption_number.as_str())
        || description.contains(request.type_label.as_str())
    {
        tenths += 1;
    }

    let words: HashSet<&str> = description.split_whitespace().collect();
    let shares_context = request.related_context.iter().any(|ctx| {
        ctx.split_whitespace()
            .collect::<HashSet<_>>()
            .intersection(&words)
            .count()
            > 2
    });
    if shares_context {
        tenths += 1;
    }

    if COMPLETENESS_MARKERS.iter().any(|m| description.contains(m)) {
        tenths += 1;
    }

    f64::from(tenths.min(10)) / 10.0
}

/// Drives a [`DescriptionProvider`] over caption requests.
pub struct DescriptionGenerator<P> {
    provider: P,
    totals: UsageTotals,
}

impl<P: DescriptionProvider> DescriptionGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            totals: UsageTotals::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn totals(&self) -> UsageTotals {
        self.totals
    }

    /// Describe one caption. Provider failures are reported in the result.
    pub fn describe(&mut self, request: &DescriptionRequest) -> DescriptionResult {
        let start = Instant::now();

        match self.generate(request) {
            Ok((description, usage)) => {
                self.totals.requests += 1;
                self.totals.total_tokens += usage.total_tokens;
                let confidence = description_confidence(&description, request);
                tracing::info!(
                    provider = self.provider.name(),
                    label = %request.type_label,
                    number = %request.caption_number,
                    tokens = usage.total_tokens,
                    confidence,
                    "description generated"
                );
                DescriptionResult {
                    original_caption: request.caption_text.clone(),
                    description,
                    confidence,
                    processing_time_ms: start.elapsed().as_millis() as u64,
                    usage: Some(usage),
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    number = %request.caption_number,
                    error = %e,
                    "description failed"
                );
                DescriptionResult {
                    original_caption: request.caption_text.clone(),
                    description: String::new(),
                    confidence: 0.0,
                    processing_time_ms: start.elapsed().as_millis() as u64,
                    usage: None,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Describe every pair in order.
    pub fn describe_pairs(&mut self, pairs: &[CaptionContextPair]) -> Vec<DescriptionResult> {
        let results: Vec<DescriptionResult> = pairs
            .iter()
            .map(|pair| self.describe(&DescriptionRequest::from_pair(pair)))
            .collect();
        tracing::info!(
            requests = results.len(),
            succeeded = results.iter().filter(|r| r.success).count(),
            total_tokens = self.totals.total_tokens,
            "batch description complete"
        );
        results
    }

    fn generate(&self, request: &DescriptionRequest) -> Result<(String, TokenUsage), DescribeError> {
        if !self.provider.is_available() {
            return Err(DescribeError::Unavailable(self.provider.name().to_string()));
        }
        let response = self.provider.generate(&build_prompt(request))?;
        let content = response.content.trim();
        let description = content
            .strip_prefix(ANSWER_PREFIX)
            .unwrap_or(content)
            .trim()
            .to_string();
        Ok((description, response.usage))
    }
}

#[cfg(test)]
mod tests {
    use capref_core::CaptionType;

    use super::*;
    use crate::provider::{OfflineProvider, ProviderResponse};
    use crate::request::tests::pair;

    struct Canned(Result<&'static str, DescribeError>, bool);

    impl DescriptionProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn is_available(&self) -> bool {
            self.1
        }

        fn generate(&self, _prompt: &str) -> Result<ProviderResponse, DescribeError> {
            self.0.clone().map(|content| ProviderResponse {
                content: content.to_string(),
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                },
            })
        }
    }

    fn request() -> DescriptionRequest {
        let mut req = DescriptionRequest::from_pair(&pair(CaptionType::Figure, 0));
        req.related_context = vec!["the loss curve drops quickly after warmup".into()];
        req
    }

    #[test]
    fn test_confidence_components() {
        let req = request();
        assert!((description_confidence("nothing relevant", &req) - 0.5).abs() < 1e-9);
        assert!((description_confidence("the loss curve drops", &req) - 0.6).abs() < 1e-9);
        assert!((description_confidence("see 1.1", &req) - 0.6).abs() < 1e-9);
        assert!((description_confidence("資料顯示", &req) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_capped_at_one() {
        let req = request();
        let desc = "圖 1.1 shows how the loss curve drops quickly, then levels off for the rest of training";
        assert!(desc.chars().count() >= 50);
        assert_eq!(description_confidence(desc, &req), 1.0);
    }

    #[test]
    fn test_offline_batch() {
        let pairs = vec![pair(CaptionType::Figure, 2), pair(CaptionType::Table, 0)];
        let mut generator = DescriptionGenerator::new(OfflineProvider);
        let results = generator.describe_pairs(&pairs);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert!((results[0].confidence - 0.9).abs() < 1e-9);
        assert!((results[1].confidence - 0.9).abs() < 1e-9);
        assert!(results[1].description.starts_with("這是一個表格"));

        let totals = generator.totals();
        assert_eq!(totals.requests, 2);
        let tokens: u64 = results.iter().map(|r| r.usage.unwrap().total_tokens).sum();
        assert_eq!(totals.total_tokens, tokens);
        assert!((totals.average() - tokens as f64 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_strips_answer_prefix() {
        let mut generator = DescriptionGenerator::new(Canned(Ok("  描述： 圖中顯示算盤的結構"), true));
        let result = generator.describe(&request());
        assert_eq!(result.description, "圖中顯示算盤的結構");
        assert_eq!(result.original_caption, "中國的算盤");
    }

    #[test]
    fn test_provider_failure_is_captured() {
        let mut generator = DescriptionGenerator::new(Canned(
            Err(DescribeError::Provider("quota exceeded".into())),
            true,
        ));
        let result = generator.describe(&request());
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert!(result.description.is_empty());
        assert_eq!(result.error.as_deref(), Some("provider error: quota exceeded"));
        assert_eq!(generator.totals(), UsageTotals::default());
        assert_eq!(generator.totals().average(), 0.0);
    }

    #[test]
    fn test_unavailable_provider() {
        let mut generator = DescriptionGenerator::new(Canned(Ok("unused"), false));
        let results = generator.describe_pairs(&[pair(CaptionType::Figure, 1)]);
        assert_eq!(
            results[0].error.as_deref(),
            Some("provider canned is not available")
        );
    }
}
