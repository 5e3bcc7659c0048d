//! Description provider trait and the offline template provider.

use serde::Serialize;

use crate::DescribeError;
use crate::request::TypeLabel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// A text generator that turns a rendered prompt into a description.
pub trait DescriptionProvider: Send + Sync {
    /// The canonical name of this provider (e.g., "offline").
    fn name(&self) -> &str;

    /// Whether the provider can currently serve requests.
    fn is_available(&self) -> bool;

    fn generate(&self, prompt: &str) -> Result<ProviderResponse, DescribeError>;
}

const FIGURE_TEMPLATE: &str = "這是一個圖表，展示了{content}。從圖中可以看出相關的資訊和數據關係，有助於理解{context}的概念。這個圖表在文件中起到了重要的說明作用。";
const TABLE_TEMPLATE: &str = "這是一個表格，整理了{content}相關的數據。表格中包含了重要的統計資訊和分類數據，提供了{context}的詳細參考資料。";

const CAPTION_LINE: &str = "原始說明：";
const TYPE_LINE: &str = "類型：";
const DEFAULT_CONTENT: &str = "主要內容";

/// Deterministic provider that fills a fixed template from the prompt.
///
/// Useful for dry runs and tests; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

impl OfflineProvider {
    fn label(prompt: &str) -> TypeLabel {
        match line_value(prompt, TYPE_LINE) {
            Some(v) if v.starts_with(TypeLabel::Table.as_str()) => TypeLabel::Table,
            _ => TypeLabel::Figure,
        }
    }

    fn domain(prompt: &str) -> &'static str {
        if prompt.contains("計算機") || prompt.contains("電腦") {
            "計算機科學"
        } else if prompt.contains("數學") {
            "數學"
        } else if prompt.contains("統計") {
            "統計學"
        } else {
            "該主題"
        }
    }

    fn render(prompt: &str) -> String {
        let content = line_value(prompt, CAPTION_LINE)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT);
        let template = match Self::label(prompt) {
            TypeLabel::Figure => FIGURE_TEMPLATE,
            TypeLabel::Table => TABLE_TEMPLATE,
        };
        template
            .replace("{content}", content)
            .replace("{context}", Self::domain(prompt))
    }
}

fn line_value<'a>(prompt: &'a str, key: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.split_once(key).map(|(_, v)| v.trim()))
}

fn estimate_tokens(text: &str) -> u64 {
    (text.len() / 4) as u64
}

impl DescriptionProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn generate(&self, prompt: &str) -> Result<ProviderResponse, DescribeError> {
        let content = Self::render(prompt);
        let usage = TokenUsage {
            prompt_tokens: estimate_tokens(prompt),
            completion_tokens: estimate_tokens(&content),
            total_tokens: ((prompt.len() + content.len()) / 4) as u64,
        };
        Ok(ProviderResponse { content, usage })
    }
}

#[cfg(test)]
mod tests {
    use capref_core::CaptionType;

    use super::*;
    use crate::prompt::build_prompt;
    use crate::request::DescriptionRequest;
    use crate::request::tests::pair;

    #[test]
    fn test_offline_figure_response() {
        let prompt = build_prompt(&DescriptionRequest::from_pair(&pair(CaptionType::Figure, 1)));
        let resp = OfflineProvider.generate(&prompt).unwrap();
        assert!(resp.content.starts_with("這是一個圖表，展示了中國的算盤。"));
        assert!(resp.content.contains("有助於理解該主題的概念"));
        assert_eq!(resp.usage.prompt_tokens, (prompt.len() / 4) as u64);
        assert_eq!(
            resp.usage.total_tokens,
            ((prompt.len() + resp.content.len()) / 4) as u64
        );
    }

    #[test]
    fn test_offline_domain_from_context() {
        let mut req = DescriptionRequest::from_pair(&pair(CaptionType::Figure, 0));
        req.related_context = vec!["電腦視覺模型的訓練流程".into()];
        let resp = OfflineProvider.generate(&build_prompt(&req)).unwrap();
        assert!(resp.content.contains("有助於理解計算機科學的概念"));
    }

    #[test]
    fn test_offline_table_response() {
        let mut req = DescriptionRequest::from_pair(&pair(CaptionType::Table, 0));
        req.caption_text = "各國人口".into();
        let resp = OfflineProvider.generate(&build_prompt(&req)).unwrap();
        // the table instruction itself mentions 統計
        assert_eq!(
            resp.content,
            "這是一個表格，整理了各國人口相關的數據。表格中包含了重要的統計資訊和分類數據，提供了統計學的詳細參考資料。"
        );
    }

    #[test]
    fn test_offline_without_caption_line() {
        let resp = OfflineProvider.generate("describe this").unwrap();
        assert!(resp.content.contains("展示了主要內容"));
        assert!(resp.content.contains("該主題"));
        assert!(OfflineProvider.is_available());
        assert_eq!(OfflineProvider.name(), "offline");
    }
}
