use crate::request::{DescriptionRequest, TypeLabel};

/// System message sent alongside every prompt.
pub const SYSTEM_MESSAGE: &str =
    "你是一個專業的學術文件分析助手，擅長為圖表生成清晰、準確的文字描述。";

const NO_CONTEXT: &str = "無相關內文";

fn type_instruction(label: TypeLabel) -> &'static str {
    match label {
        TypeLabel::Figure => "這是一個圖片/圖表。請描述其視覺內容、數據關係或概念說明。",
        TypeLabel::Table => "這是一個表格。請描述其數據結構、統計內容或資訊整理。",
    }
}

/// Render the description prompt for one caption.
pub fn build_prompt(request: &DescriptionRequest) -> String {
    let context_text = if request.related_context.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        request.related_context.join("\n")
    };

    format!(
        "你是一個專業的學術文件分析助手。請根據以下資訊，為圖表生成一個詳細、準確的文字描述。

【圖表資訊】
- 類型：{label}
- 編號：{number}
- 原始說明：{caption}
- 頁碼：第{page}頁

【相關內文脈絡】
{context_text}

【任務要求】
{instruction}

請生成一個 100-200 字的完整描述，包含：
1. 圖表的主要內容或主題
2. 關鍵資訊或數據（如果有）
3. 在文件中的作用或意義
4. 與上下文的關聯性

【回應格式】
請只回傳描述文字，不要包含額外說明。

描述：",
        label = request.type_label,
        number = request.caption_number,
        caption = request.caption_text,
        page = request.page,
        instruction = type_instruction(request.type_label),
    )
}
