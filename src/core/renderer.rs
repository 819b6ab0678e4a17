use crate::core::scanner::placeholder_token;
use crate::document::paragraph::{paragraph_text, replace_paragraph_text};
use crate::document::{Document, Template};
use crate::domain::model::SubstitutionRecord;

/// 替換段落文字中記錄所含的變量；未知變量保持原樣
pub fn substitute(text: &str, record: &SubstitutionRecord) -> String {
    let mut result = text.to_string();
    for (key, value) in record {
        let token = placeholder_token(key);
        if result.contains(&token) {
            result = result.replace(&token, value);
        }
    }
    result
}

/// 以替換記錄渲染模板，產生獨立的新文件。
///
/// 有變化的段落會被改寫為單一 run（保留第一個 run 的格式）；
/// 沒有變量的段落不做任何改動。
pub fn render(template: &Template, record: &SubstitutionRecord) -> Document {
    let mut document = template.instantiate();
    let mut rewritten = 0usize;

    document.for_each_paragraph_mut(&mut |paragraph| {
        let original = paragraph_text(paragraph);
        if !original.contains("{{") {
            return;
        }

        let replaced = substitute(&original, record);
        if replaced != original {
            replace_paragraph_text(paragraph, &replaced);
            rewritten += 1;
        }
    });

    tracing::debug!("✏️ Rewrote {} paragraphs", rewritten);
    document
}
