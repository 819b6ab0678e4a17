use crate::document::paragraph::paragraph_text;
use crate::document::Template;
use crate::domain::model::PlaceholderSet;
use regex::Regex;
use std::sync::LazyLock;

/// `{{變量名}}`：名稱可包含除結束符外的任何字元
static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder pattern is valid"));

pub fn placeholder_token(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// 從一段邏輯文字中找出所有變量名
pub fn placeholders_in(text: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// 掃描模板正文與表格中的所有變量，結果去重並排序
pub fn scan(template: &Template) -> PlaceholderSet {
    let mut placeholders = PlaceholderSet::new();

    for paragraph in template.document().paragraphs() {
        let text = paragraph_text(paragraph);
        placeholders.extend(placeholders_in(&text).map(str::to_string));
    }

    tracing::debug!("🔍 Found {} placeholders in template", placeholders.len());
    placeholders
}
