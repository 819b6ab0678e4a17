mod common;

use anyhow::Result;
use letter_merge::document::paragraph::paragraph_text;
use letter_merge::{render, scan, Document, SubstitutionRecord, Template};
use std::io::{Cursor, Read};

fn record(pairs: &[(&str, &str)]) -> SubstitutionRecord {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn texts(document: &Document) -> Vec<String> {
    document.paragraphs().into_iter().map(paragraph_text).collect()
}

/// 拆分到多個 run 的變量與表格中的變量都能被掃描到
#[test]
fn test_scan_letter_template() -> Result<()> {
    let template = Template::from_bytes(&common::docx_with_body(common::LETTER_BODY))?;

    let names: Vec<String> = scan(&template).into_iter().collect();
    assert_eq!(names, vec!["姓名", "客户名称", "日期", "金额"]);

    // 重複掃描結果一致
    assert_eq!(scan(&template), scan(&template));
    Ok(())
}

#[test]
fn test_render_keeps_unknown_placeholders_and_plain_paragraphs() -> Result<()> {
    let template = Template::from_bytes(&common::docx_with_body(common::LETTER_BODY))?;
    let rendered = render(
        &template,
        &record(&[("姓名", "张三"), ("金额", "5000"), ("日期", "2024-03-01")]),
    );

    assert_eq!(
        texts(&rendered),
        vec![
            "律师函",
            "尊敬的张三：您欠款5000元。",
            "日期",
            "2024-03-01",
            "{{客户名称}}",
        ]
    );

    // 沒有被替換的段落保留原有結構與段落屬性
    let title = rendered.paragraphs()[0];
    assert!(title.child("pPr").is_some());
    Ok(())
}

/// 輸出文件是完整的 docx：其他部件原樣保留
#[test]
fn test_rendered_package_keeps_other_parts() -> Result<()> {
    let template = Template::from_bytes(&common::docx_with_body(common::LETTER_BODY))?;
    let bytes = render(&template, &record(&[("姓名", "李四")])).to_bytes()?;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.clone()))?;
    let mut styles = String::new();
    archive.by_name("word/styles.xml")?.read_to_string(&mut styles)?;
    assert!(styles.contains("w:styles"));

    let reopened = Document::from_bytes(&bytes)?;
    assert_eq!(texts(&reopened)[1], "尊敬的李四：您欠款{{金额}}元。");
    Ok(())
}

#[test]
fn test_values_with_markup_are_escaped() -> Result<()> {
    let template = Template::from_bytes(&common::docx_with_body(
        r#"<w:p><w:r><w:t>{{客户名称}}</w:t></w:r></w:p>"#,
    ))?;
    let bytes = render(&template, &record(&[("客户名称", "A&B <公司>")])).to_bytes()?;

    let reopened = Document::from_bytes(&bytes)?;
    assert_eq!(texts(&reopened), vec!["A&B <公司>"]);
    Ok(())
}

#[test]
fn test_corrupt_template_is_rejected() {
    let err = Template::from_bytes(b"PK\x03\x04 broken").unwrap_err();
    assert!(matches!(err, letter_merge::MergeError::DocumentFormat { .. }));
}
