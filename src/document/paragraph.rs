//! 段落與文字片段（run）的讀寫。
//!
//! Word 會因格式編輯把同一行文字拆成多個 `w:r`，
//! 所以變量必須在整段拼接後的文字上匹配，不能逐個 run 處理。

use crate::document::xml::{XmlElement, XmlNode};

/// 包住 run 的行內容器，其中的文字仍屬於本段落
const RUN_CONTAINERS: &[&str] = &["hyperlink", "ins", "smartTag"];

/// 走訪正文段落、所有表格（含巢狀表格）儲存格與內容控制項中的段落
pub fn for_each_paragraph<'a>(container: &'a XmlElement, f: &mut dyn FnMut(&'a XmlElement)) {
    for child in container.elements() {
        match child.local_name() {
            "p" => f(child),
            "tbl" => {
                for row in child.elements().filter(|el| el.is("tr")) {
                    for cell in row.elements().filter(|el| el.is("tc")) {
                        for_each_paragraph(cell, f);
                    }
                }
            }
            "sdt" => {
                if let Some(content) = child.child("sdtContent") {
                    for_each_paragraph(content, f);
                }
            }
            _ => {}
        }
    }
}

pub fn for_each_paragraph_mut(container: &mut XmlElement, f: &mut dyn FnMut(&mut XmlElement)) {
    for child in container.elements_mut() {
        let kind = child.local_name().to_owned();
        match kind.as_str() {
            "p" => f(child),
            "tbl" => {
                for row in child.elements_mut().filter(|el| el.is("tr")) {
                    for cell in row.elements_mut().filter(|el| el.is("tc")) {
                        for_each_paragraph_mut(cell, f);
                    }
                }
            }
            "sdt" => {
                if let Some(content) = child.child_mut("sdtContent") {
                    for_each_paragraph_mut(content, f);
                }
            }
            _ => {}
        }
    }
}

fn collect_runs<'a>(parent: &'a XmlElement, runs: &mut Vec<&'a XmlElement>) {
    for child in parent.elements() {
        if child.is("r") {
            runs.push(child);
        } else if RUN_CONTAINERS.contains(&child.local_name()) {
            collect_runs(child, runs);
        }
    }
}

pub fn runs(paragraph: &XmlElement) -> Vec<&XmlElement> {
    let mut runs = Vec::new();
    collect_runs(paragraph, &mut runs);
    runs
}

pub fn run_text(run: &XmlElement) -> String {
    let mut text = String::new();
    for child in run.elements() {
        match child.local_name() {
            "t" => text.push_str(&child.text()),
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            "noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }
    text
}

/// 段落的完整邏輯文字（所有 run 拼接）
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    runs(paragraph).into_iter().map(run_text).collect()
}

/// 以單一 run 取代段落內容，保留段落屬性與第一個 run 的字元格式
pub fn replace_paragraph_text(paragraph: &mut XmlElement, text: &str) {
    let run_properties = runs(paragraph)
        .first()
        .and_then(|run| run.child("rPr"))
        .cloned();

    paragraph
        .children
        .retain(|node| matches!(node, XmlNode::Element(el) if el.is("pPr")));
    paragraph
        .children
        .push(XmlNode::Element(build_run(run_properties, text)));
}

fn build_run(properties: Option<XmlElement>, text: &str) -> XmlElement {
    let mut run = XmlElement::new("w:r");
    if let Some(properties) = properties {
        run.children.push(XmlNode::Element(properties));
    }

    let mut pending = String::new();
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush_text(&mut run, &mut pending);
                run.children.push(XmlNode::Element(XmlElement::new("w:tab")));
            }
            '\n' | '\r' => {
                flush_text(&mut run, &mut pending);
                run.children.push(XmlNode::Element(XmlElement::new("w:br")));
            }
            c => pending.push(c),
        }
    }
    flush_text(&mut run, &mut pending);
    run
}

fn flush_text(run: &mut XmlElement, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let t = XmlElement::new("w:t")
        .with_attribute("xml:space", "preserve")
        .with_text(std::mem::take(pending));
    run.children.push(XmlNode::Element(t));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::xml::XmlDocument;

    fn parse_paragraph(xml: &str) -> XmlElement {
        let wrapped = format!(r#"<w:p xmlns:w="urn:w">{}</w:p>"#, xml);
        XmlDocument::parse(&wrapped).unwrap().root
    }

    #[test]
    fn test_paragraph_text_joins_split_runs() {
        let p = parse_paragraph(
            r#"<w:r><w:t>尊敬的{</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>{姓</w:t></w:r><w:hyperlink><w:r><w:t>名}}</w:t></w:r></w:hyperlink><w:r><w:tab/><w:t>：</w:t></w:r>"#,
        );
        assert_eq!(paragraph_text(&p), "尊敬的{{姓名}}\t：");
    }

    #[test]
    fn test_deleted_text_is_ignored() {
        let p = parse_paragraph(r#"<w:r><w:t>保留</w:t></w:r><w:del><w:r><w:delText>删除</w:delText></w:r></w:del>"#);
        assert_eq!(paragraph_text(&p), "保留");
    }

    #[test]
    fn test_replace_collapses_runs_and_keeps_formatting() {
        let mut p = parse_paragraph(
            r#"<w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:sz w:val="28"/></w:rPr><w:t>{{</w:t></w:r><w:r><w:t>姓名}}</w:t></w:r><w:bookmarkStart w:id="0"/>"#,
        );
        replace_paragraph_text(&mut p, " 张三\n第二行");

        let names: Vec<&str> = p.elements().map(|el| el.local_name()).collect();
        assert_eq!(names, vec!["pPr", "r"]);

        let run = p.child("r").unwrap();
        assert!(run.child("rPr").unwrap().child("sz").is_some());
        assert!(run.child("br").is_some());
        assert_eq!(paragraph_text(&p), " 张三\n第二行");
        assert_eq!(run.child("t").unwrap().attribute("xml:space"), Some("preserve"));
    }

    #[test]
    fn test_traversal_reaches_nested_tables_and_content_controls() {
        let body = XmlDocument::parse(
            r#"<w:body xmlns:w="urn:w">
                <w:p><w:r><w:t>一</w:t></w:r></w:p>
                <w:tbl><w:tr><w:tc>
                    <w:p><w:r><w:t>二</w:t></w:r></w:p>
                    <w:tbl><w:tr><w:tc><w:p><w:r><w:t>三</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
                </w:tc></w:tr></w:tbl>
                <w:sdt><w:sdtContent><w:p><w:r><w:t>四</w:t></w:r></w:p></w:sdtContent></w:sdt>
            </w:body>"#,
        )
        .unwrap()
        .root;

        let mut texts = Vec::new();
        for_each_paragraph(&body, &mut |p| texts.push(paragraph_text(p)));
        assert_eq!(texts, vec!["一", "二", "三", "四"]);
    }
}
