#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#;

/// 律師函模板：段落中的變量被拆成多個 run，表格中有日期
pub const LETTER_BODY: &str = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>律师函</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">尊敬的{{</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>姓名}}：您欠款</w:t></w:r><w:r><w:t>{{金额}}元。</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>日期</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>{{日期}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>{{客户名称}}</w:t></w:r></w:p>"#;

/// 以正文內容組出 .docx（含樣式部件，確認其他部件原樣保留）
pub fn docx_with_body(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", RELS),
        ("word/document.xml", document.as_str()),
        ("word/styles.xml", STYLES),
    ] {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file::<_, ()>(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_letter_template(path: &Path) {
    std::fs::write(path, docx_with_body(LETTER_BODY)).unwrap();
}

/// 寫出第一個工作表為 `rows`（第一行為表頭）的 xlsx
pub fn write_workbook(path: &Path, rows: &[&[&str]]) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();

    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell = sheet.get_cell_mut(((c + 1) as u32, (r + 1) as u32));
            cell.set_value_string(*value);
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}
