use crate::document::paragraph::{for_each_paragraph, for_each_paragraph_mut};
use crate::document::xml::{XmlDocument, XmlElement};
use crate::utils::error::{MergeError, Result};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

pub const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    compression: CompressionMethod,
    data: Vec<u8>,
}

/// 一份 .docx 文件：zip 包中除 `word/document.xml` 外的內容原樣保留
#[derive(Debug, Clone)]
pub struct Document {
    entries: Vec<PackageEntry>,
    body_xml: XmlDocument,
}

impl Document {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| MergeError::document_format(format!("not a valid .docx package: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut body_xml = None;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| MergeError::document_format(format!("corrupt package entry {}: {}", i, e)))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(|e| {
                MergeError::document_format(format!("cannot read package entry {}: {}", file.name(), e))
            })?;

            if file.name() == DOCUMENT_PART {
                let text = std::str::from_utf8(&data).map_err(|e| {
                    MergeError::document_format(format!("{} is not UTF-8: {}", DOCUMENT_PART, e))
                })?;
                body_xml = Some(XmlDocument::parse(text)?);
            }

            entries.push(PackageEntry {
                name: file.name().to_string(),
                compression: file.compression(),
                data,
            });
        }

        let body_xml = body_xml.ok_or_else(|| {
            MergeError::document_format(format!("package has no {}", DOCUMENT_PART))
        })?;

        if body_xml.root.child("body").is_none() {
            return Err(MergeError::document_format("document has no <w:body>"));
        }

        Ok(Self { entries, body_xml })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            MergeError::document_format(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn body(&self) -> Option<&XmlElement> {
        self.body_xml.root.child("body")
    }

    pub fn body_mut(&mut self) -> Option<&mut XmlElement> {
        self.body_xml.root.child_mut("body")
    }

    pub fn paragraphs(&self) -> Vec<&XmlElement> {
        let mut paragraphs = Vec::new();
        if let Some(body) = self.body() {
            for_each_paragraph(body, &mut |p| paragraphs.push(p));
        }
        paragraphs
    }

    pub fn for_each_paragraph_mut(&mut self, f: &mut dyn FnMut(&mut XmlElement)) {
        if let Some(body) = self.body_mut() {
            for_each_paragraph_mut(body, f);
        }
    }

    /// 重新打包；只有正文部分重新序列化
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = self.body_xml.to_bytes()?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let options = FileOptions::default().compression_method(entry.compression);
            zip.start_file::<_, ()>(entry.name.as_str(), options)?;
            if entry.name == DOCUMENT_PART {
                zip.write_all(&body)?;
            } else {
                zip.write_all(&entry.data)?;
            }
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// 只讀模板；每次渲染都複製出獨立的 [`Document`]
#[derive(Debug, Clone)]
pub struct Template {
    document: Document,
}

impl Template {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            document: Document::from_bytes(bytes)?,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            document: Document::open(path)?,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn instantiate(&self) -> Document {
        self.document.clone()
    }
}
