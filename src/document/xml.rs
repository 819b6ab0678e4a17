use crate::utils::error::{MergeError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// XML 節點；註解、CDATA 等非結構內容原樣保留
#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Other(Event<'static>),
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// 去掉命名空間前綴的標籤名，例如 `w:p` -> `p`
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn is(&self, local_name: &str) -> bool {
        self.local_name() == local_name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(local_name))
    }

    pub fn child_mut(&mut self, local_name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.is(local_name))
    }

    /// 直接子節點中的文字
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    declaration: Option<BytesDecl<'static>>,
    prolog: Vec<XmlNode>,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut root = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| MergeError::document_format(format!("malformed XML: {}", e)))?;
            match event {
                Event::Decl(decl) => declaration = Some(decl.into_owned()),
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| MergeError::document_format("unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    // 根元素以外的空白不保留
                    if let Some(parent) = stack.last_mut() {
                        let text = text
                            .unescape()
                            .map_err(|e| MergeError::document_format(format!("malformed text: {}", e)))?;
                        parent.children.push(XmlNode::Text(text.into_owned()));
                    }
                }
                Event::Eof => break,
                other => {
                    let node = XmlNode::Other(other.into_owned());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None if root.is_none() => prolog.push(node),
                        None => {}
                    }
                }
            }
        }

        if !stack.is_empty() {
            return Err(MergeError::document_format(format!(
                "unclosed element <{}>",
                stack.last().map(|el| el.name.as_str()).unwrap_or_default()
            )));
        }

        let root = root.ok_or_else(|| MergeError::document_format("document has no root element"))?;

        Ok(Self {
            declaration,
            prolog,
            root,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(decl.clone()))?;
            writer.get_mut().extend_from_slice(b"\r\n");
        }
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;

        Ok(writer.into_inner())
    }
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MergeError::document_format(format!("malformed attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| MergeError::document_format(format!("malformed attribute: {}", e)))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(MergeError::document_format("multiple root elements")),
    }
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<()> {
    match node {
        XmlNode::Element(el) => write_element(writer, el)?,
        XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        XmlNode::Other(event) => writer.write_event(event)?,
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_write_keeps_structure() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t xml:space="preserve">A &amp; B </w:t></w:r></w:p><!-- note --><w:sectPr/></w:body></w:document>"#;

        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(doc.root.name, "w:document");

        let body = doc.root.child("body").unwrap();
        let text = body.child("p").unwrap().child("r").unwrap().child("t").unwrap();
        assert_eq!(text.text(), "A & B ");
        assert_eq!(text.attribute("xml:space"), Some("preserve"));

        let written = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(written.starts_with("<?xml"));
        assert!(written.contains("A &amp; B "));
        assert!(written.contains("<!-- note -->"));
        assert!(written.contains("<w:sectPr/>"));

        let reparsed = XmlDocument::parse(&written).unwrap();
        assert_eq!(reparsed.root.child("body").unwrap().children.len(), 3);
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        for xml in ["<w:document><w:body></w:document>", "<w:p></w:r>", "<w:p a=\"&bogus;\"/>", ""] {
            let err = XmlDocument::parse(xml).unwrap_err();
            assert!(matches!(err, MergeError::DocumentFormat { .. }), "{}: {:?}", xml, err);
        }
    }
}
