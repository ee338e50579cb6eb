//! Owned XML element tree
//!
//! The input document is parsed once with `roxmltree` and copied into an owned
//! [`Element`] tree. Passes that rewrite the document (depth renumbering) build
//! new trees from it, and every artifact that is itself XML (structure,
//! animation, SVG, HTML) is serialized through [`Element::to_xml_string`].

use crate::error::{ParseError, Span};

/// An XML element with its attributes in document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated non-whitespace text content, if any
    pub text: Option<String>,
    /// Byte range of the element in the source text (empty for built elements)
    pub span: Span,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a document and return its root element
    pub fn parse_document(source: &str) -> Result<Element, ParseError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(source, options).map_err(|err| {
            let pos = err.pos();
            let offset = text_pos_to_offset(source, pos.row, pos.col);
            ParseError::Xml {
                span: offset..offset,
                message: err.to_string(),
            }
        })?;
        Ok(Self::from_node(doc.root_element()))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut elem = Element::new(node.tag_name().name());
        elem.span = node.range();
        elem.attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let mut text = String::new();
        for child in node.children() {
            if child.is_element() {
                elem.children.push(Self::from_node(child));
            } else if child.is_text() {
                if let Some(t) = child.text() {
                    text.push_str(t.trim());
                }
            }
        }
        if !text.is_empty() {
            elem.text = Some(text);
        }
        elem
    }

    /// Look up an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Builder form of [`Element::set_attr`]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Append a child element
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Builder form of [`Element::push`]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// First child with the given tag name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable access to the first child with the given tag name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Follow a `/`-separated path of tag names, taking the first match at each step
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |elem, step| elem.child(step))
    }

    /// Every element reachable by a `/`-separated path of tag names
    ///
    /// `*` as the last step matches any tag name.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut current = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter())
                .filter(|c| step == "*" || c.name == step)
                .collect();
        }
        current
    }

    /// Serialize the element and its descendants
    pub fn to_xml_string(&self, pretty: bool) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0, pretty);
        out
    }

    fn write_into(&self, out: &mut String, level: usize, pretty: bool) {
        if pretty {
            out.push_str(&"  ".repeat(level));
        }
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push_str(&format!(r#" {}="{}""#, k, escape_xml(v)));
        }

        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
            if pretty {
                out.push('\n');
            }
            return;
        }

        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape_xml(text));
        }
        if !self.children.is_empty() {
            if pretty {
                out.push('\n');
            }
            for child in &self.children {
                child.write_into(out, level + 1, pretty);
            }
            if pretty {
                out.push_str(&"  ".repeat(level));
            }
        }
        out.push_str(&format!("</{}>", self.name));
        if pretty {
            out.push('\n');
        }
    }
}

/// Escape special XML characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn text_pos_to_offset(source: &str, row: u32, col: u32) -> usize {
    let mut offset = 0;
    for (i, line) in source.split_inclusive('\n').enumerate() {
        if i + 1 == row as usize {
            let chars = line.chars().take(col.saturating_sub(1) as usize);
            return offset + chars.map(char::len_utf8).sum::<usize>();
        }
        offset += line.len();
    }
    source.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<swf version="8">
  <Header framerate="24">
    <tags>
      <ShowFrame/>
      <DoAction><actions>data</actions></DoAction>
    </tags>
  </Header>
</swf>"#;

    #[test]
    fn test_parse_and_find() {
        let root = Element::parse_document(DOC).unwrap();
        assert_eq!(root.name, "swf");
        assert_eq!(root.attr("version"), Some("8"));
        let header = root.find("Header").unwrap();
        assert_eq!(header.attr("framerate"), Some("24"));
        let tags = root.find_all("Header/tags/*");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[1].name, "DoAction");
        assert_eq!(
            root.find("Header/tags/DoAction/actions").unwrap().text.as_deref(),
            Some("data")
        );
    }

    #[test]
    fn test_span_points_at_element() {
        let root = Element::parse_document(DOC).unwrap();
        let header = root.find("Header").unwrap();
        assert!(DOC[header.span.clone()].starts_with("<Header"));
    }

    #[test]
    fn test_malformed_document() {
        let err = Element::parse_document("<swf><Header></swf>").unwrap_err();
        assert!(matches!(err, ParseError::Xml { .. }));
    }

    #[test]
    fn test_set_attr_keeps_order() {
        let mut e = Element::new("PlaceObject2")
            .with_attr("replace", "1")
            .with_attr("depth", "3");
        e.set_attr("replace", "0");
        e.set_attr("objectID", "7");
        assert_eq!(
            e.to_xml_string(false),
            r#"<PlaceObject2 replace="0" depth="3" objectID="7"/>"#
        );
    }

    #[test]
    fn test_pretty_serialization() {
        let e = Element::new("a").with_child(Element::new("b").with_attr("x", "<&>"));
        assert_eq!(
            e.to_xml_string(true),
            "<a>\n  <b x=\"&lt;&amp;&gt;\"/>\n</a>\n"
        );
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b"), "a &lt; b");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml(r#""q""#), "&quot;q&quot;");
    }
}
