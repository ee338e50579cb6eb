//! Error types for parsing and validation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::xml::Element;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed XML at {span:?}: {message}")]
    Xml { span: Span, message: String },

    #[error("<{tag}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        tag: String,
        attribute: String,
        span: Span,
    },

    #[error("<{tag}> has invalid value '{value}' for attribute '{attribute}'")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
        span: Span,
    },

    #[error("<{tag}> is missing required element '{path}'")]
    MissingElement {
        tag: String,
        path: String,
        span: Span,
    },
}

impl ParseError {
    /// Create a missing-attribute error for an element
    pub fn missing_attribute(elem: &Element, attribute: &str) -> Self {
        ParseError::MissingAttribute {
            tag: elem.name.clone(),
            attribute: attribute.to_string(),
            span: elem.span.clone(),
        }
    }

    /// Create an invalid-attribute error for an element
    pub fn invalid_attribute(elem: &Element, attribute: &str, value: &str) -> Self {
        ParseError::InvalidAttribute {
            tag: elem.name.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            span: elem.span.clone(),
        }
    }

    /// Create a missing-element error for an element
    pub fn missing_element(elem: &Element, path: &str) -> Self {
        ParseError::MissingElement {
            tag: elem.name.clone(),
            path: path.to_string(),
            span: elem.span.clone(),
        }
    }

    /// Source range the error refers to
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Xml { span, .. }
            | ParseError::MissingAttribute { span, .. }
            | ParseError::InvalidAttribute { span, .. }
            | ParseError::MissingElement { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = char_span(source, self.span());
        let label = match self {
            ParseError::Xml { message, .. } => message.clone(),
            ParseError::MissingAttribute { attribute, .. } => {
                format!("add a '{}' attribute here", attribute)
            }
            ParseError::InvalidAttribute { attribute, .. } => {
                format!("'{}' must be a number", attribute)
            }
            ParseError::MissingElement { path, .. } => format!("expected a <{}> child", path),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(label)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| self.to_string()),
            Err(_) => self.to_string(),
        }
    }
}

/// Byte span to the char span ariadne indexes its source by
fn char_span(source: &str, span: &Span) -> Span {
    let to_char = |i: usize| {
        source
            .get(..i)
            .map_or_else(|| source.chars().count(), |s| s.chars().count())
    };
    to_char(span.start)..to_char(span.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_tag_and_attribute() {
        let elem = Element::new("PlaceObject2");
        let err = ParseError::missing_attribute(&elem, "depth");
        assert_eq!(
            err.to_string(),
            "<PlaceObject2> is missing required attribute 'depth'"
        );

        let err = ParseError::invalid_attribute(&elem, "depth", "abc");
        assert_eq!(
            err.to_string(),
            "<PlaceObject2> has invalid value 'abc' for attribute 'depth'"
        );
    }

    #[test]
    fn test_format_includes_source_line() {
        let source = "<swf>\n  <PlaceObject2 objectID=\"1\"/>\n</swf>";
        let start = source.find("<PlaceObject2").unwrap();
        let err = ParseError::MissingAttribute {
            tag: "PlaceObject2".to_string(),
            attribute: "depth".to_string(),
            span: start..start + 28,
        };
        let report = err.format(source, "movie.xml");
        assert!(report.contains("movie.xml"));
        assert!(report.contains("add a 'depth' attribute here"));
    }

    #[test]
    fn test_char_span_counts_multibyte_text() {
        let source = "<a name=\"ねこ\"/><b/>";
        let start = source.find("<b/>").unwrap();
        assert_eq!(char_span(source, &(start..start + 4)), 14..18);
        assert_eq!(char_span(source, &(0..3)), 0..3);
    }

    #[test]
    fn test_format_points_at_tag_after_multibyte_name() {
        let source = "<swf name=\"ねこねこねこ\">\n  <PlaceObject2 objectID=\"1\"/>\n</swf>";
        let start = source.find("<PlaceObject2").unwrap();
        let err = ParseError::MissingAttribute {
            tag: "PlaceObject2".to_string(),
            attribute: "depth".to_string(),
            span: start..start + 28,
        };
        let report = err.format(source, "movie.xml");
        assert!(report.contains("movie.xml:2:3"), "{}", report);
        assert!(report.contains("add a 'depth' attribute here"));
    }
}
