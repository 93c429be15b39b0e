//! Command payload parsing.
//!
//! Inbound commands use a small XML dialect with exactly one element per
//! message:
//!
//! ```text
//! <lc id="..." addr="N" dir="true|false" V="int" V_max="int"/>
//! <fn id="..." addr="N" fnchanged="1..N" fnchangedstate="true|false"/>
//! <sys cmd="ebreak|stop|shutdown|go|..."/>
//! ```
//!
//! [`Document::parse`] turns the raw text into an owned tree of
//! [`Element`]s. The parse is all-or-nothing: a malformed payload yields a
//! [`ParseError`] and no partial tree. Interpreting the tree is the job of
//! [`crate::router`].
//!
//! # Example
//!
//! ```rust
//! use rs_loconode::parsing::Document;
//!
//! let doc = Document::parse(r#"<lc id="t1" addr="42" dir="true" V="50" V_max="100"/>"#).unwrap();
//! let root = doc.root();
//! assert_eq!(root.name(), "lc");
//! assert_eq!(root.int_attribute("addr"), Ok(42));
//! assert_eq!(root.str_attribute("dir"), Ok("true"));
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Reasons a payload could not be parsed into a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The payload was empty or whitespace only.
    #[error("empty payload")]
    Empty,
    /// The payload bytes were not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    /// The payload was not well-formed markup.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Failure to read a typed attribute from an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// The attribute is not present on the element.
    #[error("missing attribute `{0}`")]
    Missing(&'static str),
    /// The attribute is present but its value has the wrong type.
    #[error("attribute `{name}` has wrong type: {value:?}")]
    WrongType {
        /// Attribute name.
        name: &'static str,
        /// Raw attribute value.
        value: String,
    },
}

/// A parsed command document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse a document from text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let doc = roxmltree::Document::parse(text)
            .map_err(|e| ParseError::Malformed(e.to_string()))?;

        Ok(Self {
            root: Element::from_node(doc.root_element()),
        })
    }

    /// Parse a document from raw payload bytes.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, ParseError> {
        let text = core::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8)?;
        Self::parse(text)
    }

    /// The single top-level element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Returns the top-level element if its name matches.
    pub fn top_level(&self, name: &str) -> Option<&Element> {
        (self.root.name == name).then_some(&self.root)
    }
}

/// A named node with attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        Self {
            name: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            children: node
                .children()
                .filter(|n| n.is_element())
                .map(Element::from_node)
                .collect(),
        }
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child elements in document order.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Raw attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Required string attribute.
    pub fn str_attribute(&self, name: &'static str) -> Result<&str, AttributeError> {
        self.attribute(name).ok_or(AttributeError::Missing(name))
    }

    /// Required integer attribute (decimal, surrounding whitespace allowed).
    pub fn int_attribute(&self, name: &'static str) -> Result<i32, AttributeError> {
        let raw = self.str_attribute(name)?;
        raw.trim()
            .parse::<i32>()
            .map_err(|_| AttributeError::WrongType {
                name,
                value: raw.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_loco_element() {
        let doc =
            Document::parse(r#"<lc id="t1" addr="42" dir="true" V="50" V_max="100"/>"#).unwrap();
        let lc = doc.top_level("lc").unwrap();
        assert_eq!(lc.str_attribute("id"), Ok("t1"));
        assert_eq!(lc.int_attribute("addr"), Ok(42));
        assert_eq!(lc.int_attribute("V"), Ok(50));
        assert_eq!(lc.int_attribute("V_max"), Ok(100));
        assert!(lc.children().is_empty());
    }

    #[test]
    fn top_level_name_mismatch() {
        let doc = Document::parse(r#"<sys cmd="go"/>"#).unwrap();
        assert!(doc.top_level("lc").is_none());
        assert!(doc.top_level("sys").is_some());
    }

    #[test]
    fn nested_children_are_kept() {
        let doc = Document::parse(r#"<sys cmd="go"><note text="x"/></sys>"#).unwrap();
        assert_eq!(doc.root().children().len(), 1);
        assert_eq!(doc.root().children()[0].name(), "note");
    }

    #[test]
    fn empty_payload() {
        assert_eq!(Document::parse(""), Err(ParseError::Empty));
        assert_eq!(Document::parse("   \n"), Err(ParseError::Empty));
    }

    #[test]
    fn unterminated_element_is_malformed() {
        assert!(matches!(
            Document::parse(r#"<lc id="t1""#),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn plain_text_is_malformed() {
        assert!(matches!(
            Document::parse("speed=50"),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn two_roots_are_malformed() {
        assert!(matches!(
            Document::parse(r#"<sys cmd="stop"/><sys cmd="go"/>"#),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn invalid_utf8_bytes() {
        assert_eq!(
            Document::from_bytes(&[0x3c, 0xff, 0xfe]),
            Err(ParseError::InvalidUtf8)
        );
    }

    #[test]
    fn missing_attribute() {
        let doc = Document::parse(r#"<lc id="t1"/>"#).unwrap();
        assert_eq!(
            doc.root().int_attribute("addr"),
            Err(AttributeError::Missing("addr"))
        );
    }

    #[test]
    fn non_numeric_integer_attribute() {
        let doc = Document::parse(r#"<lc addr="forty"/>"#).unwrap();
        assert_eq!(
            doc.root().int_attribute("addr"),
            Err(AttributeError::WrongType {
                name: "addr",
                value: "forty".into()
            })
        );
    }

    #[test]
    fn fractional_integer_attribute_is_wrong_type() {
        let doc = Document::parse(r#"<lc V="1.5"/>"#).unwrap();
        assert!(matches!(
            doc.root().int_attribute("V"),
            Err(AttributeError::WrongType { name: "V", .. })
        ));
    }

    #[test]
    fn integer_attribute_with_whitespace() {
        let doc = Document::parse(r#"<lc V=" 12 "/>"#).unwrap();
        assert_eq!(doc.root().int_attribute("V"), Ok(12));
    }

    #[test]
    fn negative_integer_attribute() {
        let doc = Document::parse(r#"<lc V="-3"/>"#).unwrap();
        assert_eq!(doc.root().int_attribute("V"), Ok(-3));
    }

    #[test]
    fn xml_declaration_is_accepted() {
        let doc = Document::parse("<?xml version=\"1.0\"?>\n<sys cmd=\"stop\"/>").unwrap();
        assert_eq!(doc.root().name(), "sys");
    }
}
