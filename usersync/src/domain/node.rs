//! Format-neutral element tree for exported records.
//!
//! A [`CanonicalNode`] is an element with a name, attributes, text, and
//! ordered children. Documents are read from and written to XML text, and
//! [`CanonicalNode::normalized`] produces the form used for comparison:
//! text trimmed, attributes sorted by name, children sorted by name and
//! then text.

use std::borrow::Cow;
use std::fmt::Display;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

/// Errors raised while reading or writing node documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The document is not well-formed.
    #[error("unreadable document: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },
    /// The document could not be rendered.
    #[error("failed to render document: {message}")]
    Render {
        /// Writer message.
        message: String,
    },
}

impl NodeError {
    fn parse(error: impl Display) -> Self {
        Self::Parse {
            message: error.to_string(),
        }
    }

    fn render(error: impl Display) -> Self {
        Self::Render {
            message: error.to_string(),
        }
    }
}

/// One element of a record document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<CanonicalNode>,
}

impl CanonicalNode {
    /// Create an empty element.
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set an attribute, replacing any earlier value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set the element text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child element holding only `text`.
    #[must_use]
    pub fn with_text_child(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_child(Self::element(name).with_text(text))
    }

    /// Set an attribute in place, replacing any earlier value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let key = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Element text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Child elements in document order.
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Copy of this tree in canonical order for comparison.
    ///
    /// # Examples
    /// ```
    /// use usersync::domain::CanonicalNode;
    ///
    /// let left = CanonicalNode::element("User")
    ///     .with_attribute("Name", "Ada")
    ///     .with_attribute("Email", "ada@example.org")
    ///     .with_text_child("Comments", " hi ");
    /// let right = CanonicalNode::element("User")
    ///     .with_attribute("Email", "ada@example.org")
    ///     .with_attribute("Name", "Ada")
    ///     .with_text_child("Comments", "hi");
    /// assert_eq!(left.normalized(), right.normalized());
    /// ```
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.sort();
        let mut children: Vec<Self> = self.children.iter().map(Self::normalized).collect();
        children.sort_by(|left, right| {
            left.name
                .cmp(&right.name)
                .then_with(|| left.text.cmp(&right.text))
        });
        Self {
            name: self.name.clone(),
            attributes,
            text: self.text.trim().to_owned(),
            children,
        }
    }

    /// Read every top-level element of an XML document.
    ///
    /// Element text is kept verbatim. Whitespace-only text of an element
    /// that has children is layout and is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Parse`] when the document is not well-formed.
    pub fn parse_document(xml: &str) -> Result<Vec<Self>, NodeError> {
        let mut reader = Reader::from_str(xml);

        let mut open: Vec<Self> = Vec::new();
        let mut roots = Vec::new();
        loop {
            match reader.read_event().map_err(NodeError::parse)? {
                Event::Start(start) => open.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let node = Self::from_start(&start)?;
                    attach(&mut open, &mut roots, node);
                }
                Event::End(_) => {
                    let mut node = open
                        .pop()
                        .ok_or_else(|| NodeError::parse("closing tag without opening tag"))?;
                    if !node.children.is_empty() && node.text.trim().is_empty() {
                        node.text.clear();
                    }
                    attach(&mut open, &mut roots, node);
                }
                Event::Text(text) => {
                    let unescaped = text.unescape().map_err(NodeError::parse)?;
                    if let Some(node) = open.last_mut() {
                        node.text.push_str(&unescaped);
                    }
                }
                Event::CData(data) => {
                    if let Some(node) = open.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(NodeError::parse(format!(
                "element <{}> is never closed",
                unclosed.name
            )));
        }
        Ok(roots)
    }

    /// Render this element as an indented XML document with a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Render`] if the writer fails.
    pub fn to_xml(&self) -> Result<String, NodeError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(NodeError::render)?;
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(NodeError::render)
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), NodeError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_empty() && self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(NodeError::render);
        }

        writer
            .write_event(Event::Start(start))
            .map_err(NodeError::render)?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(NodeError::render)?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(NodeError::render)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, NodeError> {
        let name = utf8(start.name().as_ref())?.into_owned();
        let mut node = Self::element(name);
        for attribute in start.attributes() {
            let attribute = attribute.map_err(NodeError::parse)?;
            let key = utf8(attribute.key.as_ref())?.into_owned();
            let value = attribute.unescape_value().map_err(NodeError::parse)?;
            node.set_attribute(key, value.into_owned());
        }
        Ok(node)
    }
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>, NodeError> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(NodeError::parse)
}

fn attach(open: &mut [CanonicalNode], roots: &mut Vec<CanonicalNode>, node: CanonicalNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}
