//! Minimal XML element tree for skin files

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;

use super::SkinError;

/// One parsed XML element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed text content
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parse a document and return its root element
    pub fn parse(source: &str) -> Result<Self, SkinError> {
        let mut reader = Reader::from_str(source);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position();
            let xml_err = |reason: String| SkinError::Xml { position, reason };

            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => stack.push(Self::from_start(e).map_err(xml_err)?),
                Ok(Event::Empty(ref e)) => {
                    let element = Self::from_start(e).map_err(xml_err)?;
                    Self::attach(&mut stack, &mut root, element, position)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| xml_err("closing tag without opening tag".to_string()))?;
                    Self::attach(&mut stack, &mut root, element, position)?;
                }
                Ok(Event::Text(ref e)) => {
                    let text = e.unescape().map_err(|err| xml_err(err.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(text.trim());
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(String::from_utf8_lossy(&e.into_inner()).trim());
                    }
                }
                Ok(Event::Eof) => break,
                Err(err) => return Err(xml_err(err.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(SkinError::Xml {
                position: reader.buffer_position(),
                reason: format!("unclosed element <{}>", stack[stack.len() - 1].name),
            });
        }
        root.ok_or(SkinError::MissingRoot)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| format!("attribute error: {e}"))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(|e| e.to_string())?.to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
        position: usize,
    ) -> Result<(), SkinError> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(element);
        } else if root.is_none() {
            *root = Some(element);
        } else {
            return Err(SkinError::Xml {
                position,
                reason: "multiple root elements".to_string(),
            });
        }
        Ok(())
    }

    /// Attribute value by name (case-insensitive)
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parse an attribute value
    pub fn attr_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SkinError> {
        self.attr(name).map(|text| parse_value(name, text)).transpose()
    }

    /// First child with the given tag name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// All children with the given tag name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name.eq_ignore_ascii_case(name))
    }

    /// Text of the first child with the given tag name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Parse the text of the first child with the given tag name
    pub fn child_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SkinError> {
        self.child_text(name).map(|text| parse_value(name, text)).transpose()
    }

    /// Boolean child text (`true`/`yes`/`1`)
    pub fn child_bool(&self, name: &str) -> Option<bool> {
        self.child_text(name).map(parse_bool)
    }
}

/// Skin-style boolean
pub fn parse_bool(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "true" | "yes" | "1" | "on")
}

fn parse_value<T: FromStr>(element: &str, text: &str) -> Result<T, SkinError> {
    text.trim().parse::<T>().map_err(|_| SkinError::InvalidValue {
        element: element.to_string(),
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let root = XmlElement::parse(
            r#"<?xml version="1.0"?>
            <window id="3">
                <defaultcontrol always="true">10</defaultcontrol>
                <controls>
                    <control type="image" id="1"><texture>bg.png</texture></control>
                    <control type="label"/>
                </controls>
            </window>"#,
        )
        .unwrap();

        assert_eq!(root.name, "window");
        assert_eq!(root.attr("ID"), Some("3"));
        assert_eq!(root.child_value::<i32>("defaultcontrol").unwrap(), Some(10));
        assert_eq!(root.child("defaultcontrol").unwrap().attr("always"), Some("true"));

        let controls: Vec<_> = root.child("controls").unwrap().children_named("control").collect();
        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].child_text("texture"), Some("bg.png"));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let root = XmlElement::parse(r#"<visible cond="a &amp; b">!x + y</visible>"#).unwrap();
        assert_eq!(root.attr("cond"), Some("a & b"));
        assert_eq!(root.text, "!x + y");
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(XmlElement::parse(""), Err(SkinError::MissingRoot)));
        assert!(XmlElement::parse("<window><controls></window>").is_err());
        assert!(XmlElement::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_invalid_value() {
        let root = XmlElement::parse("<window><zorder>high</zorder></window>").unwrap();
        assert!(matches!(
            root.child_value::<i32>("zorder"),
            Err(SkinError::InvalidValue { .. })
        ));
        assert_eq!(root.child_value::<i32>("missing").unwrap(), None);
    }
}
