//! Element node and kind definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminated node kind.
///
/// The set is closed over everything the composition engine understands;
/// tags it has never seen land in `Other` and are traversed transparently so
/// newer hosts can pass richer trees through older engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Text,
    Mention,
    Channel,
    Link,
    Paragraph,
    LineBreak,
    Quote,
    Image,
    Audio,
    Video,
    File,
    Message,
    Author,
    Divider,
    Card,
    Section,
    Note,
    Icon,
    Form,
    Input,
    Button,
    ButtonGroup,
    System,
    ShareChat,
    ShareUser,
    Other(String),
}

impl ElementKind {
    /// Maps a tag name to a kind. Platform-prefixed extension tags
    /// (`lark:card`, `feishu:note`, ...) are matched on the local part.
    pub fn from_tag(tag: &str) -> Self {
        let local = match tag.split_once(':') {
            Some((_, local)) => local,
            None => tag,
        };
        match local {
            "text" => Self::Text,
            "at" => Self::Mention,
            "sharp" => Self::Channel,
            "a" | "link" => Self::Link,
            "p" => Self::Paragraph,
            "br" => Self::LineBreak,
            "quote" => Self::Quote,
            "img" | "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "file" => Self::File,
            "figure" | "message" => Self::Message,
            "author" => Self::Author,
            "hr" => Self::Divider,
            "card" => Self::Card,
            "div" => Self::Section,
            "note" => Self::Note,
            "icon" => Self::Icon,
            "form" => Self::Form,
            "input" => Self::Input,
            "button" => Self::Button,
            "button-group" => Self::ButtonGroup,
            "system" => Self::System,
            "share-chat" => Self::ShareChat,
            "share-user" => Self::ShareUser,
            _ => Self::Other(tag.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Mention => "at",
            Self::Channel => "sharp",
            Self::Link => "a",
            Self::Paragraph => "p",
            Self::LineBreak => "br",
            Self::Quote => "quote",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::File => "file",
            Self::Message => "message",
            Self::Author => "author",
            Self::Divider => "hr",
            Self::Card => "card",
            Self::Section => "div",
            Self::Note => "note",
            Self::Icon => "icon",
            Self::Form => "form",
            Self::Input => "input",
            Self::Button => "button",
            Self::ButtonGroup => "button-group",
            Self::System => "system",
            Self::ShareChat => "share-chat",
            Self::ShareUser => "share-user",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

/// One node of the canonical rich-message tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Text leaf with its content stored under the `content` attribute.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(ElementKind::Text).with_attr("content", content.into())
    }

    pub fn from_tag(tag: &str) -> Self {
        Self::new(ElementKind::from_tag(tag))
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        match self.attrs.get(key) {
            Some(Value::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// String form of an attribute, stringifying numeric ids as hosts often
    /// carry them either way.
    pub fn attr_string(&self, key: &str) -> Option<String> {
        match self.attrs.get(key) {
            Some(Value::String(value)) => Some(value.clone()),
            Some(Value::Number(value)) => Some(value.to_string()),
            _ => None,
        }
    }

    /// Truthiness for flag-style attributes: absent, `false`, `"false"`, `""`
    /// and `0` are all false; everything else is true.
    pub fn attr_bool(&self, key: &str) -> bool {
        match self.attrs.get(key) {
            Some(Value::Bool(value)) => *value,
            Some(Value::String(value)) => !value.is_empty() && value != "false",
            Some(Value::Number(value)) => value.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        match self.attrs.get(key) {
            Some(Value::Number(value)) => value.as_u64(),
            Some(Value::String(value)) => value.parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tag_maps_known_and_prefixed_tags() {
        assert_eq!(ElementKind::from_tag("at"), ElementKind::Mention);
        assert_eq!(ElementKind::from_tag("img"), ElementKind::Image);
        assert_eq!(ElementKind::from_tag("lark:card"), ElementKind::Card);
        assert_eq!(ElementKind::from_tag("feishu:note"), ElementKind::Note);
        assert_eq!(
            ElementKind::from_tag("onebot:music"),
            ElementKind::Other("onebot:music".to_string())
        );
    }

    #[test]
    fn attr_bool_follows_flag_truthiness() {
        let element = Element::new(ElementKind::Message)
            .with_attr("forward", true)
            .with_attr("empty", "")
            .with_attr("word", "yes")
            .with_attr("zero", 0)
            .with_attr("negated", "false");
        assert!(element.attr_bool("forward"));
        assert!(element.attr_bool("word"));
        assert!(!element.attr_bool("empty"));
        assert!(!element.attr_bool("zero"));
        assert!(!element.attr_bool("negated"));
        assert!(!element.attr_bool("absent"));
    }

    #[test]
    fn builder_produces_expected_tree() {
        let tree = Element::from_tag("p")
            .with_child(Element::text("hello"))
            .with_child(Element::from_tag("at").with_attr("id", "42"));
        assert_eq!(tree.kind, ElementKind::Paragraph);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].attr_str("content"), Some("hello"));
        assert_eq!(tree.children[1].attr_str("id"), Some("42"));
    }

    #[test]
    fn attr_string_stringifies_numeric_ids() {
        let element = Element::new(ElementKind::Mention)
            .with_attr("id", 42)
            .with_attr("name", "Alice");
        assert_eq!(element.attr_string("id").as_deref(), Some("42"));
        assert_eq!(element.attr_string("name").as_deref(), Some("Alice"));
        assert_eq!(element.attr_string("missing"), None);
    }

    #[test]
    fn attr_u64_accepts_numbers_and_digit_strings() {
        let element = Element::new(ElementKind::Audio)
            .with_attr("duration", 1500)
            .with_attr("size", "2048");
        assert_eq!(element.attr_u64("duration"), Some(1500));
        assert_eq!(element.attr_u64("size"), Some(2048));
        assert_eq!(element.attr_u64("missing"), None);
    }
}
