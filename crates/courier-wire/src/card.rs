//! Structured-card JSON shapes: header, block elements, action elements and
//! the behaviors attached to interactive actions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { content: String },
}

impl TextObject {
    pub fn plain(content: impl Into<String>) -> Self {
        Self::PlainText {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum IconObject {
    StandardIcon { token: String },
}

/// Inner elements of a note region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum NoteElement {
    PlainText { content: String },
    StandardIcon { token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionBehavior {
    OpenUrl { default_url: String },
    Callback { value: Value },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum ActionElement {
    Button {
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        disabled: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        behaviors: Option<Vec<ActionBehavior>>,
    },
    Input {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        width: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        behaviors: Option<Vec<ActionBehavior>>,
    },
}

/// Card body blocks, in visit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum CardElement {
    Markdown {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        text_align: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text_size: Option<String>,
    },
    Hr,
    Action {
        actions: Vec<ActionElement>,
        layout: String,
    },
    Note {
        elements: Vec<NoteElement>,
    },
    Form {
        name: String,
        elements: Vec<CardElement>,
    },
}

impl CardElement {
    pub fn markdown(content: impl Into<String>) -> Self {
        Self::Markdown {
            content: content.into(),
            text_align: None,
            text_size: None,
        }
    }

    /// Action row with the flow layout every card action row uses.
    pub fn action_row(actions: Vec<ActionElement>) -> Self {
        Self::Action {
            actions,
            layout: "flow".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ud_icon: Option<IconObject>,
    pub title: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<TextObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<CardHeader>,
    pub elements: Vec<CardElement>,
}

impl Card {
    pub fn with_header(header: Option<CardHeader>) -> Self {
        Self {
            header,
            elements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.elements.is_empty()
    }
}
