//! Rich-text message body: an ordered list of paragraphs, each an ordered
//! list of tagged inline nodes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum RichTextNode {
    Md { text: String },
    Img { image_key: String },
    Hr,
}

pub type RichTextParagraph = Vec<RichTextNode>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextBody {
    pub content: Vec<RichTextParagraph>,
}

impl RichTextBody {
    pub fn new(content: Vec<RichTextParagraph>) -> Self {
        Self { content }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
