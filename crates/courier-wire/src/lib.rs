//! Platform-native wire payload shapes targeted by the composition engine.
//!
//! These are opaque output contracts: rich-text paragraph arrays, structured
//! card JSON, media upload descriptors, forward-bundle nodes and the receipt
//! shape a transport returns after a send. Pure type declarations; the engine
//! in `courier-compose` decides what to put in them.

pub mod card;
pub mod media;
pub mod payload;
pub mod rich_text;

pub use card::{
    ActionBehavior, ActionElement, Card, CardElement, CardHeader, IconObject, NoteElement,
    TextObject,
};
pub use media::{MediaKind, MediaUpload, ResolvedAttachment};
pub use payload::{ForwardNode, FramePayload, SendReceipt};
pub use rich_text::{RichTextBody, RichTextNode, RichTextParagraph};
