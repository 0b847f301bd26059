//! Depth-first tree walker driving one composition run.
//!
//! `visit` dispatches purely on the element kind. Text-bearing kinds append
//! to the active scope buffer and never flush on their own; flushes come
//! from structural boundaries only (separator messages, quote targets, media
//! nodes, scope open/close, end of traversal). Scope-opening kinds always
//! flush the enclosing scope first so cross-scope content never merges.

use futures_util::future::BoxFuture;
use serde_json::json;
use tracing::debug;

use courier_element::markup::{channel_marker, escape_text, mention_all_marker, mention_marker};
use courier_element::{Element, ElementKind};
use courier_wire::{
    ActionBehavior, ActionElement, Card, CardElement, CardHeader, IconObject, MediaKind,
    NoteElement, RichTextNode, TextObject,
};

use crate::compose_attachment::resolve_attachment;
use crate::compose_contract::{
    BotIdentity, ComposeContext, ComposeError, ComposeOptions, ComposeOutcome, EventSink,
    NullEventSink, Transport, REASON_ATTACHMENT_UNRESOLVABLE,
};
use crate::compose_dispatch::Dispatcher;
use crate::compose_frame::{build_forward_node, build_message_frame, Frame};
use crate::compose_scope::{Scope, ScopeKind, ScopeStack};

static NULL_SINK: NullEventSink = NullEventSink;

/// Entry point for composing one element tree into dispatched frames.
///
/// A `Composer` is cheap to build per run; it borrows the transport and
/// session context and owns nothing but options. Runs sharing a composer do
/// not share any mutable state.
pub struct Composer<'a> {
    transport: &'a dyn Transport,
    context: &'a ComposeContext,
    sink: &'a dyn EventSink,
    options: ComposeOptions,
}

impl<'a> Composer<'a> {
    pub fn new(transport: &'a dyn Transport, context: &'a ComposeContext) -> Self {
        Self {
            transport,
            context,
            sink: &NULL_SINK,
            options: ComposeOptions::default(),
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn EventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_options(mut self, options: ComposeOptions) -> Self {
        self.options = options;
        self
    }

    /// Walks the tree, dispatching frames as structural boundaries are
    /// crossed, then performs the final flush. Expected dispatch failures
    /// land in the outcome; `Err` means an engine invariant broke.
    pub async fn compose(&self, elements: &[Element]) -> Result<ComposeOutcome, ComposeError> {
        let mut run = ComposeRun {
            transport: self.transport,
            dispatcher: Dispatcher::new(self.transport, self.sink, self.context, &self.options),
            stack: ScopeStack::new(),
            reply_to: None,
            bot: &self.context.bot,
        };
        run.render(elements).await?;
        run.flush().await?;
        let depth = run.stack.depth();
        if depth != 1 {
            return Err(ComposeError::StructuralMisuse(format!(
                "traversal finished at depth {depth}"
            )));
        }
        Ok(run.dispatcher.into_outcome())
    }
}

struct ComposeRun<'a> {
    transport: &'a dyn Transport,
    dispatcher: Dispatcher<'a>,
    stack: ScopeStack,
    reply_to: Option<String>,
    bot: &'a BotIdentity,
}

impl<'a> ComposeRun<'a> {
    fn render<'b>(&'b mut self, elements: &'b [Element]) -> BoxFuture<'b, Result<(), ComposeError>> {
        Box::pin(async move {
            for element in elements {
                self.visit(element).await?;
            }
            Ok(())
        })
    }

    async fn visit(&mut self, element: &Element) -> Result<(), ComposeError> {
        match &element.kind {
            ElementKind::Text => {
                if let Some(content) = element.attr_str("content") {
                    self.stack.top_mut().text.push_str(&escape_text(content));
                }
            }
            ElementKind::Mention => {
                let name = element.attr_str("name");
                if element.attr_str("type") == Some("all") {
                    let marker = mention_all_marker(name);
                    self.stack.top_mut().text.push_str(&marker);
                } else if let Some(id) = element.attr_string("id") {
                    let marker = mention_marker(&id, name);
                    self.stack.top_mut().text.push_str(&marker);
                }
            }
            ElementKind::Channel => {
                if let Some(id) = element.attr_string("id") {
                    let marker = channel_marker(&id);
                    self.stack.top_mut().text.push_str(&marker);
                }
            }
            ElementKind::Link => {
                self.render(&element.children).await?;
                if let Some(href) = element.attr_str("href") {
                    let suffix = format!(" ({href})");
                    self.stack.top_mut().text.push_str(&suffix);
                }
            }
            ElementKind::Paragraph => {
                self.stack.top_mut().ensure_trailing_newline();
                self.render(&element.children).await?;
                self.stack.top_mut().ensure_trailing_newline();
            }
            ElementKind::LineBreak => self.stack.top_mut().text.push('\n'),
            ElementKind::Quote => {
                self.flush().await?;
                self.reply_to = element.attr_string("id");
            }
            ElementKind::Image => self.visit_media(MediaKind::Image, element).await?,
            ElementKind::Audio => self.visit_media(MediaKind::Audio, element).await?,
            ElementKind::Video => self.visit_media(MediaKind::Video, element).await?,
            ElementKind::File => self.visit_media(MediaKind::File, element).await?,
            ElementKind::Message => self.visit_message(element).await?,
            ElementKind::Author => {
                let id = element
                    .attr_string("id")
                    .or_else(|| element.attr_string("user_id"));
                let name = element
                    .attr_string("name")
                    .or_else(|| element.attr_string("nickname"));
                let scope = self.stack.message_scope_mut();
                if id.is_some() {
                    scope.author.id = id;
                }
                if name.is_some() {
                    scope.author.name = name;
                }
            }
            ElementKind::Divider => {
                if !self.stack.push_divider() {
                    self.dispatcher.record_degraded("divider inside a note region");
                }
            }
            ElementKind::Card => self.visit_card(element).await?,
            ElementKind::Section => {
                self.stack.flush_text(false);
                self.render(&element.children).await?;
                let text = std::mem::take(&mut self.stack.top_mut().text);
                if !text.is_empty() {
                    let block = CardElement::Markdown {
                        content: text,
                        text_align: element.attr_string("align"),
                        text_size: element.attr_string("size"),
                    };
                    if !self.stack.push_card_block(block) {
                        self.dispatcher.record_degraded("div section outside a card");
                    }
                }
            }
            ElementKind::Note => {
                self.stack.flush_text(false);
                let scope = self.with_scope(Scope::new(ScopeKind::Note), &element.children).await?;
                if !scope.notes.is_empty()
                    && !self
                        .stack
                        .push_card_block(CardElement::Note { elements: scope.notes })
                {
                    self.dispatcher.record_degraded("note region outside a card");
                }
            }
            ElementKind::Icon => {
                if self.stack.top().kind == ScopeKind::Note {
                    self.stack.flush_text(false);
                    if let Some(token) = element.attr_string("token") {
                        self.stack
                            .top_mut()
                            .notes
                            .push(NoteElement::StandardIcon { token });
                    }
                } else {
                    debug!("icon element outside a note region, skipping");
                }
            }
            ElementKind::Form => {
                self.stack.flush_text(false);
                let scope = self.with_scope(Scope::new(ScopeKind::Form), &element.children).await?;
                if !scope.blocks.is_empty() {
                    let name = element.attr_str("name").unwrap_or("Form").to_string();
                    let form = CardElement::Form {
                        name,
                        elements: scope.blocks,
                    };
                    if !self.stack.push_card_block(form) {
                        self.dispatcher.record_degraded("form outside a card");
                    }
                }
            }
            ElementKind::Input => {
                self.stack.flush_text(false);
                let behaviors = self.behaviors_from(element);
                let input = ActionElement::Input {
                    name: element.attr_string("name"),
                    width: element.attr_string("width"),
                    label: element.attr_str("label").map(TextObject::plain),
                    placeholder: element.attr_str("placeholder").map(TextObject::plain),
                    behaviors,
                };
                if !self.stack.push_card_block(CardElement::action_row(vec![input])) {
                    self.dispatcher.record_degraded("input field outside a card");
                }
            }
            ElementKind::Button => {
                if !self.stack.has_card_target() {
                    self.stack.ensure_message_card();
                }
                self.stack.flush_text(true);
                self.render(&element.children).await?;
                let label = std::mem::take(&mut self.stack.top_mut().text);
                let behaviors = self.behaviors_from(element);
                self.stack.top_mut().actions.push(ActionElement::Button {
                    text: TextObject::plain(label),
                    disabled: element.attr_bool("disabled").then_some(true),
                    behaviors,
                });
            }
            ElementKind::ButtonGroup => {
                self.stack.flush_text(false);
                let scope = self
                    .with_scope(Scope::new(ScopeKind::Actions), &element.children)
                    .await?;
                if !scope.actions.is_empty() && !self.stack.has_card_target() {
                    self.stack.ensure_message_card();
                }
                // text committed inside the group ships ahead of the action row
                if self.stack.has_card_target() {
                    for paragraph in scope.paragraphs {
                        for node in paragraph {
                            match node {
                                RichTextNode::Md { text } => {
                                    self.stack.push_card_block(CardElement::markdown(text));
                                }
                                RichTextNode::Hr => {
                                    self.stack.push_card_block(CardElement::Hr);
                                }
                                RichTextNode::Img { .. } => {}
                            }
                        }
                    }
                } else if !scope.paragraphs.is_empty() {
                    self.stack.top_mut().paragraphs.extend(scope.paragraphs);
                }
                if !scope.actions.is_empty()
                    && !self.stack.push_card_block(CardElement::action_row(scope.actions))
                {
                    self.dispatcher.record_degraded("button group outside a card");
                }
            }
            ElementKind::System => {
                self.flush().await?;
                self.render(&element.children).await?;
                let text = std::mem::take(&mut self.stack.top_mut().text);
                if !text.trim().is_empty() {
                    let frame = Frame::System {
                        text,
                        need_rollup: element.attr_bool("need_rollup"),
                    };
                    let reply_to = self.reply_to.take();
                    self.dispatcher.dispatch(frame, reply_to).await;
                }
            }
            ElementKind::ShareChat => {
                self.flush().await?;
                match element.attr_string("chat_id") {
                    Some(chat_id) => {
                        let reply_to = self.reply_to.take();
                        self.dispatcher
                            .dispatch(Frame::ShareChat { chat_id }, reply_to)
                            .await;
                    }
                    None => self
                        .dispatcher
                        .record_degraded("share-chat element without chat_id"),
                }
            }
            ElementKind::ShareUser => {
                self.flush().await?;
                let user_id = element
                    .attr_string("user_id")
                    .or_else(|| element.attr_string("id"));
                match user_id {
                    Some(user_id) => {
                        let reply_to = self.reply_to.take();
                        self.dispatcher
                            .dispatch(Frame::ShareUser { user_id }, reply_to)
                            .await;
                    }
                    None => self
                        .dispatcher
                        .record_degraded("share-user element without user_id"),
                }
            }
            // Forward-compatible passthrough: unrecognized kinds render
            // their children and never error.
            ElementKind::Other(_) => self.render(&element.children).await?,
        }
        Ok(())
    }

    /// Full flush of the active logical message: commit pending text, build
    /// the frame and dispatch it (or fold it into an enclosing forward
    /// group). No-op when nothing is buffered. Inside card/note/form scopes
    /// only the text-level flush applies; the frame flush happens when the
    /// owning message scope flushes.
    async fn flush(&mut self) -> Result<(), ComposeError> {
        self.stack.flush_text(false);
        let bot = self.bot;
        let (top, parent) = self.stack.top_and_parent_mut();
        if top.kind != ScopeKind::Message {
            return Ok(());
        }
        if let Some(parent) = parent {
            if parent.kind == ScopeKind::Forward {
                let (node, card_dropped) = build_forward_node(top, bot);
                if let Some(node) = node {
                    parent.nodes.push(node);
                }
                if card_dropped {
                    self.dispatcher
                        .record_degraded("card content inside a forward group");
                }
                return Ok(());
            }
        }
        if let Some(frame) = build_message_frame(top) {
            let reply_to = self.reply_to.take();
            self.dispatcher.dispatch(frame, reply_to).await;
        }
        Ok(())
    }

    /// Scoped acquisition: pushes the scope, renders the children, commits
    /// pending text and pops — on every exit path, so the stack depth is
    /// restored even when a child fails.
    async fn with_scope(
        &mut self,
        scope: Scope,
        children: &[Element],
    ) -> Result<Scope, ComposeError> {
        let kind = scope.kind;
        self.stack.push(scope);
        let rendered = self.render(children).await;
        self.stack.flush_text(false);
        let popped = self.stack.pop(kind);
        rendered?;
        popped
    }

    async fn visit_media(&mut self, kind: MediaKind, element: &Element) -> Result<(), ComposeError> {
        if self.stack.contains(ScopeKind::Forward) {
            // images ride inside the node body; nothing else can
            if kind == MediaKind::Image {
                match element.attr_str("src").or_else(|| element.attr_str("url")) {
                    Some(reference) => {
                        self.stack.flush_text(false);
                        self.stack.top_mut().paragraphs.push(vec![RichTextNode::Img {
                            image_key: reference.to_string(),
                        }]);
                    }
                    None => self
                        .dispatcher
                        .record_degraded("image element carries no src or url"),
                }
            } else {
                self.dispatcher.record_degraded(&format!(
                    "{} attachment inside a forward group",
                    kind.as_str()
                ));
            }
            return Ok(());
        }
        self.flush().await?;
        match resolve_attachment(self.transport, kind, element).await {
            Ok(attachment) => {
                let reply_to = self.reply_to.take();
                self.dispatcher
                    .dispatch(Frame::Media { kind, attachment }, reply_to)
                    .await;
            }
            Err(ComposeError::Transport(error)) => {
                self.dispatcher
                    .record_transport_failure(REASON_ATTACHMENT_UNRESOLVABLE, &error);
            }
            Err(ComposeError::UnsupportedContent(detail)) => {
                self.dispatcher.record_degraded(&detail);
            }
            Err(fatal) => return Err(fatal),
        }
        Ok(())
    }

    async fn visit_message(&mut self, element: &Element) -> Result<(), ComposeError> {
        if element.attr_bool("forward") {
            self.flush().await?;
            let mut scope = self
                .with_scope(Scope::new(ScopeKind::Forward), &element.children)
                .await?;
            // text sitting directly in the group becomes a trailing node
            let (node, card_dropped) = build_forward_node(&mut scope, self.bot);
            let mut nodes = scope.nodes;
            if let Some(node) = node {
                nodes.push(node);
            }
            if card_dropped {
                self.dispatcher
                    .record_degraded("card content inside a forward group");
            }
            if !nodes.is_empty() {
                let reply_to = self.reply_to.take();
                self.dispatcher
                    .dispatch(Frame::Forward { nodes }, reply_to)
                    .await;
            }
        } else if self.stack.top().kind == ScopeKind::Forward {
            // authored sub-message boundary inside the group
            let mut scope = Scope::new(ScopeKind::Message);
            scope.author.id = element
                .attr_string("user_id")
                .or_else(|| element.attr_string("id"));
            scope.author.name = element
                .attr_string("nickname")
                .or_else(|| element.attr_string("name"));
            let mut scope = self.with_scope(scope, &element.children).await?;
            let (node, card_dropped) = build_forward_node(&mut scope, self.bot);
            if card_dropped {
                self.dispatcher
                    .record_degraded("card content inside a forward group");
            }
            if let Some(node) = node {
                self.stack.top_mut().nodes.push(node);
            }
        } else {
            // plain separator: close the current frame on both sides
            self.flush().await?;
            self.render(&element.children).await?;
            self.flush().await?;
        }
        Ok(())
    }

    async fn visit_card(&mut self, element: &Element) -> Result<(), ComposeError> {
        self.flush().await?;
        let mut scope = Scope::new(ScopeKind::Card);
        scope.header = card_header_from(element);
        let scope = self.with_scope(scope, &element.children).await?;
        let card = Card {
            header: scope.header,
            elements: scope.blocks,
        };
        if !card.is_empty() {
            self.stack.set_message_card(card);
        }
        Ok(())
    }

    fn behaviors_from(&mut self, element: &Element) -> Option<Vec<ActionBehavior>> {
        let behavior_type = element.attr_str("type")?;
        match behavior_type {
            "link" => element.attr_str("href").map(|href| {
                vec![ActionBehavior::OpenUrl {
                    default_url: href.to_string(),
                }]
            }),
            "input" => element.attr_str("text").map(|content| {
                vec![ActionBehavior::Callback {
                    value: json!({ "type": "command", "content": content }),
                }]
            }),
            other => {
                self.dispatcher
                    .record_degraded(&format!("unmatched action behavior type: {other}"));
                None
            }
        }
    }
}

fn card_header_from(element: &Element) -> Option<CardHeader> {
    let title = element.attr_str("title")?;
    Some(CardHeader {
        template: element.attr_string("color"),
        ud_icon: element
            .attr_string("icon")
            .map(|token| IconObject::StandardIcon { token }),
        title: TextObject::plain(title),
        subtitle: element.attr_str("subtitle").map(TextObject::plain),
    })
}
