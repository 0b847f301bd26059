//! Composition scopes and the strict-LIFO scope stack.
//!
//! Each nesting construct (forward group, card, note region, action group,
//! authored sub-message) owns its own buffered state while open. Scope-open
//! paths must pop exactly once on every exit; a mismatched pop is a
//! [`ComposeError::StructuralMisuse`] and aborts the run.

use courier_wire::{ActionElement, Card, CardElement, CardHeader, ForwardNode, NoteElement};
use courier_wire::{RichTextNode, RichTextParagraph};

use crate::compose_contract::ComposeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    /// Root message or an authored sub-message inside a forward group.
    Message,
    Forward,
    Card,
    Note,
    Actions,
    Form,
}

impl ScopeKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Forward => "forward",
            Self::Card => "card",
            Self::Note => "note",
            Self::Actions => "actions",
            Self::Form => "form",
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScopeAuthor {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Buffered state for one composition scope.
#[derive(Debug)]
pub(crate) struct Scope {
    pub kind: ScopeKind,
    /// Pending text not yet committed to a paragraph or block.
    pub text: String,
    /// Committed rich-text paragraphs (message-level scopes).
    pub paragraphs: Vec<RichTextParagraph>,
    /// Card under construction for this logical message; once set, it
    /// supersedes the plain rich-text body.
    pub card: Option<Card>,
    /// Committed card blocks (card and form scopes, before folding).
    pub blocks: Vec<CardElement>,
    /// Accumulated note-region inner elements.
    pub notes: Vec<NoteElement>,
    /// Pending interactive actions awaiting their action row.
    pub actions: Vec<ActionElement>,
    /// Completed sub-messages of a forward group.
    pub nodes: Vec<ForwardNode>,
    pub header: Option<CardHeader>,
    pub author: ScopeAuthor,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            text: String::new(),
            paragraphs: Vec::new(),
            card: None,
            blocks: Vec::new(),
            notes: Vec::new(),
            actions: Vec::new(),
            nodes: Vec::new(),
            header: None,
            author: ScopeAuthor::default(),
        }
    }

    pub fn ensure_trailing_newline(&mut self) {
        if !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }
}

/// Strict-LIFO stack of scopes. The root message scope is always present and
/// can never be popped.
#[derive(Debug)]
pub(crate) struct ScopeStack {
    root: Scope,
    nested: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            root: Scope::new(ScopeKind::Message),
            nested: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.nested.len() + 1
    }

    pub fn top(&self) -> &Scope {
        self.nested.last().unwrap_or(&self.root)
    }

    pub fn top_mut(&mut self) -> &mut Scope {
        self.nested.last_mut().unwrap_or(&mut self.root)
    }

    pub fn contains(&self, kind: ScopeKind) -> bool {
        self.root.kind == kind || self.nested.iter().any(|scope| scope.kind == kind)
    }

    pub fn push(&mut self, scope: Scope) {
        self.nested.push(scope);
    }

    pub fn pop(&mut self, expected: ScopeKind) -> Result<Scope, ComposeError> {
        let scope = self.nested.pop().ok_or_else(|| {
            ComposeError::StructuralMisuse(format!(
                "attempted to close a {} scope at root depth",
                expected.as_str()
            ))
        })?;
        if scope.kind != expected {
            return Err(ComposeError::StructuralMisuse(format!(
                "expected to close a {} scope but found {}",
                expected.as_str(),
                scope.kind.as_str()
            )));
        }
        Ok(scope)
    }

    /// Top scope together with its parent, for fold operations.
    pub fn top_and_parent_mut(&mut self) -> (&mut Scope, Option<&mut Scope>) {
        match self.nested.split_last_mut() {
            Some((top, rest)) => (top, Some(rest.last_mut().unwrap_or(&mut self.root))),
            None => (&mut self.root, None),
        }
    }

    /// Nearest message-level scope from the top of the stack.
    pub fn message_scope_mut(&mut self) -> &mut Scope {
        let index = self
            .nested
            .iter()
            .rposition(|scope| matches!(scope.kind, ScopeKind::Message | ScopeKind::Forward));
        match index {
            Some(index) => &mut self.nested[index],
            None => &mut self.root,
        }
    }

    /// Text-level flush: commit the pending action row, then commit pending
    /// text both as a rich-text paragraph and as the structured block the
    /// active scope calls for. Idempotent; an empty buffer is a no-op.
    pub fn flush_text(&mut self, for_button: bool) {
        let top = self.top_mut();
        let commits_actions = matches!(
            top.kind,
            ScopeKind::Card | ScopeKind::Form | ScopeKind::Message | ScopeKind::Forward
        );
        if commits_actions && !top.actions.is_empty() && (!for_button || !top.text.is_empty()) {
            let row = CardElement::action_row(std::mem::take(&mut top.actions));
            match top.kind {
                ScopeKind::Card | ScopeKind::Form => top.blocks.push(row),
                _ => top.card.get_or_insert_with(Card::default).elements.push(row),
            }
        }
        if top.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut top.text);
        match top.kind {
            ScopeKind::Note => top.notes.push(NoteElement::PlainText { content: text }),
            ScopeKind::Card | ScopeKind::Form => top.blocks.push(CardElement::markdown(text)),
            ScopeKind::Message | ScopeKind::Forward | ScopeKind::Actions => {
                top.paragraphs.push(vec![RichTextNode::Md { text: text.clone() }]);
                if let Some(card) = top.card.as_mut() {
                    card.elements.push(CardElement::markdown(text));
                }
            }
        }
    }

    /// Commits pending text, then appends a divider to the active body.
    /// Returns false when the active scope has no place for one.
    pub fn push_divider(&mut self) -> bool {
        self.flush_text(false);
        let top = self.top_mut();
        match top.kind {
            ScopeKind::Card | ScopeKind::Form => top.blocks.push(CardElement::Hr),
            ScopeKind::Note => return false,
            ScopeKind::Message | ScopeKind::Forward | ScopeKind::Actions => {
                top.paragraphs.push(vec![RichTextNode::Hr]);
                if let Some(card) = top.card.as_mut() {
                    card.elements.push(CardElement::Hr);
                }
            }
        }
        true
    }

    /// Appends a block to the nearest open card body. Returns false when no
    /// card context exists to receive it.
    pub fn push_card_block(&mut self, element: CardElement) -> bool {
        for scope in self
            .nested
            .iter_mut()
            .rev()
            .chain(std::iter::once(&mut self.root))
        {
            match scope.kind {
                ScopeKind::Card | ScopeKind::Form => {
                    scope.blocks.push(element);
                    return true;
                }
                ScopeKind::Actions => continue,
                ScopeKind::Note => return false,
                ScopeKind::Message | ScopeKind::Forward => {
                    return match scope.card.as_mut() {
                        Some(card) => {
                            card.elements.push(element);
                            true
                        }
                        None => false,
                    };
                }
            }
        }
        false
    }

    pub fn has_card_target(&self) -> bool {
        for scope in self.nested.iter().rev().chain(std::iter::once(&self.root)) {
            match scope.kind {
                ScopeKind::Card | ScopeKind::Form => return true,
                ScopeKind::Actions => continue,
                ScopeKind::Note => return false,
                ScopeKind::Message | ScopeKind::Forward => return scope.card.is_some(),
            }
        }
        false
    }

    /// Opens an (empty) card on the nearest message scope if none is active.
    pub fn ensure_message_card(&mut self) {
        let scope = self.message_scope_mut();
        if scope.card.is_none() {
            scope.card = Some(Card::default());
        }
    }

    /// Folds a completed card into the nearest message scope, merging with a
    /// card already opened there for the same logical message.
    pub fn set_message_card(&mut self, card: Card) {
        let scope = self.message_scope_mut();
        match scope.card.as_mut() {
            Some(existing) => {
                if existing.header.is_none() {
                    existing.header = card.header;
                }
                existing.elements.extend(card.elements);
            }
            None => scope.card = Some(card),
        }
    }
}
