//! The rendered message list.
//!
//! `ChatPane` is what a front-end draws: an ordered list of entries plus the
//! welcome placeholder. Entries are created by the widget and only ever
//! appended, have their body replaced (typing indicator -> reply), or are all
//! discarded by a full re-render from the server log.

use crate::state::{ChatMessage, ChatRole, MessageMeta};

/// Shown in place of a reply when `/chat` fails.
pub const CHAT_ERROR_TEXT: &str = "Oops! Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    pub fn for_role(role: ChatRole) -> Self {
        match role {
            ChatRole::User => Direction::Outgoing,
            ChatRole::Assistant => Direction::Incoming,
        }
    }

    pub fn as_class(&self) -> &'static str {
        match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    Text(String),
    Typing,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct PaneEntry {
    pub id: EntryId,
    pub direction: Direction,
    pub body: EntryBody,
    pub meta: MessageMeta,
}

#[derive(Debug, Clone)]
pub struct ChatPane {
    entries: Vec<PaneEntry>,
    welcome_visible: bool,
    render_generation: u64,
    stick_to_bottom: bool,
    next_id: u64,
}

impl ChatPane {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            welcome_visible: true,
            render_generation: 0,
            stick_to_bottom: true,
            next_id: 0,
        }
    }

    pub fn entries(&self) -> &[PaneEntry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> Option<&PaneEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    pub fn remove_welcome(&mut self) {
        self.welcome_visible = false;
    }

    /// Number of full re-renders so far.
    pub fn render_generation(&self) -> u64 {
        self.render_generation
    }

    pub fn append(&mut self, direction: Direction, body: EntryBody) -> EntryId {
        self.push(direction, body, MessageMeta::default())
    }

    /// Replace an entry's body in place. Returns false if the entry is gone
    /// (a history re-render discarded it while a reply was in flight).
    pub fn replace_body(&mut self, id: EntryId, body: EntryBody) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.body = body;
                true
            }
            None => false,
        }
    }

    /// Discard everything and rebuild from the server log, in log order.
    pub fn render_history(&mut self, messages: &[ChatMessage]) {
        self.remove_welcome();
        self.entries.clear();
        for msg in messages {
            self.push(
                Direction::for_role(msg.role),
                EntryBody::Text(msg.content.clone()),
                msg.meta.clone(),
            );
        }
        self.render_generation += 1;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.stick_to_bottom = true;
    }

    /// The user scrolled away from the tail.
    pub fn release_bottom(&mut self) {
        self.stick_to_bottom = false;
    }

    pub fn sticks_to_bottom(&self) -> bool {
        self.stick_to_bottom
    }

    fn push(&mut self, direction: Direction, body: EntryBody, meta: MessageMeta) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(PaneEntry {
            id,
            direction,
            body,
            meta,
        });
        id
    }
}

impl Default for ChatPane {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_history_tags_by_role() {
        let mut pane = ChatPane::new();
        pane.render_history(&[ChatMessage::user("hi"), ChatMessage::assistant("hello")]);

        let classes: Vec<_> = pane.entries().iter().map(|e| e.direction.as_class()).collect();
        assert_eq!(classes, vec!["outgoing", "incoming"]);
        assert!(!pane.welcome_visible());
        assert_eq!(pane.render_generation(), 1);
    }

    #[test]
    fn test_render_history_discards_previous_entries() {
        let mut pane = ChatPane::new();
        let stale = pane.append(Direction::Outgoing, EntryBody::Text("draft".into()));
        pane.render_history(&[ChatMessage::assistant("only")]);

        assert_eq!(pane.len(), 1);
        assert!(pane.entry(stale).is_none());
        assert_eq!(pane.entries()[0].body, EntryBody::Text("only".into()));
    }

    #[test]
    fn test_replace_body_of_missing_entry() {
        let mut pane = ChatPane::new();
        let typing = pane.append(Direction::Incoming, EntryBody::Typing);
        assert!(pane.replace_body(typing, EntryBody::Text("done".into())));

        pane.render_history(&[]);
        assert!(!pane.replace_body(typing, EntryBody::Text("late".into())));
    }

    #[test]
    fn test_ids_stay_unique_across_rerenders() {
        let mut pane = ChatPane::new();
        let first = pane.append(Direction::Outgoing, EntryBody::Text("a".into()));
        pane.render_history(&[ChatMessage::user("b")]);
        assert_ne!(pane.entries()[0].id, first);
    }
}
