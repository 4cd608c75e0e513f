use chatpoll_core::{ChatApiClient, ChatWidget, SubmitOutcome};
use ratatui::layout::Rect;

/// Input box grows with its content up to this many lines.
pub const MAX_INPUT_LINES: u16 = 5;

pub struct App {
    pub should_quit: bool,
    pub widget: ChatWidget<ChatApiClient>,

    // Chat input (may contain newlines)
    pub input: String,
    pub cursor: usize,

    // Message pane scroll state
    pub scroll: u16,
    pub max_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Typing indicator animation
    pub animation_frame: u8,

    // Areas from the last render, for mouse hit-testing
    pub chat_area: Option<Rect>,
    pub send_button: Option<Rect>,
    pub traffic_button: Option<Rect>,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(widget: ChatWidget<ChatApiClient>) -> Self {
        Self {
            should_quit: false,
            widget,
            input: String::new(),
            cursor: 0,
            scroll: 0,
            max_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            chat_area: None,
            send_button: None,
            traffic_button: None,
        }
    }

    /// Input, send and traffic controls are disabled while traffic runs.
    pub fn input_enabled(&self) -> bool {
        !self.widget.state().input_locked()
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        let outcome = self.widget.submit(&self.input);
        if outcome == SubmitOutcome::Sent {
            self.input.clear();
            self.cursor = 0;
        }
        outcome
    }

    pub fn trigger_traffic(&mut self) -> bool {
        self.widget.trigger_traffic()
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// (line, column) of the cursor within the input, in characters.
    /// Saturates at `u16::MAX` for huge pastes.
    pub fn cursor_position(&self) -> (u16, u16) {
        let mut line = 0usize;
        let mut col = 0usize;
        for c in self.input.chars().take(self.cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        let clamp = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);
        (clamp(line), clamp(col))
    }

    pub fn input_lines(&self) -> u16 {
        let lines = self.input.lines().count().max(1) + usize::from(self.input.ends_with('\n'));
        lines.min(usize::from(MAX_INPUT_LINES)) as u16
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.widget.pane_mut().release_bottom();
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
        if self.scroll >= self.max_scroll {
            self.widget.pane_mut().scroll_to_bottom();
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.widget.pane_mut().scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chatpoll_core::{ChatUiState, Config};
    use std::sync::Arc;

    /// An app wired to a backend nobody listens on.
    pub(crate) fn test_app() -> App {
        let backend = Arc::new(ChatApiClient::new("http://127.0.0.1:9").unwrap());
        let (widget, _rx) = ChatWidget::new(
            backend,
            Config::default(),
            ChatUiState::with_user_id("user_test"),
        );
        App::new(widget)
    }

    #[test]
    fn test_utf8_editing() {
        let mut app = test_app();
        for c in "héllo".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input, "hélo");
        app.cursor_home();
        app.delete();
        assert_eq!(app.input, "élo");
        app.cursor_end();
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn test_cursor_position_multiline() {
        let mut app = test_app();
        for c in "ab\ncde".chars() {
            app.insert_char(c);
        }
        assert_eq!(app.cursor_position(), (1, 3));
        assert_eq!(app.input_lines(), 2);
        app.insert_char('\n');
        assert_eq!(app.input_lines(), 3);
    }

    #[test]
    fn test_cursor_position_saturates_on_huge_paste() {
        let mut app = test_app();
        app.input = "x".repeat(70_000);
        app.cursor_end();
        assert_eq!(app.cursor_position(), (0, u16::MAX));

        app.input.push_str("\nyz");
        app.cursor_end();
        assert_eq!(app.cursor_position(), (1, 2));
    }

    #[test]
    fn test_input_lines_capped() {
        let mut app = test_app();
        app.input = "1\n2\n3\n4\n5\n6\n7".to_string();
        assert_eq!(app.input_lines(), MAX_INPUT_LINES);
    }

    #[tokio::test]
    async fn test_submit_clears_input_only_when_sent() {
        let mut app = test_app();
        app.input = "   ".to_string();
        app.cursor = 3;
        assert_eq!(app.submit(), SubmitOutcome::Empty);
        assert_eq!(app.input, "   ");

        app.input = "hello".to_string();
        assert_eq!(app.submit(), SubmitOutcome::Sent);
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.widget.pane().len(), 1);
    }

    #[test]
    fn test_scroll_up_releases_bottom() {
        let mut app = test_app();
        app.max_scroll = 10;
        app.scroll = 10;
        app.scroll_up(3);
        assert_eq!(app.scroll, 7);
        assert!(!app.widget.pane().sticks_to_bottom());
        app.scroll_down(5);
        assert_eq!(app.scroll, 10);
        assert!(app.widget.pane().sticks_to_bottom());
    }
}
