use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work even while input is locked
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::PageUp => {
            app.scroll_up((app.chat_height / 2).max(1));
            return;
        }
        KeyCode::PageDown => {
            app.scroll_down((app.chat_height / 2).max(1));
            return;
        }
        KeyCode::Up if ctrl => {
            app.scroll_up(1);
            return;
        }
        KeyCode::Down if ctrl => {
            app.scroll_down(1);
            return;
        }
        KeyCode::End if ctrl => {
            app.scroll_to_bottom();
            return;
        }
        _ => {}
    }

    if !app.input_enabled() {
        debug!(code = ?key.code, "input locked while generating traffic");
        return;
    }

    match key.code {
        KeyCode::Enter => {
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
            {
                app.insert_char('\n');
            } else {
                app.submit();
            }
        }
        KeyCode::Char('t') if ctrl => {
            app.trigger_traffic();
        }
        KeyCode::Char(c) if !ctrl => app.insert_char(c),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;
    let hit = |area: Option<Rect>| area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollUp if hit(app.chat_area) => app.scroll_up(3),
        MouseEventKind::ScrollDown if hit(app.chat_area) => app.scroll_down(3),
        MouseEventKind::Down(MouseButton::Left) => {
            if !app.input_enabled() {
                return;
            }
            if hit(app.send_button) {
                app.submit();
            } else if hit(app.traffic_button) {
                app.trigger_traffic();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use chatpoll_core::Direction;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    fn click(app: &mut App, area: Rect) {
        handle_event(
            app,
            AppEvent::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: area.x,
                row: area.y,
                modifiers: KeyModifiers::NONE,
            }),
        );
    }

    #[tokio::test]
    async fn test_enter_sends_and_shift_enter_inserts_newline() {
        let mut app = test_app();
        type_text(&mut app, "line one");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut app, "line two");
        assert_eq!(app.input, "line one\nline two");
        assert!(app.widget.pane().is_empty());

        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.input.is_empty());
        assert_eq!(app.widget.pane().len(), 1);
        assert_eq!(app.widget.pane().entries()[0].direction, Direction::Outgoing);
    }

    #[tokio::test]
    async fn test_enter_on_blank_input_does_nothing() {
        let mut app = test_app();
        type_text(&mut app, "  ");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.input, "  ");
        assert!(app.widget.pane().is_empty());
    }

    #[tokio::test]
    async fn test_traffic_locks_enter_send_button_and_typing() {
        let mut app = test_app();
        type_text(&mut app, "queued");
        app.send_button = Some(Rect::new(50, 20, 10, 3));

        handle_event(&mut app, key(KeyCode::Char('t'), KeyModifiers::CONTROL));
        assert!(!app.input_enabled());

        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        click(&mut app, Rect::new(50, 20, 10, 3));
        type_text(&mut app, "more");

        assert_eq!(app.input, "queued");
        assert!(app.widget.pane().is_empty());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_send_button_click_submits() {
        let mut app = test_app();
        type_text(&mut app, "via mouse");
        app.send_button = Some(Rect::new(50, 20, 10, 3));
        click(&mut app, Rect::new(52, 21, 1, 1));
        assert_eq!(app.widget.pane().len(), 1);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = test_app();
        handle_event(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(10, 5, 4, 2);
        assert!(point_in_rect(10, 5, rect));
        assert!(point_in_rect(13, 6, rect));
        assert!(!point_in_rect(14, 6, rect));
        assert!(!point_in_rect(10, 7, rect));
    }
}
