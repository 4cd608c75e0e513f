use chatpoll_core::{BackendHealth, Direction, EntryBody, PaneEntry, TrafficPhase};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

const TYPING_FRAMES: [&str; 3] = ["●∙∙", "∙●∙", "∙∙●"];

/// Render `**bold**` runs in a reply line. Unmatched or empty markers stay literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    let last = parts.len() - 1;
    let mut spans = Vec::new();
    let mut plain = String::new();

    for (i, part) in parts.iter().enumerate() {
        if i % 2 == 0 {
            plain.push_str(part);
        } else if i == last || part.is_empty() {
            plain.push_str("**");
            plain.push_str(part);
            if i != last {
                plain.push_str("**");
            }
        } else {
            if !plain.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut plain)));
            }
            spans.push(Span::styled(part.to_string(), Style::new().bold()));
        }
    }

    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }
    Line::from(spans)
}

/// `2024-05-01T10:00:00.123456` -> `10:00:00`
fn short_time(timestamp: &str) -> Option<&str> {
    let time = timestamp.split_once('T')?.1;
    time.get(..8)
}

/// Split a styled line into words, each a run of styled fragments.
/// A word can change style midway (`**bold**tail`).
fn styled_words(line: &Line<'static>) -> Vec<Vec<Span<'static>>> {
    let mut words = Vec::new();
    let mut word: Vec<Span<'static>> = Vec::new();
    for span in &line.spans {
        let mut chunk = String::new();
        for c in span.content.chars() {
            if c.is_whitespace() {
                if !chunk.is_empty() {
                    word.push(Span::styled(std::mem::take(&mut chunk), span.style));
                }
                if !word.is_empty() {
                    words.push(std::mem::take(&mut word));
                }
            } else {
                chunk.push(c);
            }
        }
        if !chunk.is_empty() {
            word.push(Span::styled(chunk, span.style));
        }
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// Word-wrap a styled line into rows at most `width` columns wide, keeping
/// span styles and alignment. Words wider than a row are split across rows.
/// The chat pane renders these rows unwrapped, so the row count is exactly
/// what scrolling has to cover.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line];
    }
    let alignment = line.alignment;
    let style = line.style;
    let finish = |spans: Vec<Span<'static>>| {
        let mut row = Line::from(spans).style(style);
        row.alignment = alignment;
        row
    };

    let mut rows = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0usize;

    for word in styled_words(&line) {
        let word_width: usize = word.iter().map(Span::width).sum();
        if row_width > 0 {
            if row_width + 1 + word_width <= width {
                row.push(Span::raw(" "));
                row_width += 1;
            } else {
                rows.push(finish(std::mem::take(&mut row)));
                row_width = 0;
            }
        }

        if word_width <= width.saturating_sub(row_width) {
            row.extend(word);
            row_width += word_width;
            continue;
        }

        for fragment in word {
            let mut piece = String::new();
            for c in fragment.content.chars() {
                let char_width = Span::raw(c.to_string()).width();
                if row_width > 0 && row_width + char_width > width {
                    if !piece.is_empty() {
                        row.push(Span::styled(std::mem::take(&mut piece), fragment.style));
                    }
                    rows.push(finish(std::mem::take(&mut row)));
                    row_width = 0;
                }
                piece.push(c);
                row_width += char_width;
            }
            if !piece.is_empty() {
                row.push(Span::styled(piece, fragment.style));
            }
        }
    }

    if !row.is_empty() || rows.is_empty() {
        rows.push(finish(row));
    }
    rows
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let input_height = app.input_lines() + 2;

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input_row(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if let Some(phase) = app.widget.traffic() {
        render_traffic_overlay(phase, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let health = match app.widget.health() {
        BackendHealth::Unknown => Span::styled("○ checking", Style::default().fg(Color::Gray)),
        BackendHealth::Healthy(report) => Span::styled(
            format!(
                "● {} {}",
                report.service.as_deref().unwrap_or("backend"),
                report.version.as_deref().unwrap_or("")
            ),
            Style::default().fg(Color::Green),
        ),
        BackendHealth::Degraded(report) => Span::styled(
            format!("● {}", report.status),
            Style::default().fg(Color::Yellow),
        ),
        BackendHealth::Unreachable(_) => {
            Span::styled("● offline", Style::default().fg(Color::Red))
        }
    };

    let title = Line::from(vec![
        Span::styled(" chatpoll ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.widget.state().user_id().to_string(), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        health,
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn entry_lines(app: &App, entry: &PaneEntry, lines: &mut Vec<Line<'static>>) {
    let (label, label_color, alignment) = match entry.direction {
        Direction::Outgoing => ("You", Color::Cyan, Alignment::Right),
        Direction::Incoming => ("AI", Color::Yellow, Alignment::Left),
    };

    let mut header = vec![Span::styled(
        label,
        Style::default().fg(label_color).add_modifier(Modifier::BOLD),
    )];
    if let Some(user_id) = entry.meta.user_id.as_deref() {
        if user_id != app.widget.state().user_id() && entry.direction == Direction::Outgoing {
            header.push(Span::styled(
                format!(" · {}", user_id),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    if let Some(time) = entry.meta.timestamp.as_deref().and_then(short_time) {
        header.push(Span::styled(
            format!(" {}", time),
            Style::default().fg(Color::DarkGray),
        ));
    }
    for badge in entry.meta.badges() {
        header.push(Span::styled(
            format!(" [{}]", badge),
            Style::default().fg(Color::Magenta),
        ));
    }
    lines.push(Line::from(header).alignment(alignment));

    match &entry.body {
        EntryBody::Text(text) => {
            for line in text.lines() {
                lines.push(parse_markdown_line(line).alignment(alignment));
            }
        }
        EntryBody::Typing => {
            let frame = TYPING_FRAMES[app.animation_frame as usize % TYPING_FRAMES.len()];
            lines.push(
                Line::from(Span::styled(
                    frame,
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(alignment),
            );
        }
        EntryBody::Error(text) => {
            lines.push(
                Line::from(Span::styled(
                    text.clone(),
                    Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
                ))
                .alignment(alignment),
            );
        }
    }
    lines.push(Line::default());
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let pane = app.widget.pane();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Chat ({} messages) ", pane.len()));

    if pane.welcome_visible() && pane.is_empty() {
        let welcome = Text::from(vec![
            Line::default(),
            Line::from(Span::styled("Welcome to chatpoll", Style::default().fg(Color::Cyan).bold())),
            Line::default(),
            Line::from(Span::styled(
                "Messages from the server log show up here.",
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                "Type below and press Enter to chat, Ctrl+T to generate traffic.",
                Style::default().fg(Color::Gray),
            )),
        ]);
        let paragraph = Paragraph::new(welcome)
            .alignment(Alignment::Center)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        app.max_scroll = 0;
        app.scroll = 0;
        return;
    }

    let mut lines = Vec::new();
    for entry in pane.entries() {
        entry_lines(app, entry, &mut lines);
    }
    let width = usize::from(app.chat_width);
    let rows: Vec<Line> = lines
        .into_iter()
        .flat_map(|line| wrap_line(line, width))
        .collect();

    let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);
    app.max_scroll = total.saturating_sub(app.chat_height);
    app.scroll = if app.widget.pane().sticks_to_bottom() {
        app.max_scroll
    } else {
        app.scroll.min(app.max_scroll)
    };

    let chat = Paragraph::new(Text::from(rows))
        .block(block)
        .scroll((app.scroll, 0));
    frame.render_widget(chat, area);
}

fn render_input_row(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, send_area, traffic_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(10),
        Constraint::Length(13),
    ])
    .areas(area);

    app.send_button = Some(send_area);
    app.traffic_button = Some(traffic_area);

    let enabled = app.input_enabled();
    let (border_color, title) = if enabled {
        (Color::Yellow, " Message (Enter to send, Shift+Enter for newline) ")
    } else {
        (Color::DarkGray, " Input disabled while traffic is generated ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Keep the cursor line visible when the input has more lines than fit
    let (cursor_line, cursor_col) = app.cursor_position();
    let inner_height = input_area.height.saturating_sub(2).max(1);
    let inner_width = input_area.width.saturating_sub(2);
    let line_offset = cursor_line.saturating_sub(inner_height - 1);
    let col_offset = if inner_width > 0 && cursor_col >= inner_width {
        cursor_col - inner_width + 1
    } else {
        0
    };

    let input_style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.input.as_str())
        .style(input_style)
        .block(input_block)
        .scroll((line_offset, col_offset));
    frame.render_widget(input, input_area);

    if enabled {
        frame.set_cursor_position((
            input_area.x + 1 + cursor_col - col_offset,
            input_area.y + 1 + cursor_line - line_offset,
        ));
    }

    render_button(frame, send_area, "Send", enabled && !app.input.trim().is_empty());
    render_button(frame, traffic_area, "Traffic", enabled);
}

fn render_button(frame: &mut Frame, area: Rect, label: &str, enabled: bool) {
    let color = if enabled { Color::Green } else { Color::DarkGray };
    let button = Paragraph::new(Line::from(Span::styled(
        label.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)),
    );
    frame.render_widget(button, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.input_enabled() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Ctrl+T ", key_style),
            Span::styled(" traffic ", label_style),
        ]
    } else {
        vec![Span::styled(
            " generating traffic ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        )]
    };
    hints.extend(vec![
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_traffic_overlay(phase: &TrafficPhase, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 8.min(area.height.saturating_sub(2));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let border_color = match phase {
        TrafficPhase::Failed { .. } => Color::Red,
        _ => Color::Magenta,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Traffic Generation ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [text_area, gauge_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

    let text = match phase {
        TrafficPhase::Starting => Text::from(vec![
            Line::default(),
            Line::from("Starting traffic generation..."),
        ]),
        TrafficPhase::Running {
            job,
            remaining_secs,
            ..
        } => Text::from(vec![
            Line::default(),
            Line::from(format!(
                "Sending {} requests, {}s apart",
                job.num_requests, job.delay_seconds
            )),
            Line::from(Span::styled(
                format!("Input re-enabled in ~{}s", remaining_secs),
                Style::default().fg(Color::Gray),
            )),
        ]),
        TrafficPhase::Failed { message } => Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                format!("Error: {}", message),
                Style::default().fg(Color::Red).bold(),
            )),
            Line::from(Span::styled(
                "Re-enabling input shortly...",
                Style::default().fg(Color::Gray),
            )),
        ]),
    };
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        text_area,
    );

    if let TrafficPhase::Running { remaining_secs, .. } = phase {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
            .ratio(phase.progress().clamp(0.0, 1.0))
            .label(format!("{}s", remaining_secs));
        frame.render_widget(gauge, gauge_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_unclosed() {
        let line = parse_markdown_line("a **b");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "a **b");
    }

    #[test]
    fn test_parse_markdown_empty_markers_stay_literal() {
        let line = parse_markdown_line("x **** y **z**");
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[0].content, "x **** y ");
        assert_eq!(line.spans[1].content, "z");
    }

    #[test]
    fn test_short_time() {
        assert_eq!(short_time("2024-05-01T10:00:00.123456"), Some("10:00:00"));
        assert_eq!(short_time("yesterday"), None);
    }

    fn row_text(row: &Line) -> String {
        row.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_line_breaks_on_words() {
        let rows = wrap_line(Line::from("the quick brown fox jumps"), 10);
        let text: Vec<String> = rows.iter().map(row_text).collect();
        assert_eq!(text, ["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn test_wrap_line_splits_long_words_and_keeps_style() {
        let line = parse_markdown_line("**abcdefghijkl** end").alignment(Alignment::Right);
        let rows = wrap_line(line, 5);
        let text: Vec<String> = rows.iter().map(row_text).collect();
        assert_eq!(text, ["abcde", "fghij", "kl", "end"]);
        assert!(rows[1].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(rows.iter().all(|row| row.alignment == Some(Alignment::Right)));
    }

    #[test]
    fn test_wrap_line_keeps_blank_lines() {
        let rows = wrap_line(Line::default(), 10);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].spans.is_empty());
    }

    #[test]
    fn test_renders_welcome_screen() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Welcome to chatpoll"));
        assert!(text.contains("user_test"));
        assert!(app.send_button.is_some());
    }

    #[tokio::test]
    async fn test_renders_outgoing_message() {
        let mut app = test_app();
        app.input = "ping".to_string();
        app.submit();

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(!text.contains("Welcome to chatpoll"));
        assert!(text.contains("You"));
        assert!(text.contains("ping"));
    }

    #[tokio::test]
    async fn test_renders_traffic_overlay() {
        let mut app = test_app();
        app.trigger_traffic();

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Traffic Generation"));
        assert!(text.contains("Starting traffic generation"));
        assert!(text.contains("Input disabled"));
    }

    #[tokio::test]
    async fn test_newest_message_visible_after_word_wrapped_history() {
        let mut app = test_app();
        for _ in 0..3 {
            app.input = "abcdefghi ".repeat(20);
            app.submit();
        }
        app.input = "LASTMSG".to_string();
        app.submit();

        let mut terminal = Terminal::new(TestBackend::new(30, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert!(app.widget.pane().sticks_to_bottom());
        assert!(app.max_scroll > 0);
        assert_eq!(app.scroll, app.max_scroll);
        assert!(screen_text(&terminal).contains("LASTMSG"));
    }
}
