//! Drawing for the tabbed interface.
//!
//! Lines are built owned each frame; the transcript is small enough
//! that cloning beats fighting the borrow of the app state needed for
//! scroll write-back.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::{App, NoticeKind, Tab};
use crate::core::capabilities::CapabilityStatus;
use crate::core::message::Role;

pub(crate) fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    match app.tab {
        Tab::Chat => draw_chat(f, app, chunks[1]),
        Tab::Settings => draw_settings(f, app, chunks[1]),
        Tab::Tools => draw_tools(f, app, chunks[1]),
    }
    draw_status(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles = Tab::ALL.iter().map(|tab| tab.title());
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).title("causerie"))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn draw_chat(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let lines = transcript_lines(app);

    // Pin to the bottom while auto-scrolling; clamping back onto the
    // last line re-engages it after a manual scroll.
    let total_lines = lines.len() as u16;
    let max_offset = total_lines.saturating_sub(chunks[0].height);
    if app.auto_scroll || app.scroll_offset >= max_offset {
        app.scroll_offset = max_offset;
        app.auto_scroll = true;
    }

    let messages = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    f.render_widget(messages, chunks[0]);

    let input_title = if app.session.is_pending() {
        "Waiting for the assistant…"
    } else {
        "Type your message (Enter to send, Ctrl+N for new chat)"
    };
    let input = Paragraph::new(app.input.clone())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(input_title))
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[1]);

    f.set_cursor_position((
        chunks[1].x + 1 + app.input.as_str().width() as u16,
        chunks[1].y + 1,
    ));
}

fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let transcript = app.session.transcript();

    if transcript.is_empty() && !app.session.is_pending() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Start a conversation with your AI assistant",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            "Tools enabled in the Tools tab are shared with the assistant",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    for msg in transcript {
        match msg.role {
            Role::User => {
                let mut first = true;
                for content_line in msg.content.lines() {
                    if first {
                        lines.push(Line::from(vec![
                            Span::styled(
                                "You: ",
                                Style::default()
                                    .fg(Color::Cyan)
                                    .add_modifier(Modifier::BOLD),
                            ),
                            Span::styled(
                                content_line.to_string(),
                                Style::default().fg(Color::Cyan),
                            ),
                        ]));
                        first = false;
                    } else {
                        lines.push(Line::from(Span::styled(
                            format!("     {content_line}"),
                            Style::default().fg(Color::Cyan),
                        )));
                    }
                }
            }
            Role::Assistant => {
                if msg.content.is_empty() {
                    lines.push(Line::from(""));
                }
                for content_line in msg.content.lines() {
                    lines.push(Line::from(Span::styled(
                        content_line.to_string(),
                        Style::default().fg(Color::White),
                    )));
                }
            }
        }
        lines.push(Line::from(Span::styled(
            msg.time_label(),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
    }

    if app.session.is_pending() {
        lines.push(Line::from(Span::styled(
            "● waiting for reply…",
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines
}

fn draw_settings(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let current = match &app.key_display {
        Some(masked) => format!("Current key: {masked}"),
        None => "No API key is stored.".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled(
            "Primary API key",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(current),
        Line::from(""),
        Line::from(Span::styled(
            "Type a new key and press Enter to save.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Ctrl+D clears the stored key.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let panel =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Settings"));
    f.render_widget(panel, chunks[0]);

    let masked: String = "*".repeat(app.key_input.chars().count());
    let input = Paragraph::new(masked.clone())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("New API key"));
    f.render_widget(input, chunks[1]);

    f.set_cursor_position((
        chunks[1].x + 1 + masked.as_str().width() as u16,
        chunks[1].y + 1,
    ));
}

fn draw_tools(f: &mut Frame, app: &App, area: Rect) {
    let editing = app.key_edit.is_some();
    let (list_area, edit_area) = if editing {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "Enable capabilities to extend your assistant; they are described",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "to the model with every request.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    for (i, capability) in app.session.capabilities().entries().iter().enumerate() {
        let marker = if i == app.tools_cursor { "▶ " } else { "  " };
        let toggle = if capability.enabled { "[on] " } else { "[off]" };
        let toggle_style = if capability.enabled {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let status = capability.status();
        let status_style = match status {
            CapabilityStatus::Connected => Style::default().fg(Color::Green),
            CapabilityStatus::Disconnected => Style::default().fg(Color::DarkGray),
        };

        lines.push(Line::from(vec![
            Span::raw(marker.to_string()),
            Span::styled(
                format!("{:<12}", capability.def.display_name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(toggle.to_string(), toggle_style),
            Span::raw("  "),
            Span::styled(status.as_str().to_string(), status_style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("    {}", capability.def.description),
            Style::default().fg(Color::DarkGray),
        )));
        if let Some(hint) = capability.def.key_hint {
            lines.push(Line::from(Span::styled(
                format!("    {hint}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "↑/↓: select · Space: toggle · Enter: set key",
        Style::default().fg(Color::DarkGray),
    )));

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Tools"))
        .wrap(Wrap { trim: false });
    f.render_widget(panel, list_area);

    if let (Some(edit_area), Some(buffer)) = (edit_area, app.key_edit.as_ref()) {
        let name = app.session.capabilities().entries()[app.tools_cursor]
            .def
            .display_name;
        let masked: String = "*".repeat(buffer.chars().count());
        let input = Paragraph::new(masked.clone())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(format!(
                "{name} API key (Enter to save, Esc to cancel)"
            )));
        f.render_widget(input, edit_area);
        f.set_cursor_position((
            edit_area.x + 1 + masked.as_str().width() as u16,
            edit_area.y + 1,
        ));
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.notice {
        Some(notice) => {
            let style = match notice.kind {
                NoticeKind::Info => Style::default().fg(Color::Green),
                NoticeKind::Error => Style::default().fg(Color::Red),
            };
            Line::from(Span::styled(notice.text.clone(), style))
        }
        None => Line::from(Span::styled(
            "Tab: switch view · Ctrl+C: quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}
