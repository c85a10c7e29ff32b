use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use chemrag_core::{citations, split_emphasis, Message, Role};

use crate::app::{App, FocusPane, InputMode};

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Role::Assistant => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

fn link_style() -> Style {
    Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED)
}

/// Convert `**bold**` markup to styled spans, one `Line` per line of content.
///
/// Emphasis is decided over the whole text, so a bold run may continue onto
/// the next line.
pub fn content_lines(content: &str) -> Vec<Line<'static>> {
    let mut lines = vec![Line::default()];

    for segment in split_emphasis(content) {
        let style = if segment.emphasized {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        for (i, piece) in segment.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            if !piece.is_empty() {
                if let Some(line) = lines.last_mut() {
                    line.spans.push(Span::styled(piece.to_string(), style));
                }
            }
        }
    }

    lines
}

/// Citation block under an assistant message; empty when there is nothing to cite.
pub fn citation_lines(message: &Message) -> Vec<Line<'static>> {
    let Some(sources) = citations(message) else {
        return Vec::new();
    };

    let mut lines = vec![Line::from(Span::styled(
        "Sources:",
        Style::default().fg(Color::DarkGray),
    ))];
    lines.extend(
        sources
            .iter()
            .map(|src| Line::from(Span::styled(src.clone(), link_style()))),
    );
    lines
}

pub fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        message.role.label(),
        role_style(message.role),
    ))];
    lines.extend(content_lines(&message.content));
    lines.extend(citation_lines(message));
    lines.push(Line::default());
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: navbar, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_navbar(app, frame, header_area);
    render_chat_screen(app, frame, body_area);
    render_footer(app, frame, footer_area);
}

fn render_navbar(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" ChemRAG ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(" Home ", Style::default().fg(Color::White)),
        Span::styled(format!(" {} ", app.base_url), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
            ];
            if app.focus == FocusPane::Sources {
                hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" select ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" open ", label_style),
                ]);
            } else {
                hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    if let Some(status) = &app.status {
        hints.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Yellow)));
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let sources = app.conversation.all_sources().len();

    // Sources panel height (if we have any)
    let sources_height = if sources == 0 {
        0
    } else {
        (sources.min(5) + 2) as u16 // +2 for borders
    };

    let [chat_area, sources_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(sources_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);
    app.sources_area = if sources_height > 0 { Some(sources_area) } else { None };

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_messages(app, frame, chat_area);
    if sources_height > 0 {
        render_sources(app, frame, sources_area);
    }
    render_input(app, frame, input_area);
}

fn render_messages(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.focus == FocusPane::Chat { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let in_flight = app.conversation.is_in_flight();
    let text = if app.conversation.is_empty() && !in_flight {
        Text::from(Span::styled(
            "Ask a question about your chemistry documents...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = app
            .conversation
            .messages()
            .iter()
            .flat_map(message_lines)
            .collect();

        if in_flight {
            lines.push(Line::from(Span::styled(
                Role::Assistant.label(),
                role_style(Role::Assistant),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_sources(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_color = if app.focus == FocusPane::Sources { Color::Cyan } else { Color::Magenta };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Sources (Tab to focus, Enter to open) ");

    let items: Vec<ListItem> = app
        .conversation
        .all_sources()
        .iter()
        .enumerate()
        .map(|(i, src)| {
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {}. ", i + 1)),
                Span::styled(src.to_string(), link_style()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.sources_state);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.input_enabled();
    let editing = app.input_mode == InputMode::Editing;

    let border_color = if !enabled {
        Color::DarkGray
    } else if app.focus == FocusPane::Input || editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = if enabled { " Ask " } else { " Waiting for response... " };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let pending = app.conversation.pending();
    let cursor_pos = pending.cursor();

    // Keep the cursor visible
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if pending.input().is_empty() && enabled {
        Paragraph::new(Span::styled(
            "Type your question",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = pending
            .input()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let fg = if enabled { Color::Cyan } else { Color::DarkGray };
        Paragraph::new(visible_text).style(Style::default().fg(fg))
    };

    frame.render_widget(input.block(block), area);

    // Show cursor when editing
    if editing && enabled {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chemrag_core::{AskBackend, AskRequest, AskResponse, QueryDispatcher, RequestError};
    use ratatui::{backend::TestBackend, Terminal};

    struct NoBackend;

    #[async_trait]
    impl AskBackend for NoBackend {
        async fn ask(&self, _request: &AskRequest) -> Result<AskResponse, RequestError> {
            std::future::pending().await
        }
    }

    fn spans(line: &Line<'_>) -> Vec<(String, bool)> {
        line.spans
            .iter()
            .map(|s| (s.content.to_string(), s.style.add_modifier.contains(Modifier::BOLD)))
            .collect()
    }

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        App::new(QueryDispatcher::new(NoBackend), "http://localhost:5000")
    }

    #[test]
    fn test_bold_markup_spans() {
        let lines = content_lines("The **active** ingredient");
        assert_eq!(lines.len(), 1);
        assert_eq!(
            spans(&lines[0]),
            vec![
                ("The ".to_string(), false),
                ("active".to_string(), true),
                (" ingredient".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_bold_run_spans_lines() {
        let lines = content_lines("**first\nsecond** plain\n\nend");
        assert_eq!(lines.len(), 4);
        assert_eq!(spans(&lines[0]), vec![("first".to_string(), true)]);
        assert_eq!(
            spans(&lines[1]),
            vec![("second".to_string(), true), (" plain".to_string(), false)]
        );
        assert!(lines[2].spans.is_empty());
        assert_eq!(spans(&lines[3]), vec![("end".to_string(), false)]);
    }

    #[test]
    fn test_no_citations_without_sources() {
        assert!(citation_lines(&Message::assistant("X", Vec::new())).is_empty());
    }

    #[test]
    fn test_one_link_per_source_in_order() {
        let message = Message::assistant("X", vec!["https://b".into(), "https://a".into()]);
        let lines = citation_lines(&message);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].spans[0].content, "https://b");
        assert_eq!(lines[2].spans[0].content, "https://a");
        assert!(lines[1].spans[0].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_message_lines_layout() {
        let lines = message_lines(&Message::user("hi"));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].spans[0].content, "You");
        assert_eq!(lines[1].spans[0].content, "hi");
        assert!(lines[2].spans.is_empty());
    }

    #[test]
    fn test_render_empty_screen() {
        let mut app = app();
        let text = screen_text(&mut app);
        assert!(text.contains("ChemRAG"));
        assert!(text.contains("Home"));
        assert!(text.contains("Ask a question about your chemistry documents"));
        assert!(text.contains("Type your question"));
        assert!(app.sources_area.is_none());
    }

    #[test]
    fn test_render_conversation_with_sources() {
        let mut app = app();
        app.conversation.append_user("what is **pH**?");
        app.conversation
            .append_assistant("It measures **acidity**.", vec!["https://ph.example".into()]);

        let text = screen_text(&mut app);
        assert!(text.contains("You"));
        assert!(text.contains("what is pH?"));
        assert!(text.contains("It measures acidity."));
        assert!(text.contains("Sources:"));
        assert!(text.contains("1. https://ph.example"));
        assert!(app.sources_area.is_some());
    }

    #[tokio::test]
    async fn test_render_pending_state() {
        let mut app = app();
        app.conversation.pending_mut().set_input("why?");
        app.submit_query();

        let text = screen_text(&mut app);
        assert!(text.contains("Thinking."));
        assert!(text.contains("Waiting for response..."));
    }
}
