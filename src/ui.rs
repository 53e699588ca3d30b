use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use fitconnect_core::Sender;

use crate::app::{App, FormField, InputMode, Screen};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Intake => render_intake(app, frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.confirm_reset {
        render_reset_confirm(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" FitConnect ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.language().as_str()),
            Style::default().fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Intake => " FORM ",
        Screen::Chat => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match (app.screen, app.input_mode) {
        (Screen::Intake, _) => vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" next field ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" start ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Normal) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" reset ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
    };

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

fn render_intake(app: &mut App, frame: &mut Frame, area: Rect) {
    let language = app.language();
    let strings = language.strings();

    let form_width = 60.min(area.width.saturating_sub(4));
    let form_height = (FormField::ALL.len() as u16) * 3 + 5;
    let form_area = Rect::new(
        area.x + area.width.saturating_sub(form_width) / 2,
        area.y + area.height.saturating_sub(form_height) / 2,
        form_width,
        form_height.min(area.height),
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", strings.form_title));
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let mut constraints: Vec<Constraint> = FormField::ALL.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(2));
    let rows = Layout::vertical(constraints).split(inner);

    for (i, field) in FormField::ALL.iter().enumerate() {
        let focused = *field == app.form_field;
        let border_color = if focused { Color::Yellow } else { Color::DarkGray };
        let field_block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(format!(" {} ", field.label(language)));

        let value = app.form_value(*field);
        let inner_width = rows[i].width.saturating_sub(2) as usize;
        let len = value.chars().count();
        // Keep the end of long values in view
        let skip = (len + 1).saturating_sub(inner_width);
        let visible: String = value.chars().skip(skip).collect();

        frame.render_widget(
            Paragraph::new(visible)
                .style(Style::default().fg(Color::Cyan))
                .block(field_block),
            rows[i],
        );

        if focused {
            let cursor_x = len.saturating_sub(skip) as u16;
            frame.set_cursor_position((rows[i].x + cursor_x + 1, rows[i].y + 1));
        }
    }

    if let Some(error) = &app.form_error {
        let error_area = rows[FormField::ALL.len()];
        frame.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true }),
            error_area,
        );
    }
}

fn sender_style(sender: Sender) -> Style {
    let color = match sender {
        Sender::User => Color::Cyan,
        Sender::Assistant => Color::Yellow,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let language = app.language();
    let strings = language.strings();

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    // Inner size minus borders, used by scroll_to_bottom
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let title = match app.session.profile() {
        Some(profile) => format!(" FitConnect · {} ", profile.name),
        None => " FitConnect ".to_string(),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.session.messages() {
        lines.push(Line::from(Span::styled(
            format!("{}:", language.label(msg.sender)),
            sender_style(msg.sender),
        )));
        match msg.sender {
            Sender::User => lines.extend(msg.content.lines().map(|l| Line::from(l.to_string()))),
            Sender::Assistant => lines.extend(msg.content.lines().map(parse_markdown_line)),
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            format!("{}:", strings.assistant_label),
            sender_style(Sender::Assistant),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", strings.typing, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing && !app.is_loading() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color));

    if app.input.is_empty() || app.is_loading() {
        frame.render_widget(
            Paragraph::new(strings.type_placeholder)
                .style(Style::default().fg(Color::DarkGray))
                .block(input_block),
            input_area,
        );
        if editing && !app.is_loading() {
            frame.set_cursor_position((input_area.x + 1, input_area.y + 1));
        }
        return;
    }

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };
    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    frame.render_widget(
        Paragraph::new(visible_text)
            .style(Style::default().fg(Color::Cyan))
            .block(input_block),
        input_area,
    );

    if editing {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_reset_confirm(app: &App, frame: &mut Frame, area: Rect) {
    let text = app.language().strings().reset_confirm;
    let popup_width = (text.chars().count() as u16 + 4).min(area.width.saturating_sub(4));
    let popup_height = 3;
    let popup_area = Rect::new(
        area.width.saturating_sub(popup_width) / 2,
        area.height.saturating_sub(popup_height) / 2,
        popup_width,
        popup_height,
    );

    frame.render_widget(Clear, popup_area);
    let popup = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    frame.render_widget(popup, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitconnect_core::{ChatSession, FileStore, Language, UserProfile};
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn bold_markdown_becomes_styled_span() {
        let line = parse_markdown_line("Pick **three** trainers");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "three");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_bold_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "a **b");
    }

    #[test]
    fn intake_screen_shows_form_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let session = ChatSession::new(FileStore::new(tmp.path()), Language::English);
        let mut app = App::new(session, None);
        app.form_error = Some("Please fill in all fields.".into());

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Name"));
        assert!(text.contains("Email"));
        assert!(text.contains("Please fill in all fields."));
    }

    #[tokio::test]
    async fn chat_screen_shows_labels_and_typing_indicator() {
        let tmp = tempfile::tempdir().unwrap();
        let session = ChatSession::new(FileStore::new(tmp.path()), Language::English);
        let mut app = App::new(session, None);
        app.form = UserProfile {
            name: "Ana".into(),
            birth_date: "1990-06-15".into(),
            phone: "1".into(),
            email: "a@b.c".into(),
        };
        app.submit_form();
        assert_eq!(app.screen, Screen::Chat);

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("User:"));
        assert!(text.contains("Typing."));
        assert!(app.chat_height > 0);
    }
}
