use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, InputMode, PLACEHOLDER_TEXT};
use crate::attachment::Attachment;
use crate::transcript::Origin;

const REMOVE_LABEL: &str = " [x] ";

/// Convert `**bold**` runs in a line into styled spans. An unmatched `**` stays literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    // An even part count means the last `**` never closed
    let closed = parts.len() % 2 == 1;

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let is_last = i == parts.len() - 1;
        if i % 2 == 1 && (closed || !is_last) && !part.is_empty() {
            spans.push(Span::styled(
                part.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else if i % 2 == 1 {
            spans.push(Span::raw(format!("**{}", part)));
        } else if !part.is_empty() {
            spans.push(Span::raw(part.to_string()));
        }
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, attachment_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_attachment_bar(app, frame, attachment_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::AttachPath {
        render_attach_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" vision-chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.endpoint().to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    // Store chat area height for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let chat_text = chat_text(app);

    // Measure with the same wrapping the widget uses so the newest entry stays in view
    let total_lines = Paragraph::new(chat_text.clone())
        .wrap(Wrap { trim: false })
        .line_count(inner_width.max(1));
    app.set_chat_lines(total_lines.min(u16::MAX as usize) as u16);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn chat_text(app: &App) -> Text<'static> {
    let transcript = app.transcript();
    if transcript.is_empty() {
        return Text::from(Span::styled(
            "Type a message, or press Ctrl+O to attach an image...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line<'static>> = Vec::new();

    for entry in transcript.entries() {
        let (label, color) = match entry.origin {
            Origin::User => ("You:", Color::Cyan),
            Origin::Assistant => ("AI:", Color::Yellow),
            Origin::System => ("System:", Color::Red),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        if entry.is_placeholder() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("{}{}", PLACEHOLDER_TEXT, dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        if let Some(image) = entry.image() {
            lines.push(Line::from(Span::styled(
                format!("[image] {}", image),
                Style::default().fg(Color::Magenta),
            )));
        }
        for line in entry.text().unwrap_or_default().lines() {
            match entry.origin {
                Origin::Assistant => lines.push(parse_markdown_line(line)),
                Origin::System => lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Red),
                ))),
                Origin::User => lines.push(Line::from(line.to_string())),
            }
        }
        lines.push(Line::default());
    }

    Text::from(lines)
}

fn render_attachment_bar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.remove_button = None;

    let attachment_label = app.attachment().map(Attachment::label);
    let line = if let Some(attachment_label) = attachment_label {
        let label = Span::styled(format!(" Image: {} ", attachment_label), Style::default().fg(Color::Magenta));
        let label_width = label.width().min(u16::MAX as usize) as u16;
        let remove_x = area.x.saturating_add(label_width);
        if remove_x < area.x + area.width {
            let width = (Span::raw(REMOVE_LABEL).width() as u16).min(area.x + area.width - remove_x);
            app.remove_button = Some(Rect::new(remove_x, area.y, width, 1));
        }
        Line::from(vec![
            label,
            Span::styled(REMOVE_LABEL, Style::default().fg(Color::Red).bold()),
        ])
    } else if let Some(path) = app.loading_attachment() {
        Line::from(Span::styled(
            format!(" Loading {}...", path.display()),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(status) = &app.status {
        Line::from(Span::styled(format!(" {}", status), Style::default().fg(Color::Red)))
    } else {
        Line::default()
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let [field_area, send_area, attach_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(10),
        Constraint::Length(12),
    ])
    .areas(area);

    app.send_button = Some(send_area);
    app.attach_button = Some(attach_area);

    let editing = app.input_mode == InputMode::Compose;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send) ");

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = field_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input.cursor();
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input_text()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, field_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((field_area.x + cursor_x + 1, field_area.y + 1));
    }

    render_button(frame, send_area, "Send", Color::Green);
    render_button(frame, attach_area, "Attach", Color::Magenta);
}

fn render_button(frame: &mut Frame, area: Rect, label: &str, color: Color) {
    let button = Paragraph::new(Span::styled(label.to_string(), Style::default().fg(color).bold()))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color)));
    frame.render_widget(button, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Compose => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::AttachPath => (" ATTACH ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match app.input_mode {
        InputMode::Compose => &[
            ("Enter", "send"),
            ("^O", "attach"),
            ("^X", "remove image"),
            ("PgUp/PgDn", "scroll"),
            ("^C", "quit"),
        ],
        InputMode::AttachPath => &[("Enter", "select"), ("Esc", "cancel")],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);
    if popup_width == 0 || popup_height == 0 {
        return;
    }

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach image ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let instructions = Paragraph::new("Path to a png, jpg, gif, webp or bmp file:")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    // Too short for the input row below the instructions
    if inner.height < 3 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let cursor_pos = app.attach_path.cursor();
    let scroll_offset = if width > 0 && cursor_pos >= width {
        cursor_pos - width + 1
    } else {
        0
    };
    let visible: String = app
        .attach_path
        .text()
        .chars()
        .skip(scroll_offset)
        .take(width)
        .collect();

    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);

    let cursor_x = (cursor_pos - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}
