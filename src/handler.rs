use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::attachment;
use crate::tui::{AppEvent, EventSender};

pub fn handle_event(app: &mut App, event: AppEvent, tx: &EventSender) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse, tx),
        AppEvent::Resize => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::AttachmentLoaded { ticket, result } => app.finish_attachment(ticket, result),
        AppEvent::ReplyReceived { id, outcome } => app.resolve(id, outcome),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &EventSender) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c') | KeyCode::Char('q') = key.code {
            app.should_quit = true;
            return;
        }
    }

    match app.input_mode {
        InputMode::Compose => handle_compose(app, key, tx),
        InputMode::AttachPath => handle_attach_path(app, key, tx),
    }
}

fn handle_compose(app: &mut App, key: KeyEvent, tx: &EventSender) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Enter submits; the field is single-line so it never inserts a newline
        KeyCode::Enter => send(app, tx),
        KeyCode::Char('s') if ctrl => send(app, tx),
        KeyCode::Char('o') if ctrl => open_attach_prompt(app),
        KeyCode::Char('x') if ctrl => app.remove_attachment(),

        KeyCode::PageUp => app.scroll_up(app.chat_height.max(2) / 2),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(2) / 2),

        KeyCode::Backspace => app.input.backspace(),
        KeyCode::Delete => app.input.delete(),
        KeyCode::Left => app.input.left(),
        KeyCode::Right => app.input.right(),
        KeyCode::Home => app.input.home(),
        KeyCode::End => app.input.end(),
        KeyCode::Char(c) if !ctrl => app.input.insert(c),
        _ => {}
    }
}

fn handle_attach_path(app: &mut App, key: KeyEvent, tx: &EventSender) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Compose;
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Compose;
            match attachment::resolve_input_path(app.attach_path.text()) {
                Some(path) => select_image(app, path, tx),
                None => app.status = Some("No file path entered".to_string()),
            }
        }
        KeyCode::Backspace => app.attach_path.backspace(),
        KeyCode::Delete => app.attach_path.delete(),
        KeyCode::Left => app.attach_path.left(),
        KeyCode::Right => app.attach_path.right(),
        KeyCode::Home => app.attach_path.home(),
        KeyCode::End => app.attach_path.end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.attach_path.insert(c),
        _ => {}
    }
}

fn open_attach_prompt(app: &mut App) {
    app.input_mode = InputMode::AttachPath;
    app.attach_path.end();
}

/// Start decoding `path` in the background; the result lands as `AttachmentLoaded`.
pub fn select_image(app: &mut App, path: std::path::PathBuf, tx: &EventSender) {
    let ticket = app.begin_attachment(path.clone());
    tracing::debug!(path = %path.display(), "loading attachment");

    let tx = tx.clone();
    tokio::spawn(async move {
        let result = attachment::load(path).await;
        let _ = tx.send(AppEvent::AttachmentLoaded { ticket, result });
    });
}

/// Submit the compose buffer and spawn the request. Nothing happens for an empty buffer.
fn send(app: &mut App, tx: &EventSender) {
    let Some(pending) = app.submit() else {
        return;
    };

    let client = app.client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = client.ask(&pending.request).await;
        let _ = tx.send(AppEvent::ReplyReceived { id: pending.id, outcome });
    });
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, tx: &EventSender) {
    let x = mouse.column;
    let y = mouse.row;
    let hit = |area: Option<Rect>| area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if hit(app.chat_area) => app.scroll_down(3),
        MouseEventKind::ScrollUp if hit(app.chat_area) => app.scroll_up(3),
        // Buttons belong to the compose row; the attach popup sits on top of them
        MouseEventKind::Down(MouseButton::Left) if app.input_mode == InputMode::Compose => {
            if hit(app.remove_button) {
                app.remove_attachment();
            } else if hit(app.send_button) {
                send(app, tx);
            } else if hit(app.attach_button) {
                open_attach_prompt(app);
            }
        }
        _ => {}
    }
}
