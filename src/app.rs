use std::path::PathBuf;
use ratatui::layout::Rect;
use crate::attachment::Attachment;
use crate::client::{AskRequest, InferenceClient, Reply};
use crate::transcript::{Entry, RequestId, Transcript};

/// Shown while a request is in flight (the UI animates trailing dots).
pub const PLACEHOLDER_TEXT: &str = "Thinking";
pub const TRANSPORT_FAILURE: &str = "Sorry, something went wrong. Could not connect to the server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Compose,
    AttachPath,
}

/// Generation number of an attachment selection. Only the newest one may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachTicket(u64);

/// A submit that has been recorded in the transcript and still needs sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsk {
    pub id: RequestId,
    pub request: AskRequest,
}

/// Single-line editable text with a char-indexed cursor
#[derive(Debug, Default, Clone)]
pub struct TextField {
    text: String,
    cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl TextField {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Compose state
    pub input: TextField,
    attachment: Option<Attachment>,
    attach_ticket: u64,
    loading_attachment: Option<PathBuf>,
    pub attach_path: TextField,
    pub status: Option<String>,

    // Transcript state
    transcript: Transcript,
    next_request_id: u64,
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat area for scroll calculations
    chat_lines: u16,      // Wrapped line count of the transcript at the last render
    follow_bottom: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub send_button: Option<Rect>,
    pub attach_button: Option<Rect>,
    pub remove_button: Option<Rect>,

    pub client: InferenceClient,
}

impl App {
    pub fn new(client: InferenceClient) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Compose,

            input: TextField::default(),
            attachment: None,
            attach_ticket: 0,
            loading_attachment: None,
            attach_path: TextField::default(),
            status: None,

            transcript: Transcript::new(),
            next_request_id: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_lines: 0,
            follow_bottom: true,

            animation_frame: 0,

            chat_area: None,
            send_button: None,
            attach_button: None,
            remove_button: None,

            client,
        }
    }

    pub fn input_text(&self) -> &str {
        self.input.text()
    }

    #[cfg(test)]
    pub fn set_input_text(&mut self, text: &str) {
        self.input.set(text);
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Path of a selection that is still being decoded
    pub fn loading_attachment(&self) -> Option<&PathBuf> {
        self.loading_attachment.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Start a new selection. Any earlier selection still decoding is superseded.
    pub fn begin_attachment(&mut self, path: PathBuf) -> AttachTicket {
        self.attach_ticket += 1;
        self.loading_attachment = Some(path);
        self.status = None;
        AttachTicket(self.attach_ticket)
    }

    /// Install a decoded image, replacing whatever was attached before.
    pub fn finish_attachment(&mut self, ticket: AttachTicket, result: anyhow::Result<Attachment>) {
        if ticket.0 != self.attach_ticket {
            tracing::debug!(ticket = ticket.0, current = self.attach_ticket, "dropping stale attachment");
            return;
        }
        self.loading_attachment = None;

        match result {
            Ok(attachment) => {
                tracing::info!(name = %attachment.name, mime = attachment.mime, bytes = attachment.byte_len, "image attached");
                self.attachment = Some(attachment);
                self.status = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not attach image");
                self.status = Some(format!("Could not attach image: {:#}", e));
            }
        }
    }

    /// Drop the pending image and reset the picker so the same file can be chosen again.
    pub fn remove_attachment(&mut self) {
        self.attach_ticket += 1;
        self.attachment = None;
        self.loading_attachment = None;
        self.attach_path.clear();
    }

    /// Record a submit in the transcript and hand back the request to send.
    /// Returns `None` when there is neither text nor an image.
    pub fn submit(&mut self) -> Option<PendingAsk> {
        let text = self.input.text().trim().to_string();
        if text.is_empty() && self.attachment.is_none() {
            return None;
        }

        let text = (!text.is_empty()).then_some(text);
        let image_label = self.attachment.as_ref().map(Attachment::label);
        self.push_entry(Entry::user(image_label, text.clone()));

        let request = AskRequest {
            prompt: text,
            image: self.attachment.as_ref().map(|a| a.data_url.clone()),
        };

        self.input.clear();
        self.remove_attachment();
        self.status = None;

        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        self.push_entry(Entry::placeholder(id));

        tracing::info!(
            request = id.0,
            has_prompt = request.prompt.is_some(),
            has_image = request.image.is_some(),
            "submitting"
        );

        Some(PendingAsk { id, request })
    }

    /// Replace the placeholder for `id` with the outcome of its request.
    pub fn resolve(&mut self, id: RequestId, outcome: anyhow::Result<Reply>) {
        if !self.transcript.remove_placeholder(id) {
            tracing::warn!(request = id.0, entries = self.transcript.len(), "no placeholder left for request");
        }

        let entry = match outcome {
            Ok(Reply::Answer(text)) => {
                tracing::info!(request = id.0, chars = text.chars().count(), "reply received");
                Entry::assistant(text)
            }
            Ok(Reply::Rejected(error)) => {
                tracing::warn!(request = id.0, %error, "backend rejected request");
                Entry::system(format!("Error: {}", error))
            }
            Err(e) => {
                tracing::error!(request = id.0, error = ?e, "request failed");
                Entry::system(TRANSPORT_FAILURE)
            }
        };
        self.push_entry(entry);
    }

    fn push_entry(&mut self, entry: Entry) {
        self.transcript.push(entry);
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.transcript.has_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat so the newest entry is visible. The exact offset is settled
    /// on the next render, once the wrapped height is known.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_bottom = self.chat_scroll == max_scroll;
    }

    /// Record the wrapped height of the transcript as last rendered.
    pub fn set_chat_lines(&mut self, total_lines: u16) {
        self.chat_lines = total_lines;
        if self.follow_bottom {
            self.chat_scroll = self.max_chat_scroll();
        }
    }

    #[cfg(test)]
    pub fn follows_bottom(&self) -> bool {
        self.follow_bottom
    }

    fn max_chat_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.chat_height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use crate::transcript::Origin;

    fn app() -> App {
        App::new(InferenceClient::new("http://127.0.0.1:1/ask-ai"))
    }

    fn png(name: &str) -> Attachment {
        Attachment::from_bytes(name, "image/png", b"png-bytes")
    }

    fn attach(app: &mut App, att: Attachment) {
        let ticket = app.begin_attachment(PathBuf::from(&att.name));
        app.finish_attachment(ticket, Ok(att));
    }

    #[test]
    fn test_empty_submit_is_noop() {
        let mut app = app();
        app.set_input_text("   \t ");
        assert_eq!(app.submit(), None);
        assert!(app.transcript().is_empty());
        assert_eq!(app.input_text(), "   \t ");
    }

    #[test]
    fn test_text_only_submit() {
        let mut app = app();
        app.set_input_text("  Hi there  ");
        let pending = app.submit().unwrap();

        assert_eq!(pending.request, AskRequest { prompt: Some("Hi there".into()), image: None });
        let entries = app.transcript().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Entry::user(None, Some("Hi there".into())));
        assert_eq!(entries[1], Entry::placeholder(pending.id));
        assert_eq!(app.input_text(), "");
        assert_eq!(app.input.cursor(), 0);
    }

    #[test]
    fn test_image_only_submit() {
        let mut app = app();
        let att = png("cat.png");
        let label = att.label();
        let data_url = att.data_url.clone();
        attach(&mut app, att);

        let pending = app.submit().unwrap();
        assert_eq!(pending.request, AskRequest { prompt: None, image: Some(data_url) });

        let user = &app.transcript().entries()[0];
        assert_eq!(user.origin, Origin::User);
        assert_eq!(user.image(), Some(label.as_str()));
        assert_eq!(user.text(), None);
        assert!(app.attachment().is_none());
    }

    #[test]
    fn test_success_replaces_placeholder() {
        let mut app = app();
        app.set_input_text("Hi");
        let pending = app.submit().unwrap();
        app.resolve(pending.id, Ok(Reply::Answer("Hello".into())));

        let t = app.transcript();
        assert_eq!(t.len(), 2);
        assert_eq!(t.last(), Some(&Entry::assistant("Hello")));
        assert!(!t.has_pending());
    }

    #[test]
    fn test_rejection_becomes_system_entry() {
        let mut app = app();
        app.set_input_text("Hi");
        let pending = app.submit().unwrap();
        app.resolve(pending.id, Ok(Reply::Rejected("bad input".into())));

        let last = app.transcript().last().unwrap();
        assert_eq!(last.origin, Origin::System);
        assert!(last.text().unwrap().contains("bad input"));
    }

    #[test]
    fn test_transport_failure_uses_fixed_message() {
        let mut app = app();
        attach(&mut app, png("a.png"));
        app.set_input_text("Hi");
        let pending = app.submit().unwrap();
        let before_placeholder = app.transcript().len() - 1;

        app.resolve(pending.id, Err(anyhow!("connection refused")));

        let t = app.transcript();
        assert_eq!(t.len(), before_placeholder + 1);
        assert_eq!(t.last(), Some(&Entry::system(TRANSPORT_FAILURE)));
        assert!(app.attachment().is_none());
        assert_eq!(app.input_text(), "");
    }

    #[test]
    fn test_new_selection_replaces_attachment() {
        let mut app = app();
        attach(&mut app, png("first.png"));
        attach(&mut app, png("second.png"));
        assert_eq!(app.attachment().unwrap().name, "second.png");

        let pending = app.submit().unwrap();
        assert_eq!(pending.request.image.as_deref(), Some(png("second.png").data_url.as_str()));
        assert_eq!(app.transcript().entries()[0].image(), Some(png("second.png").label().as_str()));
    }

    #[test]
    fn test_stale_decode_is_ignored() {
        let mut app = app();
        let old = app.begin_attachment(PathBuf::from("old.png"));
        let new = app.begin_attachment(PathBuf::from("new.png"));

        app.finish_attachment(new, Ok(png("new.png")));
        app.finish_attachment(old, Ok(png("old.png")));
        assert_eq!(app.attachment().unwrap().name, "new.png");
    }

    #[test]
    fn test_remove_discards_in_flight_decode() {
        let mut app = app();
        app.attach_path.set("/tmp/a.png");
        let ticket = app.begin_attachment(PathBuf::from("/tmp/a.png"));
        app.remove_attachment();
        app.finish_attachment(ticket, Ok(png("a.png")));

        assert!(app.attachment().is_none());
        assert!(app.loading_attachment().is_none());
        assert_eq!(app.attach_path.text(), "");
    }

    #[test]
    fn test_failed_decode_sets_status_only() {
        let mut app = app();
        attach(&mut app, png("keep.png"));
        let ticket = app.begin_attachment(PathBuf::from("broken.txt"));
        app.finish_attachment(ticket, Err(anyhow!("not an image")));

        assert!(app.status.as_deref().unwrap().contains("not an image"));
        assert_eq!(app.attachment().unwrap().name, "keep.png");
        assert!(app.transcript().is_empty());
    }

    #[test]
    fn test_overlapping_requests_resolve_their_own_placeholder() {
        let mut app = app();
        app.set_input_text("one");
        let first = app.submit().unwrap();
        app.set_input_text("two");
        let second = app.submit().unwrap();

        app.resolve(first.id, Ok(Reply::Answer("A1".into())));
        assert_eq!(app.transcript().len(), 4);
        assert!(app.transcript().has_pending());

        app.resolve(second.id, Ok(Reply::Answer("A2".into())));
        assert!(!app.transcript().has_pending());
        assert_eq!(app.transcript().last(), Some(&Entry::assistant("A2")));
    }

    #[test]
    fn test_manual_scroll_releases_and_regains_bottom() {
        let mut app = app();
        app.chat_height = 4;
        app.set_chat_lines(30);
        assert_eq!(app.chat_scroll, 26);

        app.scroll_up(10);
        assert_eq!(app.chat_scroll, 16);
        assert!(!app.follows_bottom());

        // Content growing while scrolled back leaves the view where it is
        app.set_chat_lines(33);
        assert_eq!(app.chat_scroll, 16);

        app.scroll_down(100);
        assert_eq!(app.chat_scroll, 29);
        assert!(app.follows_bottom());
    }

    #[test]
    fn test_new_entry_snaps_back_to_bottom() {
        let mut app = app();
        app.chat_height = 4;
        app.set_chat_lines(30);
        app.scroll_up(10);

        app.set_input_text("again");
        app.submit().unwrap();
        assert!(app.follows_bottom());
        app.set_chat_lines(36);
        assert_eq!(app.chat_scroll, 32);
    }

    #[test]
    fn test_text_field_is_utf8_safe() {
        let mut field = TextField::default();
        for c in "héllo".chars() {
            field.insert(c);
        }
        field.left();
        field.left();
        field.left();
        field.backspace();
        assert_eq!(field.text(), "hllo");
        field.delete();
        assert_eq!(field.text(), "hlo");
        field.end();
        field.insert('!');
        assert_eq!(field.text(), "hlo!");
        field.home();
        field.insert('¡');
        assert_eq!(field.text(), "¡hlo!");
    }
}
