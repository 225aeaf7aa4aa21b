//! Transcript model for the chat view
//!
//! Entries are append-only. The only removal is a placeholder being taken out
//! right before the entry that resolves it is appended.

/// Identifies one in-flight request and its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Who an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Message {
        /// Label of the image that went with the message, if any
        image: Option<String>,
        text: Option<String>,
    },
    Pending(RequestId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub origin: Origin,
    pub body: Body,
}

impl Entry {
    pub fn user(image: Option<String>, text: Option<String>) -> Self {
        Self {
            origin: Origin::User,
            body: Body::Message { image, text },
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Assistant,
            body: Body::Message { image: None, text: Some(text.into()) },
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::System,
            body: Body::Message { image: None, text: Some(text.into()) },
        }
    }

    pub fn placeholder(id: RequestId) -> Self {
        Self {
            origin: Origin::Assistant,
            body: Body::Pending(id),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.body, Body::Pending(_))
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Body::Message { text, .. } => text.as_deref(),
            Body::Pending(_) => None,
        }
    }

    pub fn image(&self) -> Option<&str> {
        match &self.body {
            Body::Message { image, .. } => image.as_deref(),
            Body::Pending(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Remove the placeholder for `id`. Returns false if it was already gone.
    pub fn remove_placeholder(&mut self, id: RequestId) -> bool {
        match self.entries.iter().rposition(|e| e.body == Body::Pending(id)) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(Entry::is_placeholder)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
