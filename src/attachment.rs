use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// An image picked from disk, held as a data URL until it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime: &'static str,
    pub byte_len: usize,
    pub data_url: String,
}

impl Attachment {
    pub fn from_bytes(name: &str, mime: &'static str, bytes: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            mime,
            byte_len: bytes.len(),
            data_url: format!("data:{};base64,{}", mime, BASE64.encode(bytes)),
        }
    }

    /// Short label for the thumbnail chip and the transcript, e.g. `cat.png (12.4 KB)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, human_size(self.byte_len))
    }
}

/// Read an image file and encode it as a data URL.
pub async fn load(path: PathBuf) -> Result<Attachment> {
    let mime = guess_image_mime(&path)
        .ok_or_else(|| anyhow!("{} is not a supported image (png, jpg, gif, webp, bmp)", path.display()))?;

    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Attachment::from_bytes(&name, mime, &bytes))
}

/// Expand a leading `~/` and trim whatever the user typed into the prompt.
pub fn resolve_input_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Some(home.join(rest));
        }
    }
    Some(PathBuf::from(trimmed))
}

fn guess_image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn human_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_bytes_builds_data_url() {
        let att = Attachment::from_bytes("a.png", "image/png", b"hi");
        assert_eq!(att.data_url, "data:image/png;base64,aGk=");
        assert_eq!(att.byte_len, 2);
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(guess_image_mime(Path::new("x.JPG")), Some("image/jpeg"));
        assert_eq!(guess_image_mime(Path::new("x.webp")), Some("image/webp"));
        assert_eq!(guess_image_mime(Path::new("notes.txt")), None);
        assert_eq!(guess_image_mime(Path::new("noext")), None);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_resolve_input_path() {
        assert_eq!(resolve_input_path("   "), None);
        assert_eq!(resolve_input_path(" /tmp/a.png "), Some(PathBuf::from("/tmp/a.png")));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_input_path("~/a.png"), Some(home.join("a.png")));
        }
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

        let att = load(path).await.unwrap();
        assert_eq!(att.name, "pixel.png");
        assert_eq!(att.mime, "image/png");
        assert!(att.data_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_load_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(load(path).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path().join("gone.png")).await.is_err());
    }
}
