use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// `<cache_dir>/vision-chat/vision-chat.log`, falling back to the working directory.
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("vision-chat"))
        .unwrap_or_else(|| PathBuf::from(".vision-chat"))
        .join("vision-chat.log")
}

/// Send tracing output to a file. The TUI owns the terminal, so if the file
/// cannot be opened, logging is switched off rather than written to stderr.
pub fn init(log_path: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match open_log_file(log_path) {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(_) => {
            tracing_subscriber::registry().with(env_filter).init();
        }
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_default_log_path_file_name() {
        assert_eq!(default_log_path().file_name().unwrap(), "vision-chat.log");
    }
}
