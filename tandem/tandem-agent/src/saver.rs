//! Writing accepted code to disk.

use std::path::{Path, PathBuf};
use tandem_core::{Result, TandemError};
use tracing::info;
use uuid::Uuid;

/// Largest code payload accepted by `save_code`, in characters.
pub const MAX_CODE_CHARS: usize = 100_000;
pub const MAX_FILENAME_CHARS: usize = 255;
pub const DEFAULT_FILENAME: &str = "generated_code.txt";

const ALLOWED_EXTENSIONS: [&str; 9] = ["html", "css", "js", "py", "txt", "rs", "ts", "json", "md"];
const FORBIDDEN_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip unsafe characters, cap the length and force an allowed extension.
pub fn sanitize_filename(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control() && !FORBIDDEN_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    let mut name: String = if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned.chars().take(MAX_FILENAME_CHARS).collect()
    };

    let allowed = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    if !allowed {
        name = name.chars().take(MAX_FILENAME_CHARS - 4).collect();
        name.push_str(".txt");
    }

    name
}

/// Writes code files under one directory with a random prefix.
#[derive(Debug, Clone)]
pub struct CodeSaver {
    dir: PathBuf,
}

impl CodeSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Validate and write `code`, returning the path written.
    pub async fn save(&self, code: &str, filename: Option<&str>) -> Result<PathBuf> {
        if code.trim().is_empty() {
            return Err(TandemError::invalid_input("no code to save"));
        }

        let len = code.chars().count();
        if len > MAX_CODE_CHARS {
            return Err(TandemError::too_large(format!(
                "code is {} characters long, the limit is {}",
                len, MAX_CODE_CHARS
            )));
        }

        let name = sanitize_filename(filename);
        let prefix: String = Uuid::new_v4().simple().to_string().chars().take(16).collect();
        let path = self.dir.join(format!("{}_{}", prefix, name));

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            TandemError::storage(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;
        tokio::fs::write(&path, code)
            .await
            .map_err(|e| TandemError::storage(format!("Failed to write {}: {}", path.display(), e)))?;

        info!("Saved {} chars of code to {}", len, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename(Some("hello.py")), "hello.py");
        assert_eq!(sanitize_filename(Some("../../etc/passwd")), "etcpasswd.txt");
        assert_eq!(sanitize_filename(Some("a<b>:c?.js")), "abc.js");
        assert_eq!(sanitize_filename(Some("run.exe")), "run.exe.txt");
        assert_eq!(sanitize_filename(Some("PAGE.HTML")), "PAGE.HTML");
        assert_eq!(sanitize_filename(None), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename(Some("  ")), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename(Some("noext")), "noext.txt");
    }

    #[test]
    fn test_filename_is_capped() {
        let long = format!("{}.py", "x".repeat(400));
        let name = sanitize_filename(Some(&long));
        assert_eq!(name.chars().count(), MAX_FILENAME_CHARS);
        assert!(name.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_save_writes_prefixed_file() {
        let dir = TempDir::new().unwrap();
        let saver = CodeSaver::new(dir.path().join("generated"));

        let path = saver.save("print(1)", Some("hello.py")).await.unwrap();
        assert!(path.starts_with(dir.path().join("generated")));

        let file_name = path.file_name().unwrap().to_str().unwrap();
        let (prefix, rest) = file_name.split_once('_').unwrap();
        assert_eq!(prefix.len(), 16);
        assert!(prefix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "hello.py");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print(1)");
    }

    #[tokio::test]
    async fn test_save_rejects_bad_payloads() {
        let dir = TempDir::new().unwrap();
        let saver = CodeSaver::new(dir.path());

        let err = saver.save("   ", None).await.unwrap_err();
        assert!(err.is_invalid_input());

        let err = saver.save(&"x".repeat(MAX_CODE_CHARS + 1), None).await.unwrap_err();
        assert_eq!(err.kind(), "payload_too_large");
    }
}
