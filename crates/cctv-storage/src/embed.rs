//! HTML embed page pointing at a camera's newest video.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{StorageError, StorageResult};

const PLACEHOLDERS: [&str; 2] = ["{{video_path}}", "$RELPATH"];

/// A loaded embed page template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTemplate {
    contents: String,
}

impl EmbedTemplate {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
        }
    }

    /// Read a template from disk.
    pub async fn load(path: &Path) -> StorageResult<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::Template(format!("{}: {}", path.display(), e)))?;
        info!("Loaded embed template from {}", path.display());
        Ok(Self::new(contents))
    }

    /// Read a template, logging a warning and returning `None` if it is unreadable.
    pub async fn load_optional(path: &Path) -> Option<Self> {
        match Self::load(path).await {
            Ok(template) => Some(template),
            Err(e) => {
                warn!("Embed pages disabled: {}", e);
                None
            }
        }
    }

    /// Substitute the video path relative to the videos root.
    pub fn render(&self, relative_video_path: &str) -> String {
        PLACEHOLDERS
            .iter()
            .fold(self.contents.clone(), |html, placeholder| {
                html.replace(placeholder, relative_video_path)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_replaces_both_placeholders() {
        let template = EmbedTemplate::new(
            "<video src=\"{{video_path}}\"></video><a href=\"$RELPATH\">$RELPATH</a>",
        );
        assert_eq!(
            template.render("front_door/20240101_120000.mp4"),
            "<video src=\"front_door/20240101_120000.mp4\"></video>\
             <a href=\"front_door/20240101_120000.mp4\">front_door/20240101_120000.mp4</a>"
        );
    }

    #[test]
    fn test_render_without_placeholders() {
        let template = EmbedTemplate::new("<p>static</p>");
        assert_eq!(template.render("x/y.mp4"), "<p>static</p>");
    }

    #[tokio::test]
    async fn test_load_optional_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(EmbedTemplate::load_optional(&dir.path().join("iframe.html"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("iframe.html");
        tokio::fs::write(&path, "<iframe src=\"$RELPATH\">").await.unwrap();

        let template = EmbedTemplate::load(&path).await.unwrap();
        assert_eq!(template.render("a/b.mp4"), "<iframe src=\"a/b.mp4\">");
    }
}
