use std::path::{Path, PathBuf};

use async_trait::async_trait;
use seva_application::{FilePicker, PickKind, PickOutcome};
use seva_core::{AppError, AppResult};
use seva_domain::FileRef;
use url::Url;

/// File picker answering with a file chosen up front, e.g. on the command line.
///
/// A picker without a path behaves like a dismissed dialog.
#[derive(Debug, Clone, Default)]
pub struct LocalFilePicker {
    path: Option<PathBuf>,
}

impl LocalFilePicker {
    /// Creates a picker that always returns `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Creates a picker that is always cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FilePicker for LocalFilePicker {
    async fn pick(&self, kind: PickKind) -> AppResult<PickOutcome> {
        let Some(path) = &self.path else {
            return Ok(PickOutcome::Cancelled);
        };

        let path = tokio::fs::canonicalize(path).await.map_err(|error| {
            AppError::NotFound(format!("cannot pick '{}': {error}", path.display()))
        })?;
        let mime_type = mime_type_for(&path);
        if kind == PickKind::Image && !mime_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "'{}' is not an image",
                path.display()
            )));
        }

        let uri = Url::from_file_path(&path).map_err(|()| {
            AppError::Validation(format!("'{}' has no file URI", path.display()))
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(PickOutcome::Picked(FileRef::new(uri.as_str(), name, mime_type)))
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
