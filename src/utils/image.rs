use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const IMAGE_DIR: &str = "recipes";

/// Stores decoded recipe images on the local filesystem under `root`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Decodes a base64 data URI and writes it out, returning the stored reference.
    pub async fn save_data_uri(&self, data: &str) -> AppResult<String> {
        let (bytes, extension) = decode_data_uri(data)?;

        let dir = self.root.join(IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let mut name = Uuid::new_v4().simple().to_string();
        name.truncate(12);
        let file_name = format!("{name}.{extension}");

        tokio::fs::write(dir.join(&file_name), bytes).await?;
        tracing::debug!(file = %file_name, "stored recipe image");

        Ok(format!("{IMAGE_DIR}/{file_name}"))
    }

    /// Best effort; a missing file is not an error.
    pub async fn remove(&self, reference: &str) {
        if let Err(err) = tokio::fs::remove_file(self.root.join(reference)).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(reference, error = %err, "failed to remove recipe image");
            }
        }
    }
}

/// Accepts `data:image/png;base64,<payload>` or a bare base64 payload.
pub fn decode_data_uri(data: &str) -> AppResult<(Vec<u8>, &'static str)> {
    let payload = match data.split_once(";base64,") {
        Some((header, payload)) if header.starts_with("data:") => payload,
        _ => data,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| AppError::validation("image is not valid base64"))?;

    let extension = image::guess_format(&bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .ok_or_else(|| AppError::validation("unsupported image format"))?;

    Ok((bytes, extension))
}
