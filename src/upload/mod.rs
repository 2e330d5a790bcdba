//! Image upload storage.
//!
//! Files land in `<root>/images/<namespace>/<YYYYMM>/<DD>/` and are served
//! back under `<public_base>/images/...`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use rand::{distr::Alphanumeric, Rng};

use crate::errors::AppError;

/// Extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Size ceiling in KiB.
    pub max_kb: u64,
    /// Wider images are scaled down to this width.
    pub max_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    /// Public URL of the stored file.
    pub path: String,
}

/// Writes uploaded images to local disk.
#[derive(Debug, Clone)]
pub struct ImageUploader {
    root: PathBuf,
    public_base: String,
}

impl ImageUploader {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Validate and store `file`.
    ///
    /// `Ok(None)` means the file was rejected (extension, size or content);
    /// `Err` is reserved for failures writing to disk.
    pub async fn save(
        &self,
        file: UploadedFile,
        namespace: &str,
        owner_id: i64,
        limits: UploadLimits,
    ) -> Result<Option<StoredImage>, AppError> {
        let Some(extension) = extension_of(&file.file_name) else {
            tracing::debug!("Rejected upload {:?}: extension", file.file_name);
            return Ok(None);
        };

        if file.bytes.len() as u64 > limits.max_kb * 1024 {
            tracing::debug!(
                "Rejected upload {:?}: {} bytes exceeds {} KiB",
                file.file_name,
                file.bytes.len(),
                limits.max_kb
            );
            return Ok(None);
        }

        let now = Utc::now();
        let folder = format!("images/{}/{}", namespace, now.format("%Y%m/%d"));
        let file_name = format!(
            "{}_{}_{}.{}",
            owner_id,
            now.timestamp(),
            random_token(10),
            extension
        );

        let bytes = file.bytes;
        let max_width = limits.max_width;
        let encoded = tokio::task::spawn_blocking(move || prepare(bytes, &extension, max_width))
            .await
            .map_err(|e| AppError::Internal(format!("Image worker failed: {}", e)))?;

        let Some(encoded) = encoded else {
            tracing::debug!("Rejected upload: content is not a supported image");
            return Ok(None);
        };

        let dir = self.root.join(&folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), &encoded).await?;

        let path = format!("{}/{}/{}", self.public_base, folder, file_name);
        tracing::info!("Stored upload for user {} at {}", owner_id, path);

        Ok(Some(StoredImage { path }))
    }
}

/// Lowercased, allowed extension; a name without one counts as png.
fn extension_of(file_name: &str) -> Option<String> {
    let extension = match Path::new(file_name).extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => "png".to_string(),
    };
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Checks the content is an allowed image and scales it to `max_width`.
/// GIFs are stored as sent to keep their animation.
fn prepare(bytes: Vec<u8>, extension: &str, max_width: u32) -> Option<Vec<u8>> {
    let format = image::guess_format(&bytes).ok()?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif
    ) {
        return None;
    }

    if format == ImageFormat::Gif {
        return Some(bytes);
    }

    let decoded = image::load_from_memory_with_format(&bytes, format).ok()?;
    if decoded.width() <= max_width {
        return Some(bytes);
    }

    let resized = decoded.resize(max_width, u32::MAX, FilterType::Triangle);
    let (resized, target) = match extension {
        "jpg" | "jpeg" => (DynamicImage::ImageRgb8(resized.to_rgb8()), ImageFormat::Jpeg),
        _ => (resized, format),
    };

    let mut out = std::io::Cursor::new(Vec::new());
    resized.write_to(&mut out, target).ok()?;
    Some(out.into_inner())
}

fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
