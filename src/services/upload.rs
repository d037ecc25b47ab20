use crate::error::{AppError, AppResult};
use crate::utils::multipart::UploadedFile;
use axum::body::Bytes;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// URL prefix under which stored images are served.
pub const IMAGE_URL_PREFIX: &str = "/images";

pub const MAX_IMAGE_SIZE: usize = 3 * 1024 * 1024; // 3 MiB
pub const MAX_IMAGES_PER_REQUEST: usize = 10;

#[derive(Clone)]
pub struct UploadConfig {
    pub upload_dir: String,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
        }
    }

    fn path_of(&self, file_name: &str) -> PathBuf {
        Path::new(&self.upload_dir).join(file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else {
            None
        }
    }
}

/// An image that passed validation and has a storage name, but is not on disk yet.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub file_name: String,
    data: Bytes,
}

pub struct UploadService;

impl UploadService {
    /// Check type, size and content of a single upload and assign it a unique name.
    pub fn prepare(file: UploadedFile) -> AppResult<PendingImage> {
        if file.data.len() > MAX_IMAGE_SIZE {
            return Err(AppError::PayloadTooLarge(format!(
                "Image exceeds the {} MB limit",
                MAX_IMAGE_SIZE / (1024 * 1024)
            )));
        }

        let declared = ImageKind::from_content_type(&file.content_type).ok_or_else(|| {
            AppError::Validation(format!(
                "Unsupported file type: {}. Allowed: jpeg, png",
                file.content_type
            ))
        })?;

        if ImageKind::sniff(&file.data) != Some(declared) {
            return Err(AppError::Validation(
                "File content does not match declared content type".to_string(),
            ));
        }

        Ok(PendingImage {
            file_name: format!("{}.{}", Uuid::new_v4(), declared.extension()),
            data: file.data,
        })
    }

    pub fn prepare_all(files: Vec<UploadedFile>) -> AppResult<Vec<PendingImage>> {
        if files.len() > MAX_IMAGES_PER_REQUEST {
            return Err(AppError::Validation(format!(
                "At most {} images can be uploaded at once",
                MAX_IMAGES_PER_REQUEST
            )));
        }
        files.into_iter().map(Self::prepare).collect()
    }

    /// Write every pending image. On failure the files already written are removed.
    pub async fn store_all(config: &UploadConfig, images: &[PendingImage]) -> AppResult<()> {
        fs::create_dir_all(&config.upload_dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload directory: {}", e))?;

        for (index, image) in images.iter().enumerate() {
            if let Err(e) = fs::write(config.path_of(&image.file_name), &image.data).await {
                let written: Vec<String> = images[..index]
                    .iter()
                    .map(|i| i.file_name.clone())
                    .collect();
                Self::remove_all(config, &written).await;
                return Err(anyhow::anyhow!("Failed to write image {}: {}", image.file_name, e).into());
            }
        }
        Ok(())
    }

    /// Best-effort removal; missing files are ignored and other failures only logged.
    pub async fn remove_all(config: &UploadConfig, file_names: &[String]) {
        for name in file_names {
            // Stored names are generated here, anything with a separator is not ours.
            if name.contains('/') || name.contains('\\') || name.contains("..") {
                tracing::warn!("Refusing to remove suspicious image name '{}'", name);
                continue;
            }
            match fs::remove_file(config.path_of(name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove image '{}': {}", name, e),
            }
        }
    }
}

pub fn file_names(images: &[PendingImage]) -> Vec<String> {
    images.iter().map(|i| i.file_name.clone()).collect()
}

/// Public URL of a stored image.
pub fn image_url(file_name: &str) -> String {
    format!("{IMAGE_URL_PREFIX}/{file_name}")
}

/// Accept either a bare stored name or its public URL.
pub fn stored_name(reference: &str) -> &str {
    reference
        .trim()
        .strip_prefix(IMAGE_URL_PREFIX)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or_else(|| reference.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    fn upload(content_type: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            field: "images".to_string(),
            content_type: content_type.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn urls_map_back_to_stored_names() {
        let url = image_url("abc.png");
        assert_eq!(url, "/images/abc.png");
        assert_eq!(stored_name(&url), "abc.png");
        assert_eq!(stored_name(" abc.png "), "abc.png");
    }

    #[test]
    fn accepts_png_and_jpeg() {
        let png = UploadService::prepare(upload("image/png", PNG)).unwrap();
        assert!(png.file_name.ends_with(".png"));
        let jpeg = UploadService::prepare(upload("image/jpg", JPEG)).unwrap();
        assert!(jpeg.file_name.ends_with(".jpg"));
    }

    #[test]
    fn rejects_mismatched_content() {
        let err = UploadService::prepare(upload("image/jpeg", PNG)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_other_types() {
        let err = UploadService::prepare(upload("image/gif", b"GIF89a")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_oversized_images() {
        let mut data = PNG.to_vec();
        data.resize(MAX_IMAGE_SIZE + 1, 0);
        let err = UploadService::prepare(upload("image/png", &data)).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[test]
    fn caps_images_per_request() {
        let files = (0..=MAX_IMAGES_PER_REQUEST)
            .map(|_| upload("image/png", PNG))
            .collect();
        assert!(UploadService::prepare_all(files).is_err());
    }

    #[tokio::test]
    async fn store_then_remove_round_trip() {
        let dir = std::env::temp_dir().join(format!("qna-upload-{}", Uuid::new_v4()));
        let config = UploadConfig {
            upload_dir: dir.to_string_lossy().to_string(),
        };
        let images = UploadService::prepare_all(vec![upload("image/png", PNG)]).unwrap();
        UploadService::store_all(&config, &images).await.unwrap();
        let path = config.path_of(&images[0].file_name);
        assert!(path.exists());

        UploadService::remove_all(&config, &file_names(&images)).await;
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
