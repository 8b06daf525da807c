//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::application::repos::{ImageStore, ImageStoreError, StoredImage};

/// Directory under the media root that receives post images.
pub const POST_IMAGE_DIR: &str = "posts";

/// Filesystem-backed upload storage rooted at the media directory.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, ImageStoreError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ImageStoreError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

/// Images land under [`POST_IMAGE_DIR`].
#[async_trait]
impl ImageStore for UploadStorage {
    async fn store_post_image(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredImage, ImageStoreError> {
        if data.is_empty() {
            return Err(ImageStoreError::EmptyPayload);
        }

        let stored_path = build_stored_path(POST_IMAGE_DIR, original_name);
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        Ok(StoredImage {
            stored_path,
            checksum: hex::encode(&Sha256::digest(&data)[..]),
            size_bytes: data.len() as u64,
        })
    }

    async fn delete_image(&self, stored_path: &str) -> Result<(), ImageStoreError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ImageStoreError::Io(err)),
        }
    }
}

fn build_stored_path(directory: &str, original_name: &str) -> String {
    let identifier = Uuid::new_v4().simple();
    let filename = sanitize_filename(original_name);
    format!("{directory}/{identifier}-{filename}")
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
