use anyhow::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

/// Image served when a story is saved without one.
pub const PLACEHOLDER_IMAGE: &str = "travel.png";

/// Manages uploaded story images on local disk.
///
/// Every image is a flat file at `{dir}/{filename}` and is published at
/// `{public_url}/uploads/{filename}`.
pub struct ImageStore {
    dir: PathBuf,
    public_url: String,
}

impl ImageStore {
    pub async fn new(dir: PathBuf, public_url: &str) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image upload directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.public_url, filename)
    }

    pub fn placeholder_url(&self) -> String {
        format!("{}/assets/{}", self.public_url, PLACEHOLDER_IMAGE)
    }

    /// Writes `data` under a fresh `<millis>-<uuid>[.ext]` name and returns
    /// that name.
    pub async fn save(&self, original_name: Option<&str>, data: &[u8]) -> Result<String> {
        let mut filename = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        if let Some(ext) = original_name.and_then(extension_of) {
            filename.push('.');
            filename.push_str(&ext);
        }

        let path = self.dir.join(&filename);
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        info!("Stored image {} ({} bytes)", filename, data.len());
        Ok(filename)
    }

    /// Maps an image URL (or bare filename) to its path in the upload
    /// directory. Only the last path segment is used, so the result never
    /// points outside the directory.
    pub fn resolve(&self, image_url: &str) -> Option<PathBuf> {
        file_name_of(image_url).map(|name| self.dir.join(name))
    }

    /// Removes the image behind `image_url`. Returns `false` if there was no
    /// such file.
    pub async fn delete(&self, image_url: &str) -> Result<bool> {
        let Some(path) = self.resolve(image_url) else {
            return Ok(false);
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted image {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_placeholder(&self, image_url: &str) -> bool {
        file_name_of(image_url) == Some(PLACEHOLDER_IMAGE)
    }
}

/// Last path segment of a URL or path, ignoring any query or fragment.
fn file_name_of(image_url: &str) -> Option<&str> {
    let path = image_url.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit(['/', '\\']).next().unwrap_or_default();

    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Lowercased extension if it looks like a real one.
fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_takes_last_segment() {
        assert_eq!(file_name_of("http://localhost:8000/uploads/a.png"), Some("a.png"));
        assert_eq!(file_name_of("http://h/uploads/a.png?x=1#frag"), Some("a.png"));
        assert_eq!(file_name_of("a.png"), Some("a.png"));
        assert_eq!(file_name_of("../../etc/passwd"), Some("passwd"));
        assert_eq!(file_name_of("..\\..\\secret.txt"), Some("secret.txt"));
        assert_eq!(file_name_of("http://h/uploads/"), None);
        assert_eq!(file_name_of("http://h/uploads/.."), None);
        assert_eq!(file_name_of(""), None);
    }

    #[test]
    fn extension_is_sanitised() {
        assert_eq!(extension_of("Beach.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("bad.p/ng"), None);
        assert_eq!(extension_of("long.abcdefghij"), None);
    }

    #[tokio::test]
    async fn save_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("uploads"), "http://localhost:8000/")
            .await
            .unwrap();

        let name = store.save(Some("photo.PNG"), b"png-bytes").await.unwrap();
        assert!(name.ends_with(".png"));

        let url = store.url_for(&name);
        assert_eq!(url, format!("http://localhost:8000/uploads/{name}"));

        let path = store.resolve(&url).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");

        assert!(store.delete(&url).await.unwrap());
        assert!(!path.exists());
        assert!(!store.delete(&url).await.unwrap());
    }

    #[tokio::test]
    async fn traversal_stays_inside_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"keep").unwrap();

        let store = ImageStore::new(dir.path().join("uploads"), "http://localhost:8000")
            .await
            .unwrap();

        assert!(!store.delete("../keep.txt").await.unwrap());
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn placeholder_detection() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), "http://localhost:8000")
            .await
            .unwrap();

        assert_eq!(store.placeholder_url(), "http://localhost:8000/assets/travel.png");
        assert!(store.is_placeholder(&store.placeholder_url()));
        assert!(!store.is_placeholder("http://localhost:8000/uploads/1-abc.png"));
    }
}
