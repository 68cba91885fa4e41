use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Uploaded images on local disk, addressed by bare filename.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Stores an upload under a fresh `{millis}-{uuid}.{ext}` name and
    /// returns that name. The extension comes from the client filename.
    pub async fn save_upload(&self, original_name: Option<&str>, data: &[u8]) -> io::Result<String> {
        let ext = original_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin");
        let fname = format!("{}-{}.{}", chrono::Utc::now().timestamp_millis(), Uuid::new_v4(), ext.to_ascii_lowercase());
        self.put(&fname, data).await?;
        Ok(fname)
    }

    /// Writes `filename`, replacing whatever was stored under that name.
    pub async fn put(&self, filename: &str, data: &[u8]) -> io::Result<()> {
        let path = self.path_for(filename)?;
        self.ensure_dir().await?;
        tokio::fs::write(path, data).await
    }

    pub async fn exists(&self, filename: &str) -> io::Result<bool> {
        tokio::fs::try_exists(self.path_for(filename)?).await
    }

    pub async fn remove(&self, filename: &str) -> io::Result<()> {
        tokio::fs::remove_file(self.path_for(filename)?).await
    }

    fn path_for(&self, filename: &str) -> io::Result<PathBuf> {
        if !is_plain_filename(filename) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("not a plain filename: {filename:?}")));
        }
        Ok(self.dir.join(filename))
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Final path segment of an image URL (query and fragment dropped), or
/// `None` when there is no usable filename.
pub fn filename_from_url(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let path = without_fragment.split('?').next().unwrap_or(without_fragment);
    let name = path.rsplit(['/', '\\']).next()?;
    is_plain_filename(name).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_segment() {
        assert_eq!(filename_from_url("http://localhost:3000/uploads/123-abc.png").as_deref(), Some("123-abc.png"));
        assert_eq!(filename_from_url("http://h/uploads/a.jpg?v=2#top").as_deref(), Some("a.jpg"));
        assert_eq!(filename_from_url("a.jpg").as_deref(), Some("a.jpg"));
        assert_eq!(filename_from_url("http://h/uploads/"), None);
        assert_eq!(filename_from_url("http://h/uploads/.."), None);
    }

    #[tokio::test]
    async fn save_exists_remove() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = FileStore::new(tmp.path().join("uploads"));

        let name = store.save_upload(Some("Holiday.JPG"), b"jpeg bytes").await?;
        assert!(name.ends_with(".jpg"));
        assert!(store.exists(&name).await?);
        assert_eq!(tokio::fs::read(store.dir().join(&name)).await?, b"jpeg bytes");

        store.remove(&name).await?;
        assert!(!store.exists(&name).await?);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_bin() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = FileStore::new(tmp.path());
        let name = store.save_upload(None, b"x").await?;
        assert!(name.ends_with(".bin"));
        Ok(())
    }

    #[tokio::test]
    async fn put_overwrites_same_name() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = FileStore::new(tmp.path());
        store.put("same.png", b"first").await?;
        store.put("same.png", b"second").await?;
        assert_eq!(tokio::fs::read(tmp.path().join("same.png")).await?, b"second");
        Ok(())
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let store = FileStore::new("uploads");
        assert!(store.remove("../Cargo.toml").await.is_err());
        assert!(store.exists("..").await.is_err());
    }
}
