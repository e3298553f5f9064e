use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Archive subdirectory for files without an extension.
const NO_EXTENSION_DIR: &str = "NOEXT";

/// Where `file` ends up: `<archive_root>/<EXTENSION>/<file name>`.
pub fn destination_for(archive_root: &Path, file: &Path) -> Result<PathBuf> {
    let file_name = file
        .file_name()
        .context(format!("Path has no file name: {:?}", file))?;

    let bucket = file
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_uppercase())
        .unwrap_or_else(|| NO_EXTENSION_DIR.to_string());

    Ok(archive_root.join(bucket).join(file_name))
}

/// Move `file` to `destination`, creating the bucket directory as needed.
/// Falls back to copy-and-delete when a plain rename is not possible
/// (e.g. the archive lives on another filesystem).
pub async fn move_file(file: &Path, destination: &Path) -> Result<()> {
    if let Some(bucket) = destination.parent() {
        fs::create_dir_all(bucket)
            .await
            .context(format!("Failed to create archive directory: {:?}", bucket))?;
    }

    if let Err(e) = fs::rename(file, destination).await {
        debug!(file = %file.display(), error = %e, "Rename failed, copying instead");
        fs::copy(file, destination)
            .await
            .context(format!("Failed to copy {:?} to {:?}", file, destination))?;
        fs::remove_file(file)
            .await
            .context(format!("Failed to remove {:?} after copy", file))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_uses_uppercase_extension() {
        let root = Path::new("/srv/processed");
        assert_eq!(
            destination_for(root, Path::new("/srv/inbox/scan.pdf")).unwrap(),
            PathBuf::from("/srv/processed/PDF/scan.pdf")
        );
        assert_eq!(
            destination_for(root, Path::new("/srv/inbox/IMG_5230.jpeg")).unwrap(),
            PathBuf::from("/srv/processed/JPEG/IMG_5230.jpeg")
        );
        assert_eq!(
            destination_for(root, Path::new("/srv/inbox/README")).unwrap(),
            PathBuf::from("/srv/processed/NOEXT/README")
        );
    }

    #[tokio::test]
    async fn test_move_creates_bucket() {
        let inbox = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let file = inbox.path().join("note.txt");
        std::fs::write(&file, "hello").unwrap();

        let destination = destination_for(archive.path(), &file).unwrap();
        move_file(&file, &destination).await.unwrap();

        assert!(!file.exists());
        assert_eq!(std::fs::read_to_string(archive.path().join("TXT/note.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_move_missing_file_fails() {
        let archive = tempfile::tempdir().unwrap();
        let missing = archive.path().join("gone.txt");
        let destination = destination_for(archive.path(), &missing).unwrap();
        assert!(move_file(&missing, &destination).await.is_err());
    }
}
