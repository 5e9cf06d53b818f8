use super::FolderSync;
use super::error::{ErrorKind, Result};
use async_trait::async_trait;
use bannr_storage::StorageBackend;
use exn::ResultExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

const EXECUTABLE: &str = "gdown";
const FOLDER_URL_PREFIX: &str = "https://drive.google.com/drive/folders/";

/// Google Drive folder sync through the `gdown` command-line tool.
pub struct GdownSync {
    executable: PathBuf,
}

impl GdownSync {
    /// Find `gdown` on `PATH`.
    pub fn discover() -> Result<Self> {
        match which::which(EXECUTABLE) {
            Ok(executable) => {
                tracing::trace!(gdown = %executable.display(), "discovered gdown");
                Ok(Self { executable })
            },
            Err(_) => {
                tracing::info!("gdown executable not found in PATH");
                exn::bail!(ErrorKind::ExecutableNotFound(EXECUTABLE.to_string()))
            },
        }
    }

    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Expand a bare folder ID into a Drive folder URL; full Drive URLs are
    /// passed through untouched.
    pub fn folder_url(remote: &str) -> String {
        let remote = remote.trim();
        if remote.contains("drive.google.com") {
            remote.to_string()
        } else {
            format!("{FOLDER_URL_PREFIX}{remote}")
        }
    }
}

#[async_trait]
impl FolderSync for GdownSync {
    #[tracing::instrument(skip_all, fields(destination = destination.name()))]
    async fn sync_folder(&self, remote: &str, destination: &dyn StorageBackend) -> Result<()> {
        if remote.trim().is_empty() {
            exn::bail!(ErrorKind::MissingFolderId);
        }
        let Some(directory) = destination.local_root() else {
            exn::bail!(ErrorKind::UnsupportedDestination(destination.name().to_string()));
        };
        let url = Self::folder_url(remote);
        tracing::info!(%url, directory = %directory.display(), "starting folder sync (this might take a while)");

        let output = Command::new(&self.executable)
            .arg("--folder")
            .arg(&url)
            .arg("-O")
            .arg(directory)
            .arg("--remaining-ok")
            .stdin(Stdio::null())
            .output()
            .await
            .or_raise(|| ErrorKind::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(code = ?output.status.code(), stderr = %stderr.trim(), "folder sync failed");
            exn::bail!(ErrorKind::Failed(output.status.code()));
        }
        tracing::info!("folder sync finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1AbCdEf", "https://drive.google.com/drive/folders/1AbCdEf")]
    #[case("  1AbCdEf \n", "https://drive.google.com/drive/folders/1AbCdEf")]
    #[case(
        "https://drive.google.com/drive/folders/1AbCdEf?usp=sharing",
        "https://drive.google.com/drive/folders/1AbCdEf?usp=sharing"
    )]
    fn test_folder_url(#[case] remote: &str, #[case] expected: &str) {
        assert_eq!(GdownSync::folder_url(remote), expected);
    }

    #[tokio::test]
    async fn test_requires_folder_id() {
        let sync = GdownSync::with_executable("/nonexistent/gdown");
        let destination = bannr_storage::backend::MockBackend::default();
        let err = sync.sync_folder("   ", &destination).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFolderId));
    }

    #[tokio::test]
    async fn test_requires_local_destination() {
        let sync = GdownSync::with_executable("/nonexistent/gdown");
        let destination = bannr_storage::backend::MockBackend::default().with_name("memory");
        let err = sync.sync_folder("1AbCdEf", &destination).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedDestination(name) if name == "memory"));
    }

    #[tokio::test]
    async fn test_missing_executable_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let destination = bannr_storage::backend::LocalBackend::new("import", dir.path()).unwrap();
        let sync = GdownSync::with_executable(dir.path().join("no-such-gdown"));
        let err = sync.sync_folder("1AbCdEf", &destination).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Spawn));
    }
}
