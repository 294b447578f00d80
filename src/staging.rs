use std::{
    io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::{fs, sync::Mutex};

use crate::error::StageError;

pub const AZ_CLI_UPGRADE_COMMAND: &str = "apt-get install --only-upgrade -y azure-cli";
pub const AZ_CLI_SCRIPT_NAME: &str = "upgrade_az_cli.sh";

/// rwxr-xr-x
pub const SCRIPT_MODE: u32 = 0o755;

/// A shell script the external upgrade agent will pick up from the package
/// directory and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeScript {
    pub file_name: &'static str,
    pub body: &'static str,
    pub mode: u32,
}

impl UpgradeScript {
    pub const fn az_cli() -> Self {
        UpgradeScript {
            file_name: AZ_CLI_SCRIPT_NAME,
            body: AZ_CLI_UPGRADE_COMMAND,
            mode: SCRIPT_MODE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StagedScript {
    pub path: PathBuf,
    pub staged_at: DateTime<Utc>,
}

/// Writes upgrade scripts to a staging path and hands them over to the
/// package directory.
///
/// The staging path is shared by every call, so the write, chmod and move
/// run under one lock.
#[derive(Debug, Clone)]
pub struct ScriptStager {
    staging_path: PathBuf,
    package_dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl ScriptStager {
    pub fn new(staging_path: impl Into<PathBuf>, package_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_path: staging_path.into(),
            package_dir: package_dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    pub fn destination(&self, script: &UpgradeScript) -> PathBuf {
        self.package_dir.join(script.file_name)
    }

    /// The package directory is never created here. When it is missing the
    /// move fails and the staged file stays where it was written.
    pub async fn stage(&self, script: &UpgradeScript) -> Result<StagedScript, StageError> {
        let _guard = self.lock.lock().await;

        let staging = self.staging_path.as_path();
        let destination = self.destination(script);

        tracing::debug!(path = %staging.display(), "writing upgrade script");
        fs::write(staging, script.body)
            .await
            .map_err(|source| StageError::Write {
                path: staging.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %staging.display(), mode = %format!("{:o}", script.mode), "setting script permissions");
        fs::set_permissions(staging, std::fs::Permissions::from_mode(script.mode))
            .await
            .map_err(|source| StageError::Permissions {
                path: staging.to_path_buf(),
                mode: script.mode,
                source,
            })?;

        tracing::debug!(from = %staging.display(), to = %destination.display(), "moving upgrade script");
        move_file(staging, &destination)
            .await
            .map_err(|source| StageError::Move {
                from: staging.to_path_buf(),
                to: destination.clone(),
                source,
            })?;

        tracing::info!(path = %destination.display(), "upgrade script staged");
        Ok(StagedScript {
            path: destination,
            staged_at: Utc::now(),
        })
    }
}

async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => copy_across(from, to).await,
        Err(err) => Err(err),
    }
}

/// rename(2) cannot cross filesystems. The copy lands on a hidden partial
/// name next to `to` first, so a watcher on the package dir only ever sees
/// the complete script.
async fn copy_across(from: &Path, to: &Path) -> io::Result<()> {
    let partial = partial_path(to);
    if let Err(err) = fs::copy(from, &partial).await {
        let _ = fs::remove_file(&partial).await;
        return Err(err);
    }
    if let Err(err) = fs::rename(&partial, to).await {
        let _ = fs::remove_file(&partial).await;
        return Err(err);
    }
    fs::remove_file(from).await
}

fn partial_path(to: &Path) -> PathBuf {
    let name = to
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    to.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("az-cli-sidecar-staging-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn stager_in(dir: &Path) -> ScriptStager {
        ScriptStager::new(dir.join("upgrade_az_cli.sh"), dir.join("pkgs"))
    }

    #[tokio::test]
    async fn stage_moves_executable_script_into_package_dir() {
        let dir = scratch_dir();
        let stager = stager_in(&dir);
        std::fs::create_dir(stager.package_dir()).unwrap();

        let staged = stager.stage(&UpgradeScript::az_cli()).await.unwrap();

        assert_eq!(staged.path, dir.join("pkgs").join("upgrade_az_cli.sh"));
        assert_eq!(
            std::fs::read_to_string(&staged.path).unwrap(),
            "apt-get install --only-upgrade -y azure-cli"
        );
        let mode = std::fs::metadata(&staged.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(!stager.staging_path().exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn stage_without_package_dir_leaves_staged_file() {
        let dir = scratch_dir();
        let stager = stager_in(&dir);

        let err = stager.stage(&UpgradeScript::az_cli()).await.unwrap_err();

        assert!(matches!(err, StageError::Move { .. }));
        assert_eq!(
            std::fs::read_to_string(stager.staging_path()).unwrap(),
            AZ_CLI_UPGRADE_COMMAND
        );

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn stage_replaces_previous_script() {
        let dir = scratch_dir();
        let stager = stager_in(&dir);
        std::fs::create_dir(stager.package_dir()).unwrap();
        let destination = stager.destination(&UpgradeScript::az_cli());
        std::fs::write(&destination, "echo stale").unwrap();

        stager.stage(&UpgradeScript::az_cli()).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&destination).unwrap(),
            AZ_CLI_UPGRADE_COMMAND
        );

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn stage_fails_on_write_when_staging_parent_is_missing() {
        let dir = scratch_dir();
        let stager = ScriptStager::new(dir.join("missing").join("upgrade_az_cli.sh"), dir.join("pkgs"));

        let err = stager.stage(&UpgradeScript::az_cli()).await.unwrap_err();

        assert!(matches!(err, StageError::Write { .. }));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_stages_do_not_race() {
        let dir = scratch_dir();
        let stager = stager_in(&dir);
        std::fs::create_dir(stager.package_dir()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stager = stager.clone();
                tokio::spawn(async move { stager.stage(&UpgradeScript::az_cli()).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(
            std::fs::read_to_string(stager.destination(&UpgradeScript::az_cli())).unwrap(),
            AZ_CLI_UPGRADE_COMMAND
        );

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn copy_across_publishes_complete_script_and_drops_source() {
        let dir = scratch_dir();
        let from = dir.join("upgrade_az_cli.sh");
        let to = dir.join("pkgs").join("upgrade_az_cli.sh");
        std::fs::create_dir(dir.join("pkgs")).unwrap();
        std::fs::write(&from, AZ_CLI_UPGRADE_COMMAND).unwrap();
        std::fs::set_permissions(&from, std::fs::Permissions::from_mode(SCRIPT_MODE)).unwrap();

        copy_across(&from, &to).await.unwrap();

        assert_eq!(std::fs::read_to_string(&to).unwrap(), AZ_CLI_UPGRADE_COMMAND);
        assert_eq!(std::fs::metadata(&to).unwrap().permissions().mode() & 0o777, 0o755);
        assert!(!from.exists());
        assert!(!partial_path(&to).exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn copy_across_failure_keeps_source_and_leaves_no_partial() {
        let dir = scratch_dir();
        let from = dir.join("upgrade_az_cli.sh");
        let to = dir.join("pkgs").join("upgrade_az_cli.sh");
        std::fs::write(&from, AZ_CLI_UPGRADE_COMMAND).unwrap();

        assert!(copy_across(&from, &to).await.is_err());

        assert!(from.exists());
        assert!(!partial_path(&to).exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn stage_across_filesystems_copies_with_mode() {
        use std::os::unix::fs::MetadataExt;

        let shm = Path::new("/dev/shm");
        if !shm.is_dir() {
            return;
        }
        let dir = scratch_dir();
        let package_dir = shm.join(format!("az-cli-sidecar-pkgs-{}", Uuid::new_v4()));
        if std::fs::create_dir(&package_dir).is_err() {
            std::fs::remove_dir_all(dir).unwrap();
            return;
        }
        if std::fs::metadata(&dir).unwrap().dev() == std::fs::metadata(&package_dir).unwrap().dev() {
            std::fs::remove_dir_all(dir).unwrap();
            std::fs::remove_dir_all(package_dir).unwrap();
            return;
        }
        let stager = ScriptStager::new(dir.join("upgrade_az_cli.sh"), package_dir.clone());

        let staged = stager.stage(&UpgradeScript::az_cli()).await.unwrap();

        assert_eq!(staged.path, package_dir.join("upgrade_az_cli.sh"));
        assert_eq!(std::fs::read_to_string(&staged.path).unwrap(), AZ_CLI_UPGRADE_COMMAND);
        assert_eq!(std::fs::metadata(&staged.path).unwrap().permissions().mode() & 0o777, 0o755);
        assert!(!stager.staging_path().exists());
        assert!(!partial_path(&staged.path).exists());

        std::fs::remove_dir_all(dir).unwrap();
        std::fs::remove_dir_all(package_dir).unwrap();
    }
}
