//! Installation checks: required directories and files exist and carry
//! sane access rights. Failures map to exit code 2.

use std::path::{Path, PathBuf};

use metronome_core::MetronomeError;
use tracing::info;

/// Mode bits granting any access to group or others.
#[cfg(unix)]
const GROUP_OTHER_ACCESS: u32 = 0o077;

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessRequirements {
    pub directory: bool,
    pub executable: bool,
    pub writable: bool,
    /// No group or other access at all.
    pub private: bool,
}

impl AccessRequirements {
    /// Log directory: private, owner may list and write.
    pub const LOG_DIR: Self = Self {
        directory: true,
        executable: true,
        writable: true,
        private: true,
    };

    /// Config files may hold secrets.
    pub const CONFIG_FILE: Self = Self {
        directory: false,
        executable: false,
        writable: false,
        private: true,
    };
}

pub fn check_installation(
    log_dir: Option<&Path>,
    config_files: &[PathBuf],
) -> Result<(), MetronomeError> {
    if let Some(dir) = log_dir {
        check_path(dir, AccessRequirements::LOG_DIR)?;
    }
    for file in config_files {
        check_path(file, AccessRequirements::CONFIG_FILE)?;
    }
    Ok(())
}

pub fn check_path(path: &Path, req: AccessRequirements) -> Result<(), MetronomeError> {
    let fail = |what: &str| {
        MetronomeError::InstallationError(format!("{} '{}' {what}", kind(req), path.display()))
    };

    let meta = std::fs::metadata(path).map_err(|_| fail("not found!"))?;
    if req.directory != meta.is_dir() {
        return Err(fail("not found!"));
    }
    check_mode(&meta, req, &fail)?;

    info!(path = %path.display(), "Access rights OK");
    Ok(())
}

#[cfg(unix)]
fn check_mode(
    meta: &std::fs::Metadata,
    req: AccessRequirements,
    fail: &dyn Fn(&str) -> MetronomeError,
) -> Result<(), MetronomeError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    if mode & 0o400 == 0 {
        return Err(fail("must be readable by owner!"));
    }
    if req.executable && mode & 0o100 == 0 {
        return Err(fail("must be executable by owner!"));
    }
    if req.writable && mode & 0o200 == 0 {
        return Err(fail("must be writable by owner!"));
    }
    if req.private && mode & GROUP_OTHER_ACCESS != 0 {
        return Err(fail("must not be accessible by group or others!"));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_mode(
    meta: &std::fs::Metadata,
    req: AccessRequirements,
    fail: &dyn Fn(&str) -> MetronomeError,
) -> Result<(), MetronomeError> {
    if req.writable && meta.permissions().readonly() {
        return Err(fail("must be writable by owner!"));
    }
    Ok(())
}

fn kind(req: AccessRequirements) -> &'static str {
    if req.directory {
        "Directory"
    } else {
        "File"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn chmod(path: &Path, mode: u32) {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
    }

    fn private_setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let log_dir = root.path().join("logs");
        std::fs::create_dir(&log_dir).unwrap();
        chmod(&log_dir, 0o700);
        let config = root.path().join("metronome.conf");
        std::fs::write(&config, "{}").unwrap();
        chmod(&config, 0o600);
        (root, log_dir, config)
    }

    #[test]
    fn private_dir_and_config_pass() {
        let (_root, log_dir, config) = private_setup();
        check_installation(Some(&log_dir), &[config]).unwrap();
    }

    #[test]
    fn world_readable_config_fails() {
        let (_root, log_dir, config) = private_setup();
        chmod(&config, 0o644);
        let err = check_installation(Some(&log_dir), &[config]).unwrap_err();
        assert!(matches!(err, MetronomeError::InstallationError(_)));
        assert!(err.to_string().contains("group or others"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn read_only_log_dir_fails() {
        let (_root, log_dir, _config) = private_setup();
        chmod(&log_dir, 0o500);
        let err = check_path(&log_dir, AccessRequirements::LOG_DIR).unwrap_err();
        chmod(&log_dir, 0o700);
        assert!(err.to_string().contains("writable"));
    }

    #[test]
    fn missing_or_wrong_kind_fails() {
        let (root, _log_dir, config) = private_setup();
        let err = check_path(&root.path().join("absent.conf"), AccessRequirements::CONFIG_FILE)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));

        let err = check_path(&config, AccessRequirements::LOG_DIR).unwrap_err();
        assert!(err.to_string().contains("Directory"), "{err}");
    }

    #[test]
    fn no_log_dir_checks_only_configs() {
        let (_root, _log_dir, config) = private_setup();
        check_installation(None, &[config]).unwrap();
        check_installation(None, &[]).unwrap();
    }
}
