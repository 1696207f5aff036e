//! Where a fetched value lands on disk, and how it gets there.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{FetchError, Result};

/// Name of the file written inside the key directory.
pub const CONFIG_FILE_NAME: &str = "config.properties";

/// `{base_dir}/{key}/config.properties` with one mode for directory and file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    base_dir: PathBuf,
    key: String,
    mode: u32,
}

impl OutputTarget {
    /// Build a target, rejecting keys that would escape `base_dir`.
    pub fn new(base_dir: &Path, key: &str, mode: u32) -> Result<Self> {
        let key = safe_key_path(key)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            key: key.to_string(),
            mode,
        })
    }

    /// Directory the file is written into.
    pub fn dir(&self) -> PathBuf {
        self.base_dir.join(&self.key)
    }

    /// Final path of the written file.
    pub fn file(&self) -> PathBuf {
        self.dir().join(CONFIG_FILE_NAME)
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Create the directory tree and write `value` atomically.
    ///
    /// Re-running against an existing directory is fine; an existing
    /// file is replaced by rename, so readers never see a partial write.
    pub fn write(&self, value: &[u8]) -> Result<PathBuf> {
        let dir = self.dir();
        create_dir(&dir, self.mode)?;

        let file = self.file();
        let tmp = dir.join(format!(".{CONFIG_FILE_NAME}.tmp"));

        let result = write_file(&tmp, value, self.mode)
            .and_then(|()| fs::rename(&tmp, &file).map_err(|e| FetchError::io(&file, e)));

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result?;

        debug!(
            path = %file.display(),
            bytes = value.len(),
            mode = format_args!("{:o}", self.mode),
            "wrote file"
        );
        Ok(file)
    }
}

/// Check that a key is usable as a relative path below the base directory.
///
/// Leading and trailing slashes are ignored (Consul folder keys end with
/// one). Empty, `.` and `..` segments are rejected.
pub fn safe_key_path(key: &str) -> Result<&str> {
    let trimmed = key.trim_matches('/');

    if trimmed.is_empty() || trimmed.contains('\0') {
        return Err(FetchError::UnsafeKeyPath(key.to_string()));
    }

    if trimmed
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(FetchError::UnsafeKeyPath(key.to_string()));
    }

    Ok(trimmed)
}

fn create_dir(dir: &Path, mode: u32) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }

    builder.create(dir).map_err(|e| FetchError::io(dir, e))?;

    // The umask applies at creation, and an existing directory keeps its
    // old mode, so set the leaf explicitly.
    set_mode(dir, mode)
}

fn write_file(path: &Path, value: &[u8], mode: u32) -> Result<()> {
    // A stale temp file from an interrupted run may be read-only.
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(FetchError::io(path, e)),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path).map_err(|e| FetchError::io(path, e))?;
    file.write_all(value).map_err(|e| FetchError::io(path, e))?;
    file.sync_all().map_err(|e| FetchError::io(path, e))?;
    drop(file);

    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| FetchError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn target_paths_follow_key() {
        let target = OutputTarget::new(Path::new("/etc/out"), "myapp/config", 0o744).unwrap();
        assert_eq!(target.dir(), PathBuf::from("/etc/out/myapp/config"));
        assert_eq!(
            target.file(),
            PathBuf::from("/etc/out/myapp/config/config.properties")
        );
    }

    #[test]
    fn folder_style_keys_are_trimmed() {
        assert_eq!(safe_key_path("/myapp/config/").unwrap(), "myapp/config");
    }

    #[test]
    fn rejects_traversal_keys() {
        assert!(safe_key_path("../etc").is_err());
        assert!(safe_key_path("app/../../etc").is_err());
        assert!(safe_key_path("app/./config").is_err());
        assert!(safe_key_path("app//config").is_err());
        assert!(safe_key_path("").is_err());
        assert!(safe_key_path("/").is_err());
    }

    #[test]
    fn write_creates_directory_and_file() {
        let tmp = TempDir::new().unwrap();
        let target = OutputTarget::new(tmp.path(), "a/b", 0o744).unwrap();

        let written = target.write(b"x=1\n").unwrap();
        assert_eq!(written, tmp.path().join("a/b/config.properties"));
        assert_eq!(fs::read(&written).unwrap(), b"x=1\n");
    }

    #[test]
    fn write_replaces_existing_file_and_leaves_no_temp() {
        let tmp = TempDir::new().unwrap();
        let target = OutputTarget::new(tmp.path(), "app", 0o744).unwrap();

        target.write(b"old contents that are longer\n").unwrap();
        target.write(b"new\n").unwrap();

        assert_eq!(fs::read(target.file()).unwrap(), b"new\n");
        let names: Vec<_> = fs::read_dir(target.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.properties")]);
    }

    #[test]
    fn write_fails_when_directory_is_a_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("app"), "not a dir").unwrap();

        let target = OutputTarget::new(tmp.path(), "app", 0o744).unwrap();
        assert!(matches!(target.write(b"x"), Err(FetchError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn write_applies_mode_to_directory_and_file() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let target = OutputTarget::new(tmp.path(), "svc", 0o750).unwrap();
        target.write(b"k=v").unwrap();

        let dir_mode = fs::metadata(target.dir()).unwrap().permissions().mode() & 0o7777;
        let file_mode = fs::metadata(target.file()).unwrap().permissions().mode() & 0o7777;
        assert_eq!(dir_mode, 0o750);
        assert_eq!(file_mode, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn stale_read_only_temp_file_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let target = OutputTarget::new(tmp.path(), "svc", 0o744).unwrap();
        fs::create_dir_all(target.dir()).unwrap();
        let stale = target.dir().join(".config.properties.tmp");
        fs::write(&stale, "partial").unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o444)).unwrap();

        target.write(b"complete").unwrap();
        assert_eq!(fs::read(target.file()).unwrap(), b"complete");
        assert!(!stale.exists());
    }
}
