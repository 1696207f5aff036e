//! End-to-end materialize scenarios against an in-memory KV source.
//!
//! Arguments go through the same resolver the binary uses; only the
//! HTTPS client is replaced.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use consul_fetch::cli::resolve;
use consul_fetch::config::FetchConfig;
use consul_fetch::consul::{FetchRequest, KvPair, KvSource};
use consul_fetch::errors::{FetchError, Result};
use consul_fetch::materialize::fetch_and_materialize;
use tempfile::TempDir;

/// Answers every read from a fixed map and records the keys asked for.
struct MemoryStore {
    pairs: Vec<KvPair>,
    requested: RefCell<Vec<String>>,
}

impl MemoryStore {
    fn with(key: &str, value: &[u8]) -> Self {
        Self {
            pairs: vec![KvPair {
                key: key.to_string(),
                value: value.to_vec(),
                flags: 0,
                modify_index: 7,
            }],
            requested: RefCell::new(Vec::new()),
        }
    }

    fn empty() -> Self {
        Self {
            pairs: Vec::new(),
            requested: RefCell::new(Vec::new()),
        }
    }
}

impl KvSource for MemoryStore {
    fn get(&self, request: &FetchRequest) -> Result<Option<KvPair>> {
        self.requested.borrow_mut().push(request.key.clone());
        Ok(self
            .pairs
            .iter()
            .find(|p| p.key == request.key_path())
            .cloned())
    }
}

fn resolve_for(base_dir: &Path, key: &str, permissions: Option<&str>) -> FetchConfig {
    let mut args = vec![
        "consul-fetch".to_string(),
        "--caFile".into(),
        "ca.pem".into(),
        "--certFile".into(),
        "c.pem".into(),
        "--keyFile".into(),
        "k.pem".into(),
        "consul.example.com".into(),
        key.into(),
        base_dir.to_string_lossy().into_owned(),
    ];
    if let Some(p) = permissions {
        args.push(p.into());
    }
    resolve(args).unwrap()
}

#[cfg(unix)]
fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn writes_config_properties_for_key() {
    let tmp = TempDir::new().unwrap();
    let store = MemoryStore::with("myapp/config", b"db.host=localhost\n");
    let config = resolve_for(tmp.path(), "myapp/config", None);

    let path = fetch_and_materialize(&config, &store).unwrap();

    assert_eq!(path, tmp.path().join("myapp/config/config.properties"));
    assert_eq!(fs::read(&path).unwrap(), b"db.host=localhost\n");
    assert_eq!(*store.requested.borrow(), vec!["myapp/config".to_string()]);

    #[cfg(unix)]
    {
        assert_eq!(mode_of(&tmp.path().join("myapp/config")), 0o744);
        assert_eq!(mode_of(&path), 0o744);
    }
}

#[cfg(unix)]
#[test]
fn explicit_permissions_apply_to_directory_and_file() {
    let tmp = TempDir::new().unwrap();
    let store = MemoryStore::with("svc", b"port=8080\n");
    let config = resolve_for(tmp.path(), "svc", Some("0700"));

    let path = fetch_and_materialize(&config, &store).unwrap();
    assert_eq!(mode_of(&tmp.path().join("svc")), 0o700);
    assert_eq!(mode_of(&path), 0o700);
}

#[test]
fn missing_key_creates_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = resolve_for(tmp.path(), "not/there", None);

    let err = fetch_and_materialize(&config, &MemoryStore::empty()).unwrap_err();

    assert!(matches!(err, FetchError::KeyNotFound(_)));
    assert!(err.to_string().contains("not found"));
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn second_run_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = MemoryStore::with("app", b"a=1\nb=2\n");
    let config = resolve_for(tmp.path(), "app", None);

    let first = fetch_and_materialize(&config, &store).unwrap();
    let first_content = fs::read(&first).unwrap();
    let second = fetch_and_materialize(&config, &store).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), first_content);
}

#[test]
fn existing_directory_is_reused() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("app")).unwrap();
    fs::write(tmp.path().join("app/other.txt"), "keep").unwrap();

    let store = MemoryStore::with("app", b"x");
    let config = resolve_for(tmp.path(), "app", None);
    fetch_and_materialize(&config, &store).unwrap();

    assert_eq!(
        fs::read_to_string(tmp.path().join("app/other.txt")).unwrap(),
        "keep"
    );
}

#[test]
fn binary_value_is_written_verbatim() {
    let tmp = TempDir::new().unwrap();
    let value: Vec<u8> = (0..=255).collect();
    let store = MemoryStore::with("blob", &value);
    let config = resolve_for(tmp.path(), "blob", None);

    let path = fetch_and_materialize(&config, &store).unwrap();
    assert_eq!(fs::read(path).unwrap(), value);
}

#[test]
fn invalid_permissions_never_reach_the_store() {
    let tmp = TempDir::new().unwrap();
    let args = [
        "consul-fetch",
        "--caFile",
        "ca.pem",
        "--certFile",
        "c.pem",
        "--keyFile",
        "k.pem",
        "consul.example.com",
        "app",
        tmp.path().to_str().unwrap(),
        "rw-r--r--",
    ];

    let err = resolve(args).unwrap_err();
    assert!(matches!(err, FetchError::InvalidPermissions(_)));
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}
