use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// A TOML case manifest: a `format` header plus a list of cases.
#[derive(Clone, Debug, Deserialize)]
pub struct Manifest<C> {
    pub format: String,
    pub cases: Vec<C>,
}

/// Fixture path relative to the calling crate's `tests/fixtures` directory.
pub fn fixture_path(manifest_dir: &str, name: &str) -> PathBuf {
    Path::new(manifest_dir).join("tests").join("fixtures").join(name)
}

/// Load and check a case manifest. Panics with the file path on any problem, since a
/// broken fixture is a test bug rather than a runtime condition.
pub fn load_manifest<C: DeserializeOwned>(path: &Path, expected_format: &str) -> Vec<C> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read manifest {path:?}: {err}"));
    let manifest: Manifest<C> = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse manifest {path:?}: {err}"));
    assert_eq!(
        manifest.format, expected_format,
        "unsupported format in {path:?}"
    );
    assert!(!manifest.cases.is_empty(), "manifest {path:?} has no cases");
    manifest.cases
}
