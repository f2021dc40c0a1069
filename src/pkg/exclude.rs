//! Scoped yum exclusion config
//!
//! The exclusion list is handed to yum as a config file at a well-known
//! temporary path. The file must never outlive the call that created it, so
//! it is modeled as an RAII guard: removal happens on drop, which covers
//! early returns and error paths as well as the happy path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Well-known path for the transient exclusion config
pub const EXCLUDE_CONF_PATH: &str = "/tmp/prepatch-yum-exclude.conf";

/// Temporary yum config carrying an `exclude=` glob list; removed on drop
pub struct ExcludeConf {
    path: PathBuf,
}

impl ExcludeConf {
    /// Write the config at `path` with the given exclusion globs
    pub fn create(path: impl AsRef<Path>, patterns: &[&str]) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = format!("[main]\nexclude={}\n", patterns.join(" "));
        fs::write(&path, contents)?;
        debug!("Wrote exclusion config {} ({:?})", path.display(), patterns);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExcludeConf {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_exclude_line_and_removes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exclude.conf");

        let conf = ExcludeConf::create(&path, &["awslogs*", "kernel*"]).unwrap();
        let contents = fs::read_to_string(conf.path()).unwrap();
        assert!(contents.contains("exclude=awslogs* kernel*"));

        drop(conf);
        assert!(!path.exists());
    }

    #[test]
    fn removed_even_when_the_caller_bails_early() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exclude.conf");

        let attempt = || -> Result<(), io::Error> {
            let _conf = ExcludeConf::create(&path, &["awslogs*"])?;
            Err(io::Error::other("simulated check failure"))
        };

        assert!(attempt().is_err());
        assert!(!path.exists());
    }

    #[test]
    fn drop_tolerates_a_file_already_gone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exclude.conf");

        let conf = ExcludeConf::create(&path, &["awslogs*"]).unwrap();
        fs::remove_file(&path).unwrap();
        drop(conf);
    }
}
