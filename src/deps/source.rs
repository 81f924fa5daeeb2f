//! Source tree preparation: local tree, or download + verify + unpack.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::download::{self, DownloadOptions};
use crate::config::Config;
use crate::formula::{Checksum, Formula, Source};
use crate::install::InstallError;
use crate::process::Cmd;

/// An unpacked source tree.
///
/// When the tree was extracted from an archive it lives in a temporary
/// directory that is deleted when this value is dropped.
#[derive(Debug)]
pub struct SourceTree {
    root: PathBuf,
    _work_dir: Option<TempDir>,
}

impl SourceTree {
    /// Wrap an existing tree. Nothing is cleaned up.
    pub fn local(root: PathBuf) -> Self {
        Self {
            root,
            _work_dir: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True if the tree is removed on drop.
    pub fn is_temporary(&self) -> bool {
        self._work_dir.is_some()
    }
}

/// Make the formula's source available on disk.
pub fn prepare(formula: &Formula, config: &Config) -> Result<SourceTree, InstallError> {
    match &formula.source {
        Source::Local(path) => {
            if !path.is_dir() {
                return Err(InstallError::Fetch(anyhow::anyhow!(
                    "Source directory {} does not exist",
                    path.display()
                )));
            }
            println!("  Using local source {}", path.display());
            Ok(SourceTree::local(path.clone()))
        }
        Source::Archive { url, sha256 } => {
            let expected = match sha256 {
                Checksum::Sha256(digest) => Some(digest.as_str()),
                Checksum::Invalid(raw) => {
                    if !config.allow_unverified {
                        return Err(InstallError::Checksum {
                            url: url.clone(),
                            checksum: raw.clone(),
                        });
                    }
                    eprintln!("  [WARN] Building from unverified archive {}", url);
                    None
                }
            };

            let archive = fetch_archive(&formula.name, url, expected, &config.cache_dir)
                .map_err(InstallError::Fetch)?;
            unpack(&archive).map_err(InstallError::Fetch)
        }
    }
}

/// Cache location for an archive URL.
pub fn cached_archive_path(cache_dir: &Path, name: &str, url: &str) -> PathBuf {
    let file = url
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("source.tar.gz");
    cache_dir.join(format!("{}--{}", name, file))
}

/// Download into the cache unless a verified copy is already there.
fn fetch_archive(name: &str, url: &str, expected: Option<&str>, cache_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
    let dest = cached_archive_path(cache_dir, name, url);

    if let Some(digest) = expected {
        if dest.exists() && download::verify_sha256(&dest, digest).is_ok() {
            println!("  [SKIP] Using cached {}", dest.display());
            return Ok(dest);
        }
    }

    println!("  Downloading {}...", url);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(download::http(url, &dest, &DownloadOptions::default()))?;

    if let Some(digest) = expected {
        if let Err(e) = download::verify_sha256(&dest, digest) {
            let _ = fs::remove_file(&dest);
            return Err(e);
        }
        println!("  Checksum OK");
    }

    Ok(dest)
}

/// Extract an archive into a fresh temporary directory.
pub fn unpack(archive: &Path) -> Result<SourceTree> {
    let work_dir = tempfile::Builder::new()
        .prefix("sdport-src-")
        .tempdir()
        .context("Failed to create temporary work directory")?;

    println!("  Extracting {}...", archive.display());
    Cmd::new("tar")
        .arg("-xzf")
        .arg_path(archive)
        .arg("-C")
        .arg_path(work_dir.path())
        .error_msg(format!("Failed to extract {}", archive.display()))
        .run()?;

    let root = single_top_level_dir(work_dir.path())?;
    Ok(SourceTree {
        root,
        _work_dir: Some(work_dir),
    })
}

/// GitHub tarballs unpack to one `<repo>-<tag>/` directory.
fn single_top_level_dir(dir: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();

    match entries.as_slice() {
        [] => bail!("Archive extracted to nothing"),
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(dir.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_cached_archive_path() {
        let path = cached_archive_path(
            Path::new("/cache"),
            "libsystemd",
            "https://github.com/o/r/archive/refs/tags/v0.1.0.tar.gz",
        );
        assert_eq!(path, PathBuf::from("/cache/libsystemd--v0.1.0.tar.gz"));
    }

    #[test]
    fn test_cached_archive_path_trailing_slash() {
        let path = cached_archive_path(Path::new("/cache"), "libsystemd", "https://example.org/dl/");
        assert_eq!(path, PathBuf::from("/cache/libsystemd--source.tar.gz"));
    }

    #[test]
    fn test_placeholder_checksum_refused() {
        let config = Config::from_vars(&HashMap::new(), Path::new("/"));
        let err = prepare(&Formula::libsystemd(), &config).unwrap_err();
        assert!(matches!(err, InstallError::Checksum { .. }));
    }

    #[test]
    fn test_missing_local_source() {
        let config = Config::from_vars(&HashMap::new(), Path::new("/"));
        let mut formula = Formula::libsystemd();
        formula.source = Source::Local(PathBuf::from("/nonexistent_source_12345"));
        assert!(matches!(
            prepare(&formula, &config),
            Err(InstallError::Fetch(_))
        ));
    }

    #[test]
    fn test_unpack_removes_work_dir_on_drop() {
        let tmp = TempDir::new().unwrap();
        let tree_dir = tmp.path().join("systemd-port-0.1.0/macos-homebrew");
        fs::create_dir_all(&tree_dir).unwrap();
        fs::write(tree_dir.join("meson.build"), "project('x')\n").unwrap();

        let archive = tmp.path().join("src.tar.gz");
        Cmd::new("tar")
            .arg("-czf")
            .arg_path(&archive)
            .arg("-C")
            .arg_path(tmp.path())
            .arg("systemd-port-0.1.0")
            .run()
            .unwrap();

        let tree = unpack(&archive).unwrap();
        assert!(tree.is_temporary());
        assert!(tree.root().ends_with("systemd-port-0.1.0"));
        assert!(tree.root().join("macos-homebrew/meson.build").exists());

        let work = tree.root().parent().unwrap().to_path_buf();
        drop(tree);
        assert!(!work.exists());
    }
}
