//! Advisory lock so two installs never write the same prefix.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::InstallError;

pub const LOCK_FILE: &str = ".sdport.lock";

/// Held for the duration of configure/compile/install. Removed on drop.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(prefix: &Path) -> Result<Self, InstallError> {
        fs::create_dir_all(prefix)?;
        let path = prefix.join(LOCK_FILE);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(InstallError::Locked(path));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let tmp = tempfile::TempDir::new().unwrap();
        let prefix = tmp.path().join("prefix");

        let lock = InstallLock::acquire(&prefix).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            InstallLock::acquire(&prefix),
            Err(InstallError::Locked(_))
        ));

        drop(lock);
        assert!(!prefix.join(LOCK_FILE).exists());
        InstallLock::acquire(&prefix).unwrap();
    }
}
