use std::{
    fs::File,
    path::Path,
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::{debug, info};
use thiserror::Error;

const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Exclusive advisory lock, released when dropped.
pub struct FileLock {
    _file: File,
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] std::io::Error);

impl FileLock {
    /// Blocks until the lock on `path` is acquired or `timeout` has passed.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, Error> {
        let file = File::create(path)?;
        let start = Instant::now();
        let mut announced = false;
        loop {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    debug!("Acquired a lock on {}", path.display());
                    return Ok(Self { _file: file });
                }
                Ok(false) if start.elapsed() < timeout => {
                    if !announced {
                        info!(
                            "Waiting for another installer to release {}",
                            path.display()
                        );
                        announced = true;
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Ok(false) => return Err(fs4::lock_contended_error().into()),
                Err(error) => return Err(error.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_can_be_reacquired_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");

        let lock = FileLock::acquire(&path, Duration::ZERO).unwrap();
        drop(lock);

        assert!(FileLock::acquire(&path, Duration::ZERO).is_ok());
    }

    #[test]
    fn held_lock_is_not_acquired_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");

        let _first = FileLock::acquire(&path, Duration::ZERO).unwrap();

        assert!(FileLock::acquire(&path, Duration::ZERO).is_err());
    }
}
