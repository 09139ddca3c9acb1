//! Concurrent file registry: one reader/writer lock per stored filename.
//!
//! The registry map and the per-file locks are the only state shared
//! across connections. Every code path that touches a registered file's
//! bytes does so with the owning handle's lock held; concurrent readers of
//! one file proceed together, while a writer excludes everyone on that
//! file without blocking operations on other files.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::DashMap;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::debug;

pub struct FileRegistry {
    root: PathBuf,
    files: DashMap<String, FileHandle>,
}

impl FileRegistry {
    /// Opens a registry over `root`, registering every regular file already
    /// present there.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let registry = Self {
            root: root.into(),
            files: DashMap::new(),
        };
        for entry in std::fs::read_dir(&registry.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(filename) = entry.file_name().to_str() {
                registry.add_file(filename);
            }
        }
        debug!(root = %registry.root.display(), files = registry.files.len(), "registry opened");
        Ok(registry)
    }

    /// Returns the handle for `filename`, creating one if the name is new.
    /// Re-adding an existing name returns the live handle; it never swaps
    /// in a fresh lock object under concurrent holders.
    pub fn add_file(&self, filename: &str) -> FileHandle {
        self.files
            .entry(filename.to_string())
            .or_insert_with(|| FileHandle::new(self.root.join(filename)))
            .value()
            .clone()
    }

    pub fn get_file(&self, filename: &str) -> Option<FileHandle> {
        self.files.get(filename).map(|handle| handle.value().clone())
    }

    /// Deletes the file on disk while holding its write lock and, only on
    /// success, forgets the handle. An unknown name fails with
    /// `io::ErrorKind::NotFound`; a failed disk delete leaves the handle
    /// registered.
    pub async fn remove_file(&self, filename: &str) -> io::Result<()> {
        let handle = self
            .get_file(filename)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        let _guard = handle.lock.clone().write_owned().await;
        tokio::fs::remove_file(&handle.path).await?;
        let _ = self.files.remove(filename);
        Ok(())
    }

    /// Snapshot of all registered names. No ordering guarantee.
    pub fn list_filenames(&self) -> Vec<String> {
        self.files.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Per-filename lock plus on-disk path. Cloning shares the lock.
#[derive(Clone)]
pub struct FileHandle {
    path: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl FileHandle {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `op` with the read lock held, releasing it afterward no matter
    /// how `op` exits.
    pub async fn with_read_lock<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _guard = self.lock.read().await;
        op(self.path.clone()).await
    }

    /// Runs `op` with the write lock held, releasing it afterward no
    /// matter how `op` exits.
    pub async fn with_write_lock<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _guard = self.lock.write().await;
        op(self.path.clone()).await
    }

    /// Acquires the read lock and opens the file under it. If the open
    /// fails the lock is released before returning; it is never leaked on
    /// the failure path.
    pub async fn read_locked_file(&self) -> io::Result<ReadLockedFile> {
        let guard = self.lock.clone().read_owned().await;
        let file = File::open(&self.path).await?;
        Ok(ReadLockedFile {
            file,
            _guard: guard,
        })
    }
}

/// An open file descriptor scoped to a held read lock. Dropping it closes
/// the descriptor and releases the lock together.
#[derive(Debug)]
pub struct ReadLockedFile {
    file: File,
    _guard: OwnedRwLockReadGuard<()>,
}

impl ReadLockedFile {
    pub async fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata().await?.len())
    }
}

impl AsyncRead for ReadLockedFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}
