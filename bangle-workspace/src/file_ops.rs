//! Note storage backends
//!
//! Operations never touch storage directly; they go through `FileOps`,
//! addressed by wsPath. `DiskFileOps` keeps one directory per workspace
//! under a root. `MemoryFileOps` is an in-process backend with call
//! recording and failure injection.

use crate::error::{
    FileSystemError, FileSystemErrorCode, OperationError, PathValidationError, Result,
    WorkspaceError,
};
use crate::ws_path::{file_path_to_ws_path, resolve_path, split_ws_path};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Storage for the notes of every workspace
#[async_trait]
pub trait FileOps: Send + Sync {
    /// Every file wsPath in `ws_name`, sorted
    async fn list_all_files(&self, ws_name: &str) -> Result<Vec<String>>;

    async fn get_doc(&self, ws_path: &str) -> Result<String>;

    async fn save_doc(&self, ws_path: &str, doc: &str) -> Result<()>;

    async fn delete_file(&self, ws_path: &str) -> Result<()>;

    async fn rename_file(&self, old_ws_path: &str, new_ws_path: &str) -> Result<()>;

    async fn check_file_exists(&self, ws_path: &str) -> Result<bool>;
}

/// Notes stored as plain files, one directory per workspace
#[derive(Debug, Clone)]
pub struct DiskFileOps {
    root: PathBuf,
}

impl DiskFileOps {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ws_dir(&self, ws_name: &str) -> PathBuf {
        self.root.join(ws_name)
    }

    fn fs_path(&self, ws_path: &str) -> Result<PathBuf> {
        let resolved = resolve_path(ws_path)?;
        let mut path = self.ws_dir(&resolved.ws_name);
        for segment in resolved.file_path.split('/') {
            if segment == ".." || segment == "." {
                return Err(PathValidationError::UnresolvableLocalPath(ws_path.to_string()).into());
            }
            path.push(segment);
        }
        Ok(path)
    }

    async fn ensure_ws_exists(&self, ws_path: &str) -> Result<()> {
        let (ws_name, _) = split_ws_path(ws_path)?;
        if tokio::fs::metadata(self.ws_dir(ws_name)).await.is_err() {
            return Err(WorkspaceError::not_found(ws_name).into());
        }
        Ok(())
    }
}

fn io_error(err: io::Error, ws_path: &str) -> OperationError {
    match err.kind() {
        io::ErrorKind::NotFound => FileSystemError::file_not_found(ws_path).into(),
        _ => FileSystemError::from(err).into(),
    }
}

fn list_files_blocking(ws_dir: &Path, ws_name: &str) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(ws_dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(ws_dir).ok()?;
            let file_path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some(file_path_to_ws_path(ws_name, &file_path))
        })
        .collect();
    files.sort();
    files
}

#[async_trait]
impl FileOps for DiskFileOps {
    async fn list_all_files(&self, ws_name: &str) -> Result<Vec<String>> {
        let ws_dir = self.ws_dir(ws_name);
        if !ws_dir.is_dir() {
            return Err(WorkspaceError::not_found(ws_name).into());
        }
        let name = ws_name.to_string();
        let files = tokio::task::spawn_blocking(move || list_files_blocking(&ws_dir, &name))
            .await
            .map_err(|err| FileSystemError::new(FileSystemErrorCode::Other, err.to_string()))?;
        debug!(ws = %ws_name, count = files.len(), "Listed workspace files");
        Ok(files)
    }

    async fn get_doc(&self, ws_path: &str) -> Result<String> {
        let path = self.fs_path(ws_path)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| io_error(err, ws_path))
    }

    async fn save_doc(&self, ws_path: &str, doc: &str) -> Result<()> {
        let path = self.fs_path(ws_path)?;
        self.ensure_ws_exists(ws_path).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| io_error(err, ws_path))?;
        }
        tokio::fs::write(&path, doc)
            .await
            .map_err(|err| io_error(err, ws_path))
    }

    async fn delete_file(&self, ws_path: &str) -> Result<()> {
        let path = self.fs_path(ws_path)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|err| io_error(err, ws_path))
    }

    async fn rename_file(&self, old_ws_path: &str, new_ws_path: &str) -> Result<()> {
        let from = self.fs_path(old_ws_path)?;
        let to = self.fs_path(new_ws_path)?;
        if from == to {
            return Ok(());
        }
        if tokio::fs::try_exists(&to).await.unwrap_or(false) {
            return Err(FileSystemError::file_already_exists(new_ws_path).into());
        }
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| io_error(err, new_ws_path))?;
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|err| io_error(err, old_ws_path))
    }

    async fn check_file_exists(&self, ws_path: &str) -> Result<bool> {
        let path = self.fs_path(ws_path)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|err| io_error(err, ws_path))
    }
}

/// One recorded `FileOps` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOpCall {
    ListAllFiles(String),
    GetDoc(String),
    SaveDoc(String),
    DeleteFile(String),
    RenameFile(String, String),
    CheckFileExists(String),
}

/// Error a `MemoryFileOps` is told to raise
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    Workspace(WorkspaceError),
    FileSystem(FileSystemError),
}

impl From<WorkspaceError> for InjectedFailure {
    fn from(err: WorkspaceError) -> Self {
        InjectedFailure::Workspace(err)
    }
}

impl From<FileSystemError> for InjectedFailure {
    fn from(err: FileSystemError) -> Self {
        InjectedFailure::FileSystem(err)
    }
}

impl From<InjectedFailure> for OperationError {
    fn from(failure: InjectedFailure) -> Self {
        match failure {
            InjectedFailure::Workspace(err) => err.into(),
            InjectedFailure::FileSystem(err) => err.into(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    workspaces: BTreeSet<String>,
    files: BTreeMap<String, String>,
    calls: Vec<FileOpCall>,
    listing_failure: Option<InjectedFailure>,
}

/// In-memory `FileOps` keyed by wsPath
#[derive(Debug, Default)]
pub struct MemoryFileOps {
    inner: Mutex<MemoryInner>,
}

impl MemoryFileOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace(self, ws_name: &str) -> Self {
        self.inner.lock().workspaces.insert(ws_name.to_string());
        self
    }

    /// Seed a file, creating its workspace
    pub fn with_file(self, ws_path: &str, doc: &str) -> Self {
        {
            let mut inner = self.inner.lock();
            if let Ok((ws_name, _)) = split_ws_path(ws_path) {
                inner.workspaces.insert(ws_name.to_string());
            }
            inner.files.insert(ws_path.to_string(), doc.to_string());
        }
        self
    }

    /// Make every later `list_all_files` fail with `failure`
    pub fn fail_listing(&self, failure: impl Into<InjectedFailure>) {
        self.inner.lock().listing_failure = Some(failure.into());
    }

    pub fn clear_failures(&self) {
        self.inner.lock().listing_failure = None;
    }

    pub fn calls(&self) -> Vec<FileOpCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn doc(&self, ws_path: &str) -> Option<String> {
        self.inner.lock().files.get(ws_path).cloned()
    }

    fn record(&self, call: FileOpCall) {
        self.inner.lock().calls.push(call);
    }
}

#[async_trait]
impl FileOps for MemoryFileOps {
    async fn list_all_files(&self, ws_name: &str) -> Result<Vec<String>> {
        self.record(FileOpCall::ListAllFiles(ws_name.to_string()));
        let inner = self.inner.lock();
        if let Some(failure) = &inner.listing_failure {
            return Err(failure.clone().into());
        }
        if !inner.workspaces.contains(ws_name) {
            return Err(WorkspaceError::not_found(ws_name).into());
        }
        Ok(inner
            .files
            .keys()
            .filter(|path| split_ws_path(path).is_ok_and(|(name, _)| name == ws_name))
            .cloned()
            .collect())
    }

    async fn get_doc(&self, ws_path: &str) -> Result<String> {
        self.record(FileOpCall::GetDoc(ws_path.to_string()));
        self.inner
            .lock()
            .files
            .get(ws_path)
            .cloned()
            .ok_or_else(|| FileSystemError::file_not_found(ws_path).into())
    }

    async fn save_doc(&self, ws_path: &str, doc: &str) -> Result<()> {
        self.record(FileOpCall::SaveDoc(ws_path.to_string()));
        let (ws_name, _) = split_ws_path(ws_path)?;
        let mut inner = self.inner.lock();
        inner.workspaces.insert(ws_name.to_string());
        inner.files.insert(ws_path.to_string(), doc.to_string());
        Ok(())
    }

    async fn delete_file(&self, ws_path: &str) -> Result<()> {
        self.record(FileOpCall::DeleteFile(ws_path.to_string()));
        match self.inner.lock().files.remove(ws_path) {
            Some(_) => Ok(()),
            None => Err(FileSystemError::file_not_found(ws_path).into()),
        }
    }

    async fn rename_file(&self, old_ws_path: &str, new_ws_path: &str) -> Result<()> {
        self.record(FileOpCall::RenameFile(
            old_ws_path.to_string(),
            new_ws_path.to_string(),
        ));
        if old_ws_path == new_ws_path {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        if inner.files.contains_key(new_ws_path) {
            return Err(FileSystemError::file_already_exists(new_ws_path).into());
        }
        let doc = inner
            .files
            .remove(old_ws_path)
            .ok_or_else(|| FileSystemError::file_not_found(old_ws_path))?;
        inner.files.insert(new_ws_path.to_string(), doc);
        Ok(())
    }

    async fn check_file_exists(&self, ws_path: &str) -> Result<bool> {
        self.record(FileOpCall::CheckFileExists(ws_path.to_string()));
        Ok(self.inner.lock().files.contains_key(ws_path))
    }
}
