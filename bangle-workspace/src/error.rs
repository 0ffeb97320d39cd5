//! Error taxonomy for workspace paths and workspace operations

use bangle_store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// A malformed wsPath or workspace name
///
/// Raised synchronously; callers validate untrusted input before building
/// paths from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathValidationError {
    #[error("Invalid path {0}")]
    EmptySegment(String),

    #[error("Invalid wsPath {0}: missing ':' separator")]
    MissingSeparator(String),

    #[error("Colon not allowed in file path {0}")]
    ExtraSeparator(String),

    #[error("Invalid wsName \"{0}\"")]
    EmptyWsName(String),

    #[error("Invalid characters in \"{0}\"")]
    InvalidWsNameCharacters(String),

    #[error("Invalid filePath in {0}")]
    EmptyFilePath(String),

    #[error("Invalid wsPath {0}: file name has no extension")]
    MissingExtension(String),

    #[error("Bangle.io support the following file extensions for notes: {0}")]
    UnsupportedNoteExtension(String),

    #[error("Invalid character \":\" in \"{0}\"")]
    ColonInLocalPath(String),

    #[error("Cannot resolve local path {0}")]
    UnresolvableLocalPath(String),
}

/// Machine-readable kind of a `WorkspaceError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceErrorCode {
    NotFound,
    AlreadyExists,
    DeletedModify,
    ProviderNotFound,
    NoteFormatProviderNotFound,
    StorageProviderDoesNotExist,
    HelpDocRename,
}

impl WorkspaceErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceErrorCode::NotFound => "WORKSPACE_NOT_FOUND_ERROR",
            WorkspaceErrorCode::AlreadyExists => "WORKSPACE_ALREADY_EXISTS_ERROR",
            WorkspaceErrorCode::DeletedModify => "WORKSPACE_DELETED_MODIFY_ERROR",
            WorkspaceErrorCode::ProviderNotFound => "WORKSPACE_PROVIDER_NOT_FOUND_ERROR",
            WorkspaceErrorCode::NoteFormatProviderNotFound => {
                "NOTE_FORMAT_PROVIDER_NOT_FOUND_ERROR"
            }
            WorkspaceErrorCode::StorageProviderDoesNotExist => {
                "WORKSPACE_STORAGE_PROVIDER_DOES_NOT_EXIST_ERROR"
            }
            WorkspaceErrorCode::HelpDocRename => "WORKSPACE_HELP_DOC_RENAME_ERROR",
        }
    }
}

impl fmt::Display for WorkspaceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkspaceError {
    pub code: WorkspaceErrorCode,
    pub message: String,
}

impl WorkspaceError {
    pub fn new(code: WorkspaceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(ws_name: &str) -> Self {
        Self::new(
            WorkspaceErrorCode::NotFound,
            format!("Workspace {ws_name} not found"),
        )
    }

    pub fn already_exists(ws_name: &str) -> Self {
        Self::new(
            WorkspaceErrorCode::AlreadyExists,
            format!("Workspace {ws_name} already exists"),
        )
    }

    pub fn deleted_modify(ws_name: &str) -> Self {
        Self::new(
            WorkspaceErrorCode::DeletedModify,
            format!("Cannot modify deleted workspace {ws_name}"),
        )
    }
}

/// Machine-readable kind of a `FileSystemError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileSystemErrorCode {
    PermissionDenied,
    FileNotFound,
    FileAlreadyExists,
    Io,
    Other,
}

impl FileSystemErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileSystemErrorCode::PermissionDenied => "BABY_FS_NATIVE_BROWSER_USER_ABORTED_ERROR",
            FileSystemErrorCode::FileNotFound => "BABY_FS_FILE_NOT_FOUND_ERROR",
            FileSystemErrorCode::FileAlreadyExists => "BABY_FS_FILE_ALREADY_EXISTS_ERROR",
            FileSystemErrorCode::Io => "BABY_FS_IO_ERROR",
            FileSystemErrorCode::Other => "BABY_FS_ERROR",
        }
    }
}

impl fmt::Display for FileSystemErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a `FileOps` backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FileSystemError {
    pub code: FileSystemErrorCode,
    pub message: String,
}

impl FileSystemError {
    pub fn new(code: FileSystemErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(FileSystemErrorCode::PermissionDenied, message)
    }

    pub fn file_not_found(ws_path: &str) -> Self {
        Self::new(
            FileSystemErrorCode::FileNotFound,
            format!("File {ws_path} not found"),
        )
    }

    pub fn file_already_exists(ws_path: &str) -> Self {
        Self::new(
            FileSystemErrorCode::FileAlreadyExists,
            format!("File {ws_path} already exists"),
        )
    }

    pub fn is_permission_error(&self) -> bool {
        self.code == FileSystemErrorCode::PermissionDenied
    }
}

impl From<io::Error> for FileSystemError {
    fn from(err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => FileSystemErrorCode::FileNotFound,
            io::ErrorKind::PermissionDenied => FileSystemErrorCode::PermissionDenied,
            io::ErrorKind::AlreadyExists => FileSystemErrorCode::FileAlreadyExists,
            _ => FileSystemErrorCode::Io,
        };
        Self::new(code, err.to_string())
    }
}

/// Any failure of a workspace operation
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Path(#[from] PathValidationError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OperationError {
    pub fn workspace_code(&self) -> Option<WorkspaceErrorCode> {
        match self {
            OperationError::Workspace(err) => Some(err.code),
            _ => None,
        }
    }

    pub fn file_system_code(&self) -> Option<FileSystemErrorCode> {
        match self {
            OperationError::FileSystem(err) => Some(err.code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OperationError>;
