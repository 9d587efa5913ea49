use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Storage widths an event array can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageWidth {
    U8,
    U16,
    U32,
}

impl StorageWidth {
    pub fn max_value(self) -> u64 {
        match self {
            StorageWidth::U8 => u8::MAX as u64,
            StorageWidth::U16 => u16::MAX as u64,
            StorageWidth::U32 => u32::MAX as u64,
        }
    }

    /// Smallest width able to hold `value`, if any.
    pub fn smallest_for(value: u64) -> Option<Self> {
        [StorageWidth::U8, StorageWidth::U16, StorageWidth::U32]
            .into_iter()
            .find(|width| value <= width.max_value())
    }
}

impl fmt::Display for StorageWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageWidth::U8 => "u8",
            StorageWidth::U16 => "u16",
            StorageWidth::U32 => "u32",
        };
        f.write_str(name)
    }
}

/// Step of a rename that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameStep {
    Directory,
    InfoFile,
    CutFiles,
}

impl fmt::Display for RenameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenameStep::Directory => "directory",
            RenameStep::InfoFile => "info file",
            RenameStep::CutFiles => "cut files",
        };
        f.write_str(name)
    }
}

/// Common error type for the entity store, serialization and processing layers.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("value {value} does not fit into {width}")]
    Range { value: i64, width: StorageWidth },
    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("consistency error: {0}")]
    Consistency(String),
    #[error("failed to rename {step}: {source}")]
    Rename {
        step: RenameStep,
        #[source]
        source: Box<CoreError>,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Wraps an i/o error, mapping `NotFound` onto its own variant.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            CoreError::NotFound { path }
        } else {
            CoreError::Io { path, source }
        }
    }

    pub fn parse(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        CoreError::Parse {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Opaque identifier of an open view onto an entity.
///
/// Several views may reference the same entity, so this is deliberately not
/// the entity's serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabId(pub u64);

/// Cooperative cancellation shared between a caller and a background worker.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
