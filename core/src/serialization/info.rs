use crate::prelude::CoreResult;
use crate::serialization::json::{read_json, write_json};
use crate::serialization::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of an entity's `.info` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub modified: Timestamp,
}

impl InfoFile {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            modified: Timestamp::now(),
        }
    }

    pub fn read(path: &Path) -> CoreResult<Self> {
        read_json(path)
    }

    /// Writes the file with a fresh modification time.
    pub fn write(&mut self, path: &Path) -> CoreResult<()> {
        self.modified = Timestamp::now();
        write_json(path, self)
    }
}
