use crate::prelude::CoreResult;
use crate::serialization::json::{read_json, write_json};
use crate::serialization::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The `<request>.request` meta file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFile {
    pub request_name: String,
    pub created: Timestamp,
    /// Name of the master measurement, empty when none is set.
    #[serde(default)]
    pub master: String,
    /// Measurements excluded from master/slave operations.
    #[serde(default)]
    pub nonslave: Vec<String>,
}

impl RequestFile {
    pub fn new(request_name: impl Into<String>) -> Self {
        Self {
            request_name: request_name.into(),
            created: Timestamp::now(),
            master: String::new(),
            nonslave: Vec::new(),
        }
    }

    pub fn read(path: &Path) -> CoreResult<Self> {
        read_json(path)
    }

    pub fn write(&self, path: &Path) -> CoreResult<()> {
        write_json(path, self)
    }
}
