use crate::prelude::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Reads and deserializes a JSON document. A missing file is `NotFound`,
/// malformed content is `Parse`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let text = fs::read_to_string(path).map_err(|err| CoreError::io(path, err))?;
    serde_json::from_str(&text).map_err(|err| CoreError::parse(path, err))
}

/// Serializes `value` as pretty-printed JSON and writes it to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|err| CoreError::parse(path, err))?;
    fs::write(path, text).map_err(|err| CoreError::io(path, err))
}

/// Overwrites the given top-level sections of the JSON object at `path`,
/// keeping any other sections already in the file.
pub fn merge_sections(path: &Path, sections: Vec<(&str, Value)>) -> CoreResult<()> {
    let mut document = match read_json::<Value>(path) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) | Err(CoreError::NotFound { .. }) | Err(CoreError::Parse { .. }) => {
            Value::Object(Default::default())
        }
        Err(err) => return Err(err),
    };
    if let Value::Object(map) = &mut document {
        for (key, value) in sections {
            map.insert(key.to_string(), value);
        }
    }
    write_json(path, &document)
}

pub(crate) fn to_value<T: Serialize>(path: &Path, value: &T) -> CoreResult<Value> {
    serde_json::to_value(value).map_err(|err| CoreError::parse(path, err))
}

/// Booleans stored as the strings `"True"` / `"False"`.
pub mod python_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let text = String::deserialize(deserializer)?;
        match text.as_str() {
            "True" => Ok(true),
            "False" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected \"True\" or \"False\", got \"{}\"",
                other
            ))),
        }
    }
}
