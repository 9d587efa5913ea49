use log::{error, info, warn};

/// Log handle keyed by the name of the entity the lines belong to.
#[derive(Debug, Clone)]
pub struct EntityLog {
    target: String,
}

impl EntityLog {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            target: entity_name.into(),
        }
    }

    /// Log handle for request-wide messages.
    pub fn request() -> Self {
        Self::new("request")
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn info(&self, message: &str) {
        info!(target: self.target.as_str(), "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(target: self.target.as_str(), "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(target: self.target.as_str(), "{}", message);
    }
}

impl Default for EntityLog {
    fn default() -> Self {
        Self::request()
    }
}
