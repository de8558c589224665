use serde::{Deserialize, Serialize};

/// Metadata framed in front of every request and reply body.
///
/// `seq` is picked by the caller and echoed back unchanged, which is how a
/// peer matches replies to requests when they come back out of order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Header {
    /// "Service.Method"
    pub service_method: String,
    pub seq: u64,
    /// Empty on success.
    pub error: String,
}

impl Header {
    pub fn new(service_method: impl Into<String>, seq: u64) -> Self {
        Self {
            service_method: service_method.into(),
            seq,
            error: String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn set_error(&mut self, error: impl ToString) {
        self.error = error.to_string();
    }
}
