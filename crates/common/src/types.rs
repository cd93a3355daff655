use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a sale.
///
/// Sale ids are opaque strings on the wire. New sales get a random UUID,
/// but any string produced upstream is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(String);

impl SaleId {
    /// Creates a new random sale ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SaleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SaleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SaleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SaleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for SaleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
