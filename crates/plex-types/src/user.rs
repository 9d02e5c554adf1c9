//! Directory users.

use serde::{Deserialize, Serialize};

/// Suffix appended to a user id to name that user's source namespace.
pub const NAMESPACE_SUFFIX: &str = "_Primary";

/// A user enumerated from the directory store.
///
/// Each user owns one isolated source namespace (`<id>_Primary`) and one
/// destination index named by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }

    /// Name of the source namespace holding this user's collections.
    pub fn namespace(&self) -> String {
        format!("{}{}", self.id, NAMESPACE_SUFFIX)
    }

    /// Name of the destination index for this user.
    pub fn index_name(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_and_index() {
        let user = User::new("56ab01", "grace");
        assert_eq!(user.namespace(), "56ab01_Primary");
        assert_eq!(user.index_name(), "56ab01");
    }
}
