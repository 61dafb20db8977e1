//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for GCP resource identifiers.
//! Each type ensures type safety and enforces the identifier character
//! rules, so only validated values ever reach the snapshot DDL builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// GCP project identifier newtype wrapper
///
/// Project IDs are lowercase letters, digits and hyphens, starting with a
/// letter and not ending with a hyphen.
///
/// # Examples
///
/// ```
/// use tablesnap::domain::ids::ProjectId;
/// use std::str::FromStr;
///
/// let project = ProjectId::from_str("acme-eu").unwrap();
/// assert_eq!(project.as_str(), "acme-eu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Creates a new ProjectId from a string
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value is empty, longer than 30 characters, or
    /// contains characters outside `[a-z0-9-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Project ID cannot be empty".to_string());
        }
        if id.len() > 30 {
            return Err(format!("Project ID too long ({} > 30): {id}", id.len()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(format!(
                "Invalid project ID '{id}': only lowercase letters, digits and hyphens are allowed"
            ));
        }
        if !id.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(format!("Project ID must start with a letter: {id}"));
        }
        if id.ends_with('-') {
            return Err(format!("Project ID cannot end with a hyphen: {id}"));
        }
        Ok(Self(id))
    }

    /// Returns the project ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Dataset identifier newtype wrapper
///
/// Dataset IDs are letters, digits and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetId(String);

impl DatasetId {
    /// Creates a new DatasetId from a string
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value is empty, longer than 1024 characters, or
    /// contains characters outside `[A-Za-z0-9_]`.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Dataset ID cannot be empty".to_string());
        }
        if id.len() > 1024 {
            return Err(format!("Dataset ID too long ({} > 1024)", id.len()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(format!(
                "Invalid dataset ID '{id}': only letters, digits and underscores are allowed"
            ));
        }
        Ok(Self(id))
    }

    /// Returns the dataset ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Table identifier newtype wrapper
///
/// Table IDs are letters, digits, underscores and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableId(String);

impl TableId {
    /// Creates a new TableId from a string
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value is empty, longer than 1024 characters, or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Table ID cannot be empty".to_string());
        }
        if id.len() > 1024 {
            return Err(format!("Table ID too long ({} > 1024)", id.len()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!(
                "Invalid table ID '{id}': only letters, digits, underscores and hyphens are allowed"
            ));
        }
        Ok(Self(id))
    }

    /// Returns the table ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

macro_rules! impl_id_traits {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> String {
                id.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_id_traits!(ProjectId);
impl_id_traits!(DatasetId);
impl_id_traits!(TableId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_valid() {
        let id = ProjectId::new("acme-eu").unwrap();
        assert_eq!(id.as_str(), "acme-eu");
        assert_eq!(id.to_string(), "acme-eu");
    }

    #[test]
    fn test_project_id_rejects_empty() {
        assert!(ProjectId::new("").is_err());
        assert!(ProjectId::new("   ").is_err());
    }

    #[test]
    fn test_project_id_rejects_uppercase() {
        assert!(ProjectId::new("Acme-EU").is_err());
    }

    #[test]
    fn test_project_id_rejects_injection() {
        assert!(ProjectId::new("acme.eu`; DROP TABLE x").is_err());
        assert!(ProjectId::new("acme eu").is_err());
        assert!(ProjectId::new("acme`eu").is_err());
    }

    #[test]
    fn test_project_id_rejects_leading_digit_and_trailing_hyphen() {
        assert!(ProjectId::new("1acme").is_err());
        assert!(ProjectId::new("acme-").is_err());
    }

    #[test]
    fn test_dataset_id_valid() {
        let id = DatasetId::new("acme_eu_billing").unwrap();
        assert_eq!(id.as_str(), "acme_eu_billing");
    }

    #[test]
    fn test_dataset_id_rejects_dashes() {
        assert!(DatasetId::new("acme-eu").is_err());
    }

    #[test]
    fn test_dataset_id_rejects_injection() {
        assert!(DatasetId::new("billing` CLONE x").is_err());
    }

    #[test]
    fn test_table_id_valid() {
        assert!(TableId::new("invoices").is_ok());
        assert!(TableId::new("invoices_2024-03").is_ok());
    }

    #[test]
    fn test_table_id_rejects_injection() {
        assert!(TableId::new("invoices; SELECT 1").is_err());
        assert!(TableId::new("invoices`").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let id = ProjectId::new("acme-eu").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"acme-eu\"");
        let back: ProjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let result: Result<ProjectId, _> = serde_json::from_str("\"Not A Project\"");
        assert!(result.is_err());
    }
}
