/// Delete authorization
///
/// Tasks and comments are deleted by id. Whether the caller must own the
/// document is a deployment decision captured by [`DeletePolicy`]:
///
/// - `Unchecked` (default): any signed-in caller may delete any id. This is
///   how the service has always behaved; the dashboard and comment list only
///   show delete controls to the owner.
/// - `Owner`: the caller's email must match the document's owner/author.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{DeletePolicy, AuthzError};
///
/// let policy: DeletePolicy = "owner".parse().unwrap();
/// assert!(policy.authorize_delete(Some("ana@example.com"), "ana@example.com").is_ok());
/// assert!(matches!(
///     policy.authorize_delete(Some("bob@example.com"), "ana@example.com"),
///     Err(AuthzError::NotAuthorized)
/// ));
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    /// Unknown policy name in configuration
    #[error("Unknown delete policy: {0} (expected 'unchecked' or 'owner')")]
    UnknownPolicy(String),
}

/// Who may delete a task or comment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// No ownership check
    #[default]
    Unchecked,

    /// Only the owner (task) or author (comment)
    Owner,
}

impl DeletePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletePolicy::Unchecked => "unchecked",
            DeletePolicy::Owner => "owner",
        }
    }

    /// Whether the policy needs the stored document to decide
    pub fn requires_owner_lookup(&self) -> bool {
        matches!(self, DeletePolicy::Owner)
    }

    /// Checks a delete against the document owner's email
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotAuthorized` under the `Owner` policy when the
    /// caller is anonymous or not the owner.
    pub fn authorize_delete(&self, caller: Option<&str>, owner: &str) -> Result<(), AuthzError> {
        match self {
            DeletePolicy::Unchecked => Ok(()),
            DeletePolicy::Owner if caller == Some(owner) => Ok(()),
            DeletePolicy::Owner => Err(AuthzError::NotAuthorized),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletePolicy {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unchecked" => Ok(DeletePolicy::Unchecked),
            "owner" => Ok(DeletePolicy::Owner),
            other => Err(AuthzError::UnknownPolicy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unchecked() {
        assert_eq!(DeletePolicy::default(), DeletePolicy::Unchecked);
        assert!(!DeletePolicy::default().requires_owner_lookup());
    }

    #[test]
    fn test_unchecked_allows_anyone() {
        let policy = DeletePolicy::Unchecked;
        assert!(policy.authorize_delete(Some("bob@example.com"), "ana@example.com").is_ok());
        assert!(policy.authorize_delete(None, "ana@example.com").is_ok());
    }

    #[test]
    fn test_owner_policy() {
        let policy = DeletePolicy::Owner;
        assert!(policy.authorize_delete(Some("ana@example.com"), "ana@example.com").is_ok());
        assert_eq!(
            policy.authorize_delete(Some("bob@example.com"), "ana@example.com"),
            Err(AuthzError::NotAuthorized)
        );
        assert_eq!(
            policy.authorize_delete(None, "ana@example.com"),
            Err(AuthzError::NotAuthorized)
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("unchecked".parse::<DeletePolicy>().unwrap(), DeletePolicy::Unchecked);
        assert_eq!(" Owner ".parse::<DeletePolicy>().unwrap(), DeletePolicy::Owner);
        assert!(matches!(
            "admins".parse::<DeletePolicy>(),
            Err(AuthzError::UnknownPolicy(_))
        ));
    }
}
