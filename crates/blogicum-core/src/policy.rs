//! What a non-owner gets when they reach an edit or delete path.

use std::str::FromStr;

use uuid::Uuid;

use crate::visibility::Viewer;

/// Configured response to a non-owner on an owner-only path.
///
/// The default hides the mutation path by sending the user back to the
/// read-only view instead of showing an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnershipPolicy {
    #[default]
    Redirect,
    Forbid,
    NotFound,
}

/// Outcome of an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipDecision {
    Allow,
    RedirectToDetail,
    Forbid,
    NotFound,
}

impl OwnershipPolicy {
    pub fn decide(self, viewer: Viewer, owner_id: Uuid) -> OwnershipDecision {
        if viewer.owns(owner_id) {
            return OwnershipDecision::Allow;
        }
        match self {
            OwnershipPolicy::Redirect => OwnershipDecision::RedirectToDetail,
            OwnershipPolicy::Forbid => OwnershipDecision::Forbid,
            OwnershipPolicy::NotFound => OwnershipDecision::NotFound,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ownership policy '{0}' (expected redirect, forbid or not_found)")]
pub struct ParsePolicyError(String);

impl FromStr for OwnershipPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(OwnershipPolicy::Redirect),
            "forbid" | "forbidden" => Ok(OwnershipPolicy::Forbid),
            "not_found" | "notfound" | "not-found" => Ok(OwnershipPolicy::NotFound),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}
