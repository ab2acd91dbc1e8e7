use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// The closed set of deployable services.
///
/// Promotion, rollback, and secret sync all key on this set; an unknown
/// service name is rejected at the edge rather than carried as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Frontend,
    Catalogue,
    Voting,
    Recommendation,
}

/// All services, in stable display order.
pub const SERVICES: [Service; 4] = [
    Service::Frontend,
    Service::Catalogue,
    Service::Voting,
    Service::Recommendation,
];

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Frontend => "frontend",
            Service::Catalogue => "catalogue",
            Service::Voting => "voting",
            Service::Recommendation => "recommendation",
        }
    }

    /// Tolerant parse: case-insensitive, accepts a few common shorthands.
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let s = raw.trim().to_lowercase();
        match s.as_str() {
            "frontend" | "front" | "fe" => Ok(Service::Frontend),
            "catalogue" | "catalog" => Ok(Service::Catalogue),
            "voting" | "vote" => Ok(Service::Voting),
            "recommendation" | "recommendations" | "reco" => Ok(Service::Recommendation),
            _ => Err(ModelError::UnknownService(raw.to_string())),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
