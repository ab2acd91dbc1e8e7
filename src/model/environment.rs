use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Deployment environments, ordered by increasing trust.
///
/// The derived `Ord` is the promotion order: dev < staging < prod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }

    /// Position in the promotion order, lowest trust first.
    pub fn tier(self) -> u8 {
        match self {
            Environment::Dev => 0,
            Environment::Staging => 1,
            Environment::Prod => 2,
        }
    }

    /// The next-lower tier, i.e. the default source of a promotion into
    /// this environment. Dev has no predecessor.
    pub fn predecessor(self) -> Option<Environment> {
        match self {
            Environment::Dev => None,
            Environment::Staging => Some(Environment::Dev),
            Environment::Prod => Some(Environment::Staging),
        }
    }

    /// Whether this is the highest-trust tier (gated promotions).
    pub fn is_prod(self) -> bool {
        matches!(self, Environment::Prod)
    }

    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let s = raw.trim().to_lowercase();
        match s.as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "staging" | "stage" | "stg" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(ModelError::UnknownEnvironment(raw.to_string())),
        }
    }

    pub fn all() -> [Environment; 3] {
        [Environment::Dev, Environment::Staging, Environment::Prod]
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Environment::Dev < Environment::Staging);
        assert!(Environment::Staging < Environment::Prod);
    }

    #[test]
    fn predecessor_walks_down() {
        assert_eq!(Environment::Prod.predecessor(), Some(Environment::Staging));
        assert_eq!(Environment::Staging.predecessor(), Some(Environment::Dev));
        assert_eq!(Environment::Dev.predecessor(), None);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(Environment::parse("Production").unwrap(), Environment::Prod);
        assert_eq!(Environment::parse("stg").unwrap(), Environment::Staging);
    }
}
