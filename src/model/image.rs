use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// A registry-qualified image reference: repository plus tag.
///
/// The repository is treated as opaque; the tag is the separately
/// addressable token that promotion and rollback mutate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Result<Self, ModelError> {
        let repository = repository.into();
        let tag = tag.into();
        if repository.trim().is_empty() {
            return Err(ModelError::InvalidImageRef(repository, "empty repository"));
        }
        validate_tag(&tag)?;
        Ok(ImageRef { repository, tag })
    }

    /// Same repository, different tag.
    pub fn with_tag(&self, tag: impl Into<String>) -> Result<Self, ModelError> {
        ImageRef::new(self.repository.clone(), tag)
    }

    /// Parse a `repository:tag` rendering. The last colon after the final
    /// slash splits the tag, so registry ports are preserved.
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let split_at = raw
            .rfind(':')
            .filter(|idx| *idx > raw.rfind('/').unwrap_or(0))
            .ok_or(ModelError::InvalidImageRef(raw.to_string(), "missing tag"))?;
        ImageRef::new(&raw[..split_at], &raw[split_at + 1..])
    }
}

/// Tags travel through commit trailers, YAML records, and CLI args, so the
/// character set stays conservative.
pub(crate) fn validate_tag(tag: &str) -> Result<(), ModelError> {
    if tag.is_empty() {
        return Err(ModelError::InvalidTag(tag.to_string(), "empty tag"));
    }
    if tag.len() > 128 {
        return Err(ModelError::InvalidTag(tag.to_string(), "tag too long"));
    }
    let valid = tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid {
        return Err(ModelError::InvalidTag(
            tag.to_string(),
            "tags may contain only alphanumerics, `.`, `-`, `_`",
        ));
    }
    Ok(())
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_last_colon() {
        let img = ImageRef::parse("registry.example.io:5000/shop/catalogue:v1.2.3").unwrap();
        assert_eq!(img.repository, "registry.example.io:5000/shop/catalogue");
        assert_eq!(img.tag, "v1.2.3");
    }

    #[test]
    fn parse_requires_tag() {
        assert!(ImageRef::parse("registry.example.io/shop/catalogue").is_err());
    }

    #[test]
    fn rejects_bad_tag_characters() {
        assert!(ImageRef::new("repo", "v1 2").is_err());
        assert!(ImageRef::new("repo", "").is_err());
    }

    #[test]
    fn display_round_trips() {
        let img = ImageRef::new("registry.example.io/shop/voting", "abc123").unwrap();
        assert_eq!(ImageRef::parse(&img.to_string()).unwrap(), img);
    }
}
