//! Desired-state records: one YAML document per (service, environment).

use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::model::{ImageRef, Service};

/// The declarative "this image should run" record.
///
/// Serialized form:
/// ```yaml
/// service: catalogue
/// image:
///   repository: registry.example.io/craftista/catalogue
///   tag: v1.2.3
/// ```
///
/// The tag field is the unit of change; everything else is stable once the
/// pair is onboarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredStateRecord {
    pub service: Service,
    pub image: ImageRef,
}

impl DesiredStateRecord {
    pub fn new(service: Service, image: ImageRef) -> Self {
        DesiredStateRecord { service, image }
    }

    pub fn tag(&self) -> &str {
        &self.image.tag
    }

    /// Parse the on-disk form. `path` is only for diagnostics.
    pub fn parse(path: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        serde_yaml::from_slice(bytes).map_err(|e| StoreError::MalformedRecord {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse and check the embedded service name matches the path's.
    pub fn parse_for(
        path: &str,
        bytes: &[u8],
        expected: Service,
    ) -> Result<Self, StoreError> {
        let record = Self::parse(path, bytes)?;
        if record.service != expected {
            return Err(StoreError::RecordServiceMismatch {
                path: path.to_string(),
                found: record.service,
                expected,
            });
        }
        Ok(record)
    }

    pub fn to_yaml(&self) -> Vec<u8> {
        // A struct of enums and strings cannot fail to serialize.
        serde_yaml::to_string(self)
            .expect("record serialization is infallible")
            .into_bytes()
    }

    /// The same record pointing at a different tag.
    pub fn with_tag(&self, tag: &str) -> Result<Self, StoreError> {
        Ok(DesiredStateRecord {
            service: self.service,
            image: self.image.with_tag(tag)?,
        })
    }
}
