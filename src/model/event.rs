//! The promotion event schema.
//!
//! Every successful promotion or rollback is published as one git commit
//! whose message carries an explicit trailer block. The trailer block is the
//! append-only event log: history queries parse it back with
//! [`PromotionEvent::parse`] rather than pattern-matching message text.

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::{Environment, ImageRef, ModelError, Service};

/// Trailer keys are namespaced so unrelated commits on the branch can never
/// alias an event.
pub const TRAILER_PREFIX: &str = "Regatta-";

const T_KIND: &str = "Regatta-Kind";
const T_SERVICE: &str = "Regatta-Service";
const T_ENVIRONMENT: &str = "Regatta-Environment";
const T_IMAGE: &str = "Regatta-Image";
const T_TAG: &str = "Regatta-Tag";
const T_PREVIOUS_TAG: &str = "Regatta-Previous-Tag";
const T_SOURCE_ENV: &str = "Regatta-Source-Environment";
const T_ROLLBACK_TARGET: &str = "Regatta-Rollback-Target";
const T_APPROVAL: &str = "Regatta-Approval";
const T_ACTOR: &str = "Regatta-Actor";
const T_DATE: &str = "Regatta-Date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Promote,
    Rollback,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Promote => "promote",
            EventKind::Rollback => "rollback",
        }
    }
}

/// How the approval gate was satisfied for this event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    /// Tier did not require approval.
    NotRequired,
    /// Operator confirmed interactively.
    Granted,
    /// Explicitly bypassed (`--yes`).
    Bypassed,
}

impl Approval {
    fn as_str(self) -> &'static str {
        match self {
            Approval::NotRequired => "not-required",
            Approval::Granted => "granted",
            Approval::Bypassed => "bypassed",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "not-required" => Some(Approval::NotRequired),
            "granted" => Some(Approval::Granted),
            "bypassed" => Some(Approval::Bypassed),
            _ => None,
        }
    }
}

/// One immutable entry in the promotion log.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionEvent {
    pub kind: EventKind,
    pub service: Service,
    pub environment: Environment,
    pub image: ImageRef,
    /// Tag the record held immediately before this event, if any.
    pub previous_tag: Option<String>,
    /// Upstream tier the consistency gate validated against (prod only).
    pub source_environment: Option<Environment>,
    /// For rollbacks: the revision the restored content came from.
    pub rollback_target: Option<String>,
    pub approval: Approval,
    pub actor: String,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: OffsetDateTime,
}

fn serialize_rfc3339<S: serde::Serializer>(
    ts: &OffsetDateTime,
    ser: S,
) -> Result<S::Ok, S::Error> {
    let s = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    ser.serialize_str(&s)
}

impl PromotionEvent {
    /// Subject line, e.g. `promote(catalogue): staging -> v1.2.3`.
    pub fn subject(&self) -> String {
        format!(
            "{}({}): {} -> {}",
            self.kind.as_str(),
            self.service,
            self.environment,
            self.image.tag
        )
    }

    /// Full commit message: subject, optional operator notes, trailer block.
    pub fn to_commit_message(&self) -> String {
        let mut msg = self.subject();
        msg.push('\n');

        // Prod events carry the ready-to-paste rollback invocation so the
        // audit trail doubles as the runbook.
        if self.environment.is_prod()
            && let Some(prev) = &self.previous_tag
        {
            msg.push_str(&format!(
                "\nTo roll back: regatta rollback --service {} --env {} --to-tag {}\n",
                self.service, self.environment, prev
            ));
        }

        msg.push('\n');
        let mut trailer = |key: &str, value: &str| {
            msg.push_str(key);
            msg.push_str(": ");
            msg.push_str(value);
            msg.push('\n');
        };

        trailer(T_KIND, self.kind.as_str());
        trailer(T_SERVICE, self.service.as_str());
        trailer(T_ENVIRONMENT, self.environment.as_str());
        trailer(T_IMAGE, &self.image.repository);
        trailer(T_TAG, &self.image.tag);
        if let Some(prev) = &self.previous_tag {
            trailer(T_PREVIOUS_TAG, prev);
        }
        if let Some(src) = self.source_environment {
            trailer(T_SOURCE_ENV, src.as_str());
        }
        if let Some(target) = &self.rollback_target {
            trailer(T_ROLLBACK_TARGET, target);
        }
        trailer(T_APPROVAL, self.approval.as_str());
        trailer(T_ACTOR, &self.actor);
        let date = self
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        trailer(T_DATE, &date);

        msg
    }

    /// Parse a commit message back into an event.
    ///
    /// Returns `NotAnEvent` for commits without a `Regatta-Kind` trailer so
    /// history walks can skip unrelated commits cheaply.
    pub fn parse(commit: &str, message: &str) -> Result<Self, ModelError> {
        let trailers = parse_trailers(message);

        let get = |key: &'static str| -> Result<&str, ModelError> {
            trailers
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or(ModelError::MissingTrailer {
                    commit: commit.to_string(),
                    trailer: key,
                })
        };

        let kind = match trailers.iter().find(|(k, _)| *k == T_KIND).map(|(_, v)| *v) {
            Some("promote") => EventKind::Promote,
            Some("rollback") => EventKind::Rollback,
            Some(other) => {
                return Err(ModelError::NotAnEvent {
                    commit: commit.to_string(),
                    reason: format!("unknown kind `{other}`"),
                });
            }
            None => {
                return Err(ModelError::NotAnEvent {
                    commit: commit.to_string(),
                    reason: "no Regatta-Kind trailer".to_string(),
                });
            }
        };

        let service = Service::parse(get(T_SERVICE)?)?;
        let environment = Environment::parse(get(T_ENVIRONMENT)?)?;
        let image = ImageRef::new(get(T_IMAGE)?, get(T_TAG)?)?;
        let previous_tag = trailers
            .iter()
            .find(|(k, _)| *k == T_PREVIOUS_TAG)
            .map(|(_, v)| v.to_string());
        let source_environment = trailers
            .iter()
            .find(|(k, _)| *k == T_SOURCE_ENV)
            .map(|(_, v)| Environment::parse(v))
            .transpose()?;
        let rollback_target = trailers
            .iter()
            .find(|(k, _)| *k == T_ROLLBACK_TARGET)
            .map(|(_, v)| v.to_string());
        let approval = trailers
            .iter()
            .find(|(k, _)| *k == T_APPROVAL)
            .and_then(|(_, v)| Approval::parse(v))
            .unwrap_or(Approval::NotRequired);
        let actor = get(T_ACTOR)?.to_string();
        let timestamp = OffsetDateTime::parse(get(T_DATE)?, &Rfc3339).map_err(|e| {
            ModelError::NotAnEvent {
                commit: commit.to_string(),
                reason: format!("bad {T_DATE}: {e}"),
            }
        })?;

        Ok(PromotionEvent {
            kind,
            service,
            environment,
            image,
            previous_tag,
            source_environment,
            rollback_target,
            approval,
            actor,
            timestamp,
        })
    }
}

/// Collect `Key: value` trailer lines from a commit message.
///
/// Only lines with our prefix count; anything else in the body is ignored.
fn parse_trailers(message: &str) -> Vec<(&str, &str)> {
    message
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(": ")?;
            if key.starts_with(TRAILER_PREFIX) {
                Some((key, value.trim()))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PromotionEvent {
        PromotionEvent {
            kind: EventKind::Promote,
            service: Service::Catalogue,
            environment: Environment::Prod,
            image: ImageRef::new("registry.example.io/shop/catalogue", "v1.2.3").unwrap(),
            previous_tag: Some("v1.2.2".to_string()),
            source_environment: Some(Environment::Staging),
            rollback_target: None,
            approval: Approval::Granted,
            actor: "ops@bastion".to_string(),
            timestamp: OffsetDateTime::from_unix_timestamp(1_754_000_000).unwrap(),
        }
    }

    #[test]
    fn message_round_trips() {
        let event = sample();
        let msg = event.to_commit_message();
        let parsed = PromotionEvent::parse("deadbeef", &msg).unwrap();
        assert_eq!(parsed.kind, EventKind::Promote);
        assert_eq!(parsed.service, Service::Catalogue);
        assert_eq!(parsed.environment, Environment::Prod);
        assert_eq!(parsed.image, event.image);
        assert_eq!(parsed.previous_tag.as_deref(), Some("v1.2.2"));
        assert_eq!(parsed.source_environment, Some(Environment::Staging));
        assert_eq!(parsed.approval, Approval::Granted);
        assert_eq!(parsed.timestamp, event.timestamp);
    }

    #[test]
    fn prod_message_embeds_rollback_command() {
        let msg = sample().to_commit_message();
        assert!(msg.contains("regatta rollback --service catalogue --env prod --to-tag v1.2.2"));
    }

    #[test]
    fn non_event_commit_is_not_an_event() {
        let err = PromotionEvent::parse("abc", "docs: fix typo\n\nnothing here\n").unwrap_err();
        assert!(matches!(err, ModelError::NotAnEvent { .. }));
    }

    #[test]
    fn rollback_kind_round_trips() {
        let mut event = sample();
        event.kind = EventKind::Rollback;
        event.rollback_target = Some("0123abcd".to_string());
        let parsed = PromotionEvent::parse("feedface", &event.to_commit_message()).unwrap();
        assert_eq!(parsed.kind, EventKind::Rollback);
        assert_eq!(parsed.rollback_target.as_deref(), Some("0123abcd"));
    }

    #[test]
    fn subject_names_kind_service_env_tag() {
        assert_eq!(sample().subject(), "promote(catalogue): prod -> v1.2.3");
    }
}
