//! Promotion engine integration tests over real git repositories.

mod common;

use common::{FixedProbe, present, seed};

use regatta::Error;
use regatta::model::{Approval, Environment, EventKind, PromotionEvent, Service};
use regatta::ops::promote::{PromoteOutcome, PromoteRequest, promote};
use regatta::ops::{ApprovalMode, OpError, PresetGate};
use regatta::registry::{Probe, RegistryError};

fn request(service: Service, tag: &str, target: Environment) -> PromoteRequest {
    PromoteRequest {
        service,
        tag: tag.to_string(),
        target,
        source: None,
        dry_run: false,
        approval: ApprovalMode::Bypass,
    }
}

#[test]
fn staging_promotion_touches_only_the_pair_record() {
    // Scenario A: catalogue/staging goes v1.2.2 -> v1.2.3.
    let world = seed(&[(Service::Catalogue, Environment::Staging, "v1.2.2")]);
    let before = world.origin_head();

    let outcome = promote(
        &world.repo,
        &world.config,
        &request(Service::Catalogue, "v1.2.3", Environment::Staging),
        &present(),
        &mut PresetGate(true),
    )
    .expect("promote");

    let commit = match outcome {
        PromoteOutcome::Published { commit, .. } => commit,
        other => panic!("expected publish, got {other:?}"),
    };

    assert_ne!(world.origin_head(), before);
    assert_eq!(world.origin_head(), commit);
    assert_eq!(
        world
            .origin_record(Service::Catalogue, Environment::Staging)
            .tag(),
        "v1.2.3"
    );
    // Untouched pair keeps its tag.
    assert_eq!(
        world
            .origin_record(Service::Catalogue, Environment::Prod)
            .tag(),
        common::DEFAULT_TAG
    );
    // Exactly the record and the rollback slot changed.
    assert_eq!(
        world.origin_head_touched_paths(),
        vec![
            ".rollback/catalogue".to_string(),
            "envs/staging/catalogue.yaml".to_string(),
        ]
    );
}

#[test]
fn promotion_event_is_parseable_from_the_published_commit() {
    let world = seed(&[(Service::Voting, Environment::Dev, "v0.9.0")]);

    promote(
        &world.repo,
        &world.config,
        &request(Service::Voting, "v0.9.1", Environment::Dev),
        &present(),
        &mut PresetGate(true),
    )
    .expect("promote");

    let message = world.origin_head_message();
    let event = PromotionEvent::parse("head", &message).expect("event parses");
    assert_eq!(event.kind, EventKind::Promote);
    assert_eq!(event.service, Service::Voting);
    assert_eq!(event.environment, Environment::Dev);
    assert_eq!(event.image.tag, "v0.9.1");
    assert_eq!(event.previous_tag.as_deref(), Some("v0.9.0"));
    assert_eq!(event.approval, Approval::NotRequired);
}

#[test]
fn repromoting_the_current_tag_is_a_noop() {
    let world = seed(&[(Service::Frontend, Environment::Staging, "v2.0.0")]);
    let before = world.origin_head();

    let outcome = promote(
        &world.repo,
        &world.config,
        &request(Service::Frontend, "v2.0.0", Environment::Staging),
        &present(),
        &mut PresetGate(true),
    )
    .expect("promote");

    assert!(matches!(outcome, PromoteOutcome::NoOp { .. }));
    assert_eq!(world.origin_head(), before, "no-op must not publish");
}

#[test]
fn prod_requires_the_tag_to_be_live_in_staging() {
    // Scenario B: staging is at v1.2.2, prod promotion asks for v1.2.3.
    let world = seed(&[(Service::Catalogue, Environment::Staging, "v1.2.2")]);
    let before = world.origin_head();

    let err = promote(
        &world.repo,
        &world.config,
        &request(Service::Catalogue, "v1.2.3", Environment::Prod),
        &present(),
        &mut PresetGate(true),
    )
    .unwrap_err();

    match err {
        Error::Op(OpError::SourceNotValidated {
            service,
            source_env: source,
            requested,
            found,
        }) => {
            assert_eq!(service, Service::Catalogue);
            assert_eq!(source, Environment::Staging);
            assert_eq!(requested, "v1.2.3");
            assert_eq!(found, "v1.2.2");
        }
        other => panic!("expected SourceNotValidated, got {other}"),
    }
    assert_eq!(world.origin_head(), before, "gate must not mutate");
}

#[test]
fn prod_promotion_passes_once_staging_carries_the_tag() {
    let world = seed(&[
        (Service::Catalogue, Environment::Staging, "v1.2.3"),
        (Service::Catalogue, Environment::Prod, "v1.2.2"),
    ]);

    promote(
        &world.repo,
        &world.config,
        &request(Service::Catalogue, "v1.2.3", Environment::Prod),
        &present(),
        &mut PresetGate(true),
    )
    .expect("promote");

    assert_eq!(
        world
            .origin_record(Service::Catalogue, Environment::Prod)
            .tag(),
        "v1.2.3"
    );
    // The prod commit carries the ready-to-paste rollback invocation.
    assert!(
        world
            .origin_head_message()
            .contains("regatta rollback --service catalogue --env prod --to-tag v1.2.2")
    );
}

#[test]
fn prod_approval_refusal_is_terminal() {
    let world = seed(&[
        (Service::Frontend, Environment::Staging, "v3.0.0"),
        (Service::Frontend, Environment::Prod, "v2.0.0"),
    ]);
    let before = world.origin_head();

    let mut req = request(Service::Frontend, "v3.0.0", Environment::Prod);
    req.approval = ApprovalMode::Interactive;

    let err = promote(
        &world.repo,
        &world.config,
        &req,
        &present(),
        &mut PresetGate(false),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Op(OpError::ApprovalDenied { operation: "promotion" })
    ));
    assert_eq!(world.origin_head(), before);
}

#[test]
fn granted_approval_is_recorded_in_the_event() {
    let world = seed(&[
        (Service::Frontend, Environment::Staging, "v3.0.0"),
        (Service::Frontend, Environment::Prod, "v2.0.0"),
    ]);

    let mut req = request(Service::Frontend, "v3.0.0", Environment::Prod);
    req.approval = ApprovalMode::Interactive;

    promote(
        &world.repo,
        &world.config,
        &req,
        &present(),
        &mut PresetGate(true),
    )
    .expect("promote");

    let event = PromotionEvent::parse("head", &world.origin_head_message()).expect("event");
    assert_eq!(event.approval, Approval::Granted);
    assert_eq!(event.source_environment, Some(Environment::Staging));
}

#[test]
fn dev_promotion_needs_no_approval_gate() {
    let world = seed(&[]);

    // Interactive mode with a gate that would refuse: dev never consults it.
    let mut req = request(Service::Voting, "v1.1.0", Environment::Dev);
    req.approval = ApprovalMode::Interactive;

    promote(
        &world.repo,
        &world.config,
        &req,
        &present(),
        &mut PresetGate(false),
    )
    .expect("dev promotion is ungated");
}

#[test]
fn missing_artifact_aborts_before_any_mutation() {
    let world = seed(&[]);
    let before = world.origin_head();

    let err = promote(
        &world.repo,
        &world.config,
        &request(Service::Catalogue, "v9.9.9", Environment::Staging),
        &FixedProbe(Probe::Absent),
        &mut PresetGate(true),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Registry(RegistryError::ArtifactNotFound(_))
    ));
    assert_eq!(world.origin_head(), before);
}

#[test]
fn unverifiable_probe_is_fatal_only_under_strict_policy() {
    let mut world = seed(&[]);

    let unverifiable = FixedProbe(Probe::Unverifiable("tool missing".to_string()));

    // Default policy warns and proceeds.
    promote(
        &world.repo,
        &world.config,
        &request(Service::Voting, "v1.0.1", Environment::Dev),
        &unverifiable,
        &mut PresetGate(true),
    )
    .expect("warn-and-proceed accepts unverified tags");

    world.config.promotion.strictness = regatta::StrictnessPolicy::Strict;
    let err = promote(
        &world.repo,
        &world.config,
        &request(Service::Voting, "v1.0.2", Environment::Dev),
        &unverifiable,
        &mut PresetGate(true),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Registry(RegistryError::ToolUnavailable(_))
    ));
}

#[test]
fn dry_run_stages_but_never_publishes() {
    let world = seed(&[(Service::Catalogue, Environment::Staging, "v1.2.2")]);
    let before = world.origin_head();

    let mut req = request(Service::Catalogue, "v1.2.3", Environment::Staging);
    req.dry_run = true;

    let outcome = promote(
        &world.repo,
        &world.config,
        &req,
        &present(),
        &mut PresetGate(true),
    )
    .expect("dry run");

    match outcome {
        PromoteOutcome::DryRun { event, diff } => {
            assert_eq!(event.image.tag, "v1.2.3");
            let rendered = diff.render();
            assert!(rendered.contains("envs/staging/catalogue.yaml"));
            assert!(rendered.contains("v1.2.2 -> v1.2.3"));
        }
        other => panic!("expected dry run, got {other:?}"),
    }
    assert_eq!(world.origin_head(), before);
    assert_eq!(
        world
            .origin_record(Service::Catalogue, Environment::Staging)
            .tag(),
        "v1.2.2"
    );
}

#[test]
fn empty_tag_is_rejected_as_invalid_input() {
    let world = seed(&[]);
    let err = promote(
        &world.repo,
        &world.config,
        &request(Service::Catalogue, "", Environment::Dev),
        &present(),
        &mut PresetGate(true),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Model(_)));
}
