//! Behaviour tests for the architecture guardrails.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

use std::fs;
use std::path::PathBuf;

use architecture_lint::{ArchitectureLintError, LintSource, Violation};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum LintOutcome {
    Passed,
    Violations(Vec<Violation>),
}

#[derive(Default, ScenarioState)]
struct World {
    sources: Slot<Vec<LintSource>>,
    outcome: Slot<LintOutcome>,
}

impl World {
    fn add_source(&self, file: &str, contents: &str) {
        let mut sources = self.sources.get().unwrap_or_default();
        sources.push(LintSource {
            file: PathBuf::from(file),
            contents: contents.to_owned(),
        });
        self.sources.set(sources);
    }

    fn outcome(&self) -> LintOutcome {
        self.outcome.get().expect("lint must have run")
    }

    fn violations(&self) -> Vec<Violation> {
        match self.outcome() {
            LintOutcome::Violations(violations) => violations,
            LintOutcome::Passed => panic!("expected violations, the lint passed"),
        }
    }

    fn assert_violation(&self, expected_file: &str, expected_substring: &str) {
        let expected_file = PathBuf::from(expected_file);
        let violations = self.violations();
        assert!(
            violations.iter().any(|violation| {
                violation.file == expected_file && violation.message.contains(expected_substring)
            }),
            "expected violation in '{expected_file:?}' containing '{expected_substring}', got: {violations:?}"
        );
    }
}

#[fixture]
fn world() -> World {
    World::default()
}

fn add_valid_modules(world: &World) {
    world.add_source(
        "domain/user.rs",
        "pub struct UserId(String); impl UserId { pub fn new(v: &str) -> Self { Self(v.to_owned()) } }",
    );
    world.add_source(
        "domain/orchestrator.rs",
        "use std::sync::Arc; use tracing::info; use crate::domain::ports::SyncFileStore; pub struct Orchestrator(Arc<dyn SyncFileStore>); fn log() { info!(\"ok\"); }",
    );
    world.add_source(
        "inbound/cli.rs",
        "use clap::Parser; use crate::app::SyncApp; use crate::domain::user::UserId; fn run() { let _ = UserId::new(\"ok\"); }",
    );
    world.add_source(
        "outbound/filesystem.rs",
        "use cap_std::fs::Dir; use camino::Utf8Path; use crate::domain::ports::SyncFileStore; pub struct Store;",
    );
}

#[given("valid domain, inbound, and outbound modules")]
fn valid_modules(world: &World) {
    add_valid_modules(world);
}

#[given("an inbound module that imports the outbound layer")]
fn inbound_imports_outbound(world: &World) {
    world.add_source(
        "inbound/cli.rs",
        "use usersync::outbound::json_store::JsonIdentityStore; fn run() { let _ = JsonIdentityStore::open; }",
    );
}

#[given("an inbound module that imports cap-std directly")]
fn inbound_imports_cap_std(world: &World) {
    world.add_source(
        "inbound/cli.rs",
        "use cap_std::fs::Dir; fn run() {}",
    );
}

#[given("a domain module that imports clap")]
fn domain_imports_clap(world: &World) {
    world.add_source(
        "domain/serializer.rs",
        "use clap::Parser; #[derive(Parser)] struct Args;",
    );
}

#[given("a domain module that calls std::fs")]
fn domain_calls_std_fs(world: &World) {
    world.add_source(
        "domain/serializer.rs",
        "fn load() { let _ = std::fs::read_to_string(\"users.usync\"); }",
    );
}

#[given("an outbound module that imports the inbound layer")]
fn outbound_imports_inbound(world: &World) {
    world.add_source(
        "outbound/bad_cross_boundary.rs",
        "use crate::inbound::cli; fn run() { let _ = 1; }",
    );
}

#[given("valid modules mixed with multiple boundary violations")]
fn valid_modules_with_multiple_violations(world: &World) {
    add_valid_modules(world);
    world.add_source(
        "inbound/bad_cross_boundary.rs",
        "use crate::outbound::FilesystemSyncStore; fn run() { let _ = FilesystemSyncStore::new(); }",
    );
    world.add_source(
        "domain/bad.rs",
        "use ortho_config::OrthoConfig; fn load() {}",
    );
}

#[when("the architecture lint runs")]
fn run_architecture_lint(world: &World) {
    let sources = world.sources.get().unwrap_or_default();

    let temp_dir = TempDir::new().expect("tempdir");
    let crate_dir = temp_dir.path().join("usersync");
    let src_dir = crate_dir.join("src");
    for source in &sources {
        let path = src_dir.join(&source.file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, &source.contents).expect("write source file");
    }

    let outcome = match architecture_lint::lint_usersync_sources(&crate_dir) {
        Ok(()) => LintOutcome::Passed,
        Err(ArchitectureLintError::Violations(violations)) => LintOutcome::Violations(violations),
        Err(other) => panic!("expected violations error, got: {other:?}"),
    };
    world.outcome.set(outcome);
}

#[then("the lint succeeds")]
fn lint_succeeds(world: &World) {
    let outcome = world.outcome();
    assert!(
        matches!(outcome, LintOutcome::Passed),
        "expected success, got: {outcome:?}"
    );
}

#[then("the lint fails")]
fn lint_fails(world: &World) {
    let outcome = world.outcome();
    assert!(
        matches!(outcome, LintOutcome::Violations(_)),
        "expected failure, got: {outcome:?}"
    );
}

#[then("the lint fails due to outbound access from inbound")]
fn lint_fails_due_to_outbound_access(world: &World) {
    world.assert_violation("inbound/cli.rs", "crate::outbound");
}

#[then("the lint fails due to filesystem crate usage")]
fn lint_fails_due_to_filesystem_crate(world: &World) {
    world.assert_violation("inbound/cli.rs", "external crate `cap_std`");
}

#[then("the lint fails due to CLI crate usage in the domain")]
fn lint_fails_due_to_cli_crate(world: &World) {
    world.assert_violation("domain/serializer.rs", "external crate `clap`");
}

#[then("the lint fails due to std::fs usage in the domain")]
fn lint_fails_due_to_std_fs(world: &World) {
    world.assert_violation("domain/serializer.rs", "std::fs");
}

#[then("the lint fails due to inbound access from outbound")]
fn lint_fails_due_to_inbound_access(world: &World) {
    world.assert_violation("outbound/bad_cross_boundary.rs", "crate::inbound");
}

#[then("all boundary violations are reported")]
fn all_boundary_violations_are_reported(world: &World) {
    let violations = world.violations();
    assert_eq!(violations.len(), 2, "got: {violations:?}");
    world.assert_violation("inbound/bad_cross_boundary.rs", "crate::outbound");
    world.assert_violation("domain/bad.rs", "external crate `ortho_config`");
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Valid modules pass the lint"
)]
fn valid_modules_pass(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Inbound code may not reach the outbound layer"
)]
fn inbound_may_not_reach_outbound(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Inbound code may not open files directly"
)]
fn inbound_may_not_open_files(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Domain code may not depend on the CLI crate"
)]
fn domain_may_not_depend_on_cli(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Domain code may not touch the filesystem"
)]
fn domain_may_not_touch_filesystem(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Outbound code may not reach the inbound layer"
)]
fn outbound_may_not_reach_inbound(world: World) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Every violation is reported"
)]
fn every_violation_is_reported(world: World) {
    let _ = world;
}
