//! `usersync` command-line interface.
//!
//! Outcomes are written to the output as JSON lines, one per record,
//! followed by a summary line.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::app::{AppError, SyncApp, seed_store};
use crate::domain::{OutcomeSummary, SyncOutcome};
use crate::settings::SyncSettings;

/// `usersync` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "usersync",
    about = "Mirror identity-service users into a reviewable file tree and back",
    version
)]
pub struct Cli {
    /// Root of the exported file tree. Overrides `USERSYNC_ROOT`.
    #[arg(long, value_name = "path", global = true)]
    pub root: Option<PathBuf>,
    /// JSON identity store. Overrides `USERSYNC_STORE`.
    #[arg(long, value_name = "path", global = true)]
    pub store: Option<PathBuf>,
    /// Organisation model: `auto`, `single-select`, or `multi-group`.
    #[arg(long = "organisation-model", value_name = "model", global = true)]
    pub organisation_model: Option<String>,
    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Write every user in the store to the file tree.
    Export,
    /// Apply every document in the file tree to the store.
    Import {
        /// Accepted for compatibility; every document is applied.
        #[arg(long)]
        force: bool,
    },
    /// List documents whose import would change the store.
    Report,
    /// Generate example users into the store and export them.
    Seed {
        /// Seed name from the registry. Overrides `USERSYNC_SEED_NAME`.
        #[arg(long = "seed-name", value_name = "name")]
        seed_name: Option<String>,
    },
}

/// Failures surfaced by [`run`].
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The application failed.
    #[error(transparent)]
    App(#[from] AppError),
    /// Output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryLine<'a> {
    operation: &'a str,
    #[serde(flatten)]
    summary: OutcomeSummary,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply_overrides(&self, mut settings: SyncSettings) -> SyncSettings {
        if let Some(root) = &self.root {
            settings.root = Some(root.clone());
        }
        if let Some(store) = &self.store {
            settings.store = Some(store.clone());
        }
        if let Some(model) = &self.organisation_model {
            settings.organisation_model = Some(model.clone());
        }
        if let Command::Seed {
            seed_name: Some(name),
        } = &self.command
        {
            settings.seed_name = Some(name.clone());
        }
        settings
    }

    fn operation(&self) -> &'static str {
        match &self.command {
            Command::Export => "export",
            Command::Import { .. } => "import",
            Command::Report => "report",
            Command::Seed { .. } => "seed",
        }
    }
}

/// Run the parsed command and write its outcomes to `out`.
///
/// Per-record failures are reported in the output, not as errors.
///
/// # Errors
///
/// Returns [`CliError`] when the store cannot be opened or saved, or the
/// output cannot be written.
pub fn run(
    cli: &Cli,
    settings: &SyncSettings,
    out: &mut impl Write,
) -> Result<OutcomeSummary, CliError> {
    let outcomes = match &cli.command {
        Command::Export => SyncApp::open(settings)?.export(),
        Command::Import { force } => SyncApp::open(settings)?.import(*force)?,
        Command::Report => SyncApp::open(settings)?.report(),
        Command::Seed { .. } => seed_store(settings)?,
    };
    write_outcomes(cli.operation(), &outcomes, out)
}

fn write_outcomes(
    operation: &str,
    outcomes: &[SyncOutcome],
    out: &mut impl Write,
) -> Result<OutcomeSummary, CliError> {
    for outcome in outcomes {
        serde_json::to_writer(&mut *out, outcome).map_err(io::Error::from)?;
        writeln!(out)?;
    }
    let summary = OutcomeSummary::of(outcomes);
    serde_json::to_writer(&mut *out, &SummaryLine { operation, summary })
        .map_err(io::Error::from)?;
    writeln!(out)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    //! Argument parsing and outcome rendering.

    use std::path::Path;

    use rstest::rstest;

    use super::*;
    use crate::domain::ChangeKind;

    #[rstest]
    #[case::export(&["usersync", "export"], Command::Export)]
    #[case::import(&["usersync", "import"], Command::Import { force: false })]
    #[case::forced(&["usersync", "import", "--force"], Command::Import { force: true })]
    #[case::report(&["usersync", "report"], Command::Report)]
    #[case::seed(
        &["usersync", "seed", "--seed-name", "quiet-lantern"],
        Command::Seed { seed_name: Some("quiet-lantern".to_owned()) }
    )]
    fn parses_subcommands(#[case] args: &[&str], #[case] expected: Command) {
        let cli = Cli::try_parse_from(args.iter().copied()).expect("parse");
        assert_eq!(cli.command, expected);
    }

    #[test]
    fn overrides_replace_loaded_settings() {
        let cli = Cli::try_parse_from([
            "usersync",
            "report",
            "--root",
            "/srv/usync",
            "--organisation-model",
            "multi-group",
        ])
        .expect("parse");
        let settings = cli.apply_overrides(SyncSettings {
            root: Some(PathBuf::from("usync")),
            store: Some(PathBuf::from("identity.json")),
            ..SyncSettings::default()
        });

        assert_eq!(settings.root(), PathBuf::from("/srv/usync"));
        assert_eq!(settings.store(), PathBuf::from("identity.json"));
        assert_eq!(settings.organisation_model.as_deref(), Some("multi-group"));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["usersync", "merge"]).is_err());
    }

    #[test]
    fn outcomes_render_as_json_lines() {
        let path = Path::new("usync/User/ada@example-org.config");
        let outcomes = vec![
            SyncOutcome::succeeded("ada@example.org", ChangeKind::Report, path),
            SyncOutcome::failed("grace@example.org", ChangeKind::Report, path, "boom"),
        ];
        let mut out = Vec::new();

        let summary = write_outcomes("report", &outcomes, &mut out).expect("render");

        let text = String::from_utf8(out).expect("utf-8 output");
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["key"], "ada@example.org");
        assert_eq!(lines[1]["message"], "boom");
        assert_eq!(
            lines[2],
            serde_json::json!({ "operation": "report", "total": 2, "succeeded": 1, "failed": 1 })
        );
        assert_eq!(summary.failed, 1);
    }
}
