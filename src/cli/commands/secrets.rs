use clap::{Args, Subcommand};
use serde::Serialize;

use crate::Result;
use crate::cli::render::out;
use crate::cli::{Ctx, parse_environment, parse_service, validation};
use crate::model::{Environment, Service};
use crate::secrets::{
    SecretSynchronizer, StdinPrompt, SyncMode, ValueSource, VaultCliBackend, WriteResult,
};

#[derive(Subcommand, Debug)]
pub enum SecretsCmd {
    /// Write service/environment secret bundles into the backend.
    Sync(SyncArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[arg(short = 'e', long = "env", alias = "environment", value_parser = parse_environment)]
    pub env: Environment,

    /// Limit to one service (default: all).
    #[arg(short = 's', long, value_parser = parse_service)]
    pub service: Option<Service>,

    /// Prompt for each field (the default).
    #[arg(long, conflicts_with_all = ["from_env", "dry_run"])]
    pub interactive: bool,

    /// Resolve fields from REGATTA_SECRET_* variables, no prompts.
    #[arg(long = "from-env", conflicts_with = "dry_run")]
    pub from_env: bool,

    /// Resolve and report with redacted values; write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
struct SyncRow {
    service: Service,
    category: String,
    path: String,
    fields: Vec<String>,
    written: bool,
}

pub(crate) fn handle(ctx: &Ctx, cmd: SecretsCmd) -> Result<()> {
    match cmd {
        SecretsCmd::Sync(args) => handle_sync(ctx, args),
    }
}

fn handle_sync(ctx: &Ctx, args: SyncArgs) -> Result<()> {
    let mode = if args.dry_run {
        SyncMode::DryRun
    } else if args.from_env {
        SyncMode::FromEnv
    } else {
        SyncMode::Interactive
    };

    let catalog = ctx.config.secrets.catalog();
    if catalog.is_empty() {
        return Err(validation(
            "secrets",
            "secret catalog is empty; configure [secrets.catalog]".to_string(),
        ));
    }

    let backend = VaultCliBackend::new();
    let synchronizer = SecretSynchronizer::new(&backend, &catalog, &ctx.config.secrets.mount);
    let results = synchronizer.sync(args.env, args.service, mode, &mut StdinPrompt)?;

    let rows: Vec<SyncRow> = results.iter().map(row_for).collect();
    out(ctx.json, &rows, || {
        let mut lines = Vec::with_capacity(rows.len());
        for result in &results {
            let fields: Vec<String> = result
                .fields
                .iter()
                .map(|f| format!("{}={}", f.name, redacted_source(f.source)))
                .collect();
            let verb = if result.written { "wrote" } else { "planned" };
            lines.push(format!("{verb} {}: {}", result.path, fields.join(" ")));
        }
        lines.join("\n")
    })
}

fn row_for(result: &WriteResult) -> SyncRow {
    SyncRow {
        service: result.service,
        category: result.category.clone(),
        path: result.path.clone(),
        fields: result
            .fields
            .iter()
            .map(|f| format!("{}={}", f.name, redacted_source(f.source)))
            .collect(),
        written: result.written,
    }
}

/// Reports name the source, never the value.
fn redacted_source(source: ValueSource) -> &'static str {
    match source {
        ValueSource::Prompt => "********(prompt)",
        ValueSource::Env => "********(env)",
        ValueSource::Generated => "********(generated)",
    }
}
