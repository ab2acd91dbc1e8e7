use clap::Args;
use serde::Serialize;

use crate::Result;
use crate::cli::render::out;
use crate::cli::{Ctx, parse_environment, parse_service};
use crate::model::{Environment, PromotionEvent, Service};
use crate::store::{Publisher, history};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[arg(short = 's', long, value_parser = parse_service)]
    pub service: Option<Service>,

    #[arg(short = 'e', long = "env", alias = "environment", value_parser = parse_environment)]
    pub env: Option<Environment>,

    /// Maximum events to show.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Serialize)]
struct HistoryRow {
    commit: String,
    #[serde(flatten)]
    event: PromotionEvent,
}

pub(crate) fn handle(ctx: &Ctx, args: HistoryArgs) -> Result<()> {
    let repo = ctx.open_repo()?;
    let publisher =
        Publisher::new(&ctx.config.store.branch, &ctx.config.store.remote).load(&repo)?;

    let entries = history::events(
        &repo,
        publisher.head(),
        args.service,
        args.env,
        Some(args.limit),
    )?;

    let rows: Vec<HistoryRow> = entries
        .into_iter()
        .map(|entry| HistoryRow {
            commit: entry.commit.to_string(),
            event: entry.event,
        })
        .collect();

    out(ctx.json, &rows, || {
        if rows.is_empty() {
            return "no promotion events".to_string();
        }
        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let e = &row.event;
            lines.push(format!(
                "{:<10} {:<9} {:<16} {:<8} {:<20} by {}",
                &row.commit[..10.min(row.commit.len())],
                e.kind.as_str(),
                e.service.to_string(),
                e.environment.to_string(),
                e.image.tag,
                e.actor
            ));
        }
        lines.join("\n")
    })
}
