use clap::Args;
use serde::Serialize;

use crate::Result;
use crate::cli::render::out;
use crate::cli::{Ctx, parse_environment, parse_service};
use crate::model::{Environment, SERVICES, Service};
use crate::store::{Publisher, StoreError};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Limit to one service.
    #[arg(short = 's', long, value_parser = parse_service)]
    pub service: Option<Service>,

    /// Limit to one environment.
    #[arg(short = 'e', long = "env", alias = "environment", value_parser = parse_environment)]
    pub env: Option<Environment>,
}

#[derive(Serialize)]
struct StatusRow {
    service: Service,
    environment: Environment,
    /// None for pairs not yet onboarded.
    tag: Option<String>,
    repository: Option<String>,
}

pub(crate) fn handle(ctx: &Ctx, args: StatusArgs) -> Result<()> {
    let repo = ctx.open_repo()?;
    let publisher =
        Publisher::new(&ctx.config.store.branch, &ctx.config.store.remote).load(&repo)?;

    let services: Vec<Service> = match args.service {
        Some(s) => vec![s],
        None => SERVICES.to_vec(),
    };
    let environments: Vec<Environment> = match args.env {
        Some(e) => vec![e],
        None => Environment::all().to_vec(),
    };

    let mut rows = Vec::new();
    for &service in &services {
        for &environment in &environments {
            match publisher.record(&repo, service, environment) {
                Ok(record) => rows.push(StatusRow {
                    service,
                    environment,
                    tag: Some(record.image.tag.clone()),
                    repository: Some(record.image.repository.clone()),
                }),
                Err(StoreError::MissingRecord { .. }) => rows.push(StatusRow {
                    service,
                    environment,
                    tag: None,
                    repository: None,
                }),
                Err(e) => return Err(e.into()),
            }
        }
    }

    out(ctx.json, &rows, || {
        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            lines.push(format!(
                "{:<16} {:<8} {}",
                row.service.to_string(),
                row.environment.to_string(),
                row.tag.as_deref().unwrap_or("-")
            ));
        }
        lines.join("\n")
    })
}
