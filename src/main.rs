use chrono::{DateTime, Utc};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payrec::application::engine::ReconciliationEngine;
use payrec::domain::state::{ActualState, DesiredState, PaymentStatus};
use payrec::infrastructure::in_memory::{InMemoryPartnerProvider, InMemoryUserProvider};
use payrec::interfaces::csv::report_writer::ReportWriter;
use payrec::interfaces::csv::state_reader::DesiredStateReader;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Replays a CSV of desired-state declarations against simulated payment
/// providers and reports the resulting observed state.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input declarations CSV file
    input: PathBuf,

    /// Emit the final state as JSON instead of CSV
    #[arg(long)]
    json: bool,

    /// Also report per-command outcomes
    #[arg(long)]
    commands: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = DesiredStateReader::new(file);

    let mut engine: Option<ReconciliationEngine<InMemoryUserProvider, InMemoryPartnerProvider>> =
        None;
    let mut executed = Vec::new();

    for declaration in reader.declarations() {
        let desired = declaration?;
        let engine = engine.get_or_insert_with(|| {
            ReconciliationEngine::new(
                seed_state(&desired),
                InMemoryUserProvider::new(),
                InMemoryPartnerProvider::new(),
            )
        });

        let plan = engine.generate_resolution(&desired).await?;
        tracing::info!(
            declaration = %desired.id,
            commands = plan.len(),
            "executing resolution"
        );
        let (cmds, errs) = engine.run(plan).await;
        for err in &errs {
            tracing::warn!("command failed: {err}");
        }
        executed.extend(cmds);
    }

    let Some(engine) = engine else {
        tracing::info!("no declarations in input");
        return Ok(());
    };

    let state = engine.current_state().await;
    let stdout = io::stdout();
    if cli.json {
        serde_json::to_writer_pretty(stdout.lock(), &state).into_diagnostic()?;
        println!();
    } else {
        let mut writer = ReportWriter::new(stdout.lock());
        writer.write_state(&state)?;
        if cli.commands {
            writer.write_commands(&executed)?;
        }
    }

    Ok(())
}

/// A zeroed observed state for the relationship named by the first
/// declaration, dated far enough back that any declaration applies.
fn seed_state(first: &DesiredState) -> ActualState {
    ActualState {
        record: DesiredState {
            id: Uuid::new_v4(),
            external_id: first.external_id,
            user_id: first.user_id,
            partner_id: first.partner_id,
            date: DateTime::<Utc>::MIN_UTC,
            bucket: first.bucket.clone(),
            amount: 0,
            authorized_amount: 0,
            partner_amount: 0,
        },
        status: PaymentStatus::Complete,
    }
}
