use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client_sdk::{ClientConfig, RecordClient, RecordStore};
use common::{RecordId, RecordInput};
use sync_core::{DeleteOutcome, SubmitOutcome, Synchronizer};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;
mod shell;

const STATUS_ERROR_MESSAGE: &str = "Failed to check database connection";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "recordsync")]
#[command(about = "Keep a local view of a remote item collection in sync")]
struct Cli {
    #[arg(long, env = "RECORDSYNC_SERVER_URL", default_value = "http://127.0.0.1:8000")]
    server_url: String,
    #[arg(long, default_value = "/items")]
    items_path: String,
    #[arg(long, default_value = "/data")]
    data_path: String,
    #[arg(long, default_value = "/status")]
    status_path: String,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server_url.clone(),
            items_path: self.items_path.clone(),
            data_path: self.data_path.clone(),
            status_path: self.status_path.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    List,
    Get {
        id: RecordId,
    },
    Add {
        title: String,
        description: String,
    },
    /// Fields left out keep their stored value.
    Update {
        id: RecordId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: RecordId,
    },
    Data,
    Status,
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let client = RecordClient::with_config(cli.client_config());
    debug!(base_url = %client.config().base_url, "using record store");

    match cli.command {
        Commands::List => {
            let mut sync = Synchronizer::new(client);
            sync.load().await;
            if let Some(message) = sync.state().error() {
                bail!("{message}");
            }
            print!("{}", render::collection(sync.state()));
        }
        Commands::Get { id } => {
            let record = client
                .get(id)
                .await
                .with_context(|| format!("failed to fetch item {id}"))?;
            println!("{}", render::record_line(&record));
        }
        Commands::Add { title, description } => {
            let mut sync = Synchronizer::new(client);
            let outcome = sync.create(RecordInput::new(title, description)).await;
            report_submit(outcome)?;
        }
        Commands::Update {
            id,
            title,
            description,
        } => {
            let mut sync = Synchronizer::new(client);
            sync.load().await;
            if let Some(message) = sync.state().error() {
                bail!("{message}");
            }
            let Some(record) = sync.state().find(id).cloned() else {
                bail!("no item with id {id}");
            };
            let mut input = record.input();
            if let Some(title) = title {
                input.title = title;
            }
            if let Some(description) = description {
                input.description = description;
            }
            sync.begin_edit(record);
            let outcome = sync.submit_input(input).await;
            report_submit(outcome)?;
        }
        Commands::Delete { id } => {
            let mut sync = Synchronizer::new(client);
            match sync.delete(id).await {
                DeleteOutcome::Deleted => println!("deleted #{id}"),
                DeleteOutcome::Stale => {}
                DeleteOutcome::Failed => bail!("item #{id} was not deleted"),
            }
        }
        Commands::Data => {
            let points = match client.data_points().await {
                Ok(points) => points,
                Err(err) => {
                    tracing::error!(error = %err, "failed to fetch chart data");
                    eprintln!("Failed to fetch chart data");
                    Vec::new()
                }
            };
            print!("{}", render::data_table(&points));
        }
        Commands::Status => match client.status().await {
            Ok(status) => print!("{}", render::status(&status)),
            Err(err) => {
                tracing::error!(error = %err, "error checking connection");
                bail!(STATUS_ERROR_MESSAGE);
            }
        },
        Commands::Shell => {
            let mut sync = Synchronizer::new(client);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            shell::run(&mut sync, stdin, std::io::stdout()).await?;
        }
    }

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn report_submit(outcome: SubmitOutcome) -> Result<()> {
    match outcome {
        SubmitOutcome::Created(record) => println!("created {}", render::record_line(&record)),
        SubmitOutcome::Updated(record) => println!("updated {}", render::record_line(&record)),
        SubmitOutcome::Stale => {}
        SubmitOutcome::Rejected => bail!("{}", render::REQUIRED_FIELDS_MESSAGE),
        SubmitOutcome::Failed => bail!("item was not saved"),
    }
    Ok(())
}
