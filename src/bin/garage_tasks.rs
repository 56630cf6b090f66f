//! # Garage Tasks CLI
//!
//! Trigger a workflow and print its audit trail, or inspect cars and tasks.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use garage_tasks::config::GarageConfig;
use garage_tasks::constants::workflow_names::PROBLEM_ARG;
use garage_tasks::logging::init_structured_logging;
use garage_tasks::models::Page;
use garage_tasks::orchestration::GarageSystem;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "garage-tasks")]
#[command(about = "Run garage workflows as background step pipelines")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (default: config/garage.toml or $GARAGE_CONFIG_PATH)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trigger a workflow, wait for it and print the task with its messages
    Run {
        /// check, send_for_repair or send_to_parking
        workflow: String,

        car_id: String,

        /// Problem to record (send_for_repair only)
        #[arg(short, long)]
        problem: Option<String>,

        /// Return right after the task is created
        #[arg(long)]
        no_wait: bool,
    },

    /// List cars known to the garage
    Cars,

    /// List tasks
    Tasks {
        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// List audit messages of every task
    Messages {
        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GarageConfig::load_from(path),
        None => GarageConfig::load(),
    }
    .context("failed to load configuration")?;

    init_structured_logging(&config.logging);

    let system = GarageSystem::bootstrap(config)
        .await
        .context("failed to bootstrap garage task engine")?;
    let service = system.service();

    match cli.command {
        Commands::Run {
            workflow,
            car_id,
            problem,
            no_wait,
        } => {
            let mut extra_args = HashMap::new();
            if let Some(problem) = problem {
                extra_args.insert(PROBLEM_ARG.to_string(), problem);
            }
            let task = service
                .trigger_workflow(&workflow, &car_id, &extra_args)
                .await?;
            if no_wait {
                print_json(&task)?;
            } else {
                system.shutdown().await;
                print_json(&service.task(task.task_id).await?)?;
            }
        }
        Commands::Cars => print_json(&service.cars().await?)?,
        Commands::Tasks { offset, limit } => {
            print_json(&service.tasks(Page::new(offset, limit)).await?)?
        }
        Commands::Messages { offset, limit } => {
            print_json(&service.messages(Page::new(offset, limit)).await?)?
        }
    }

    system.shutdown().await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
