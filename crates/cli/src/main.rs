use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use aero_agents::{build_controller, AirlineAgent, AppConfig};
use aero_core::{ChatInput, IntentCorpus};
use aero_ml::{IntentModelTrainer, Scorer};
use aero_observability::{init_tracing, AppMetrics};
use aero_routes::{match_airlines, ReferenceTable};
use aero_storage::Store;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "aero")]
#[command(about = "Airline route assistant CLI")]
struct Cli {
    #[arg(long, env = "AERO_INTENTS_PATH", default_value = "data/intents.json")]
    intents: PathBuf,

    #[arg(long, env = "AERO_AIRLINES_PATH", default_value = "data/airlines_reviews.csv")]
    airlines: PathBuf,

    #[arg(
        long,
        env = "AERO_SENTIMENT_PATH",
        default_value = "data/analyzed_sentiment_result.csv"
    )]
    sentiment: PathBuf,

    /// Seeds reply-template selection.
    #[arg(long, env = "AERO_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive conversation; `exit` or `quit` leaves.
    Chat,
    /// Print the intent tag predicted for a message.
    Classify { text: String },
    /// Print the route extracted from a message.
    Route { text: String },
    /// Print the airlines serving the route mentioned in a message.
    Airlines { text: String },
    /// Train the intent model and print the training report.
    Train,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("aero_cli");
    let cli = Cli::parse();
    let config = app_config(&cli);

    match cli.command {
        Command::Chat => run_chat(build_agent(&config).await?).await?,
        Command::Classify { text } => {
            let corpus = IntentCorpus::load_or_empty(&config.intents_path);
            let scorer = IntentModelTrainer::new(config.trainer.clone())
                .build(&corpus.examples())
                .with_context(|| {
                    format!("failed training intent model from {}", config.intents_path.display())
                })?;
            println!("{}", scorer.predict(&text));
        }
        Command::Route { text } => {
            let table = ReferenceTable::load_or_empty(&config.airlines_path);
            let extraction = config.route_extractor(&table).extract(&text);
            if extraction.route.is_empty() {
                println!("no route recognised");
            } else {
                println!("{} ({:?})", extraction.route, extraction.tier);
            }
        }
        Command::Airlines { text } => {
            let table = ReferenceTable::load_or_empty(&config.airlines_path);
            let route = config.route_extractor(&table).extract_route(&text);
            let (route, airlines) = match_airlines(route, &table);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "route": route,
                    "airlines": airlines,
                }))?
            );
        }
        Command::Train => {
            let (_, report) = build_controller(&config, AppMetrics::shared())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn app_config(cli: &Cli) -> AppConfig {
    AppConfig {
        intents_path: cli.intents.clone(),
        airlines_path: cli.airlines.clone(),
        sentiment_path: cli.sentiment.clone(),
        template_seed: cli.seed,
        ..AppConfig::from_env()
    }
}

async fn run_chat(agent: AirlineAgent<Store>) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("Airline assistant. Type 'exit' or 'quit' to leave.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        match agent
            .handle_chat(ChatInput {
                session_id: session_id.clone(),
                text: message.to_string(),
            })
            .await
        {
            Ok(reply) => {
                session_id = Some(reply.session_id);
                println!("\n{}\n", reply.message);
            }
            Err(err) => eprintln!("\nerror: {err:#}\n"),
        }
    }

    Ok(())
}

async fn build_agent(config: &AppConfig) -> Result<AirlineAgent<Store>> {
    let metrics = AppMetrics::shared();
    let (controller, _) = build_controller(config, metrics.clone())?;
    let store = Store::from_database_url(config.database_url.as_deref()).await?;

    Ok(AirlineAgent::new(Arc::new(controller), Arc::new(store), metrics)
        .with_session_ttl(config.session_ttl()))
}
