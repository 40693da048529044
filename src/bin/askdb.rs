//! askdb CLI
//!
//! Ask a SQLite database questions in natural language.

use anyhow::Context;
use askdb::otel::{init_tracing, LogFormat};
use askdb::{export, sample, Config, LlmProvider, Pipeline, ResultEnvelope, SchemaIntrospector};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// askdb - natural language questions, SQL answers
#[derive(Parser)]
#[command(name = "askdb")]
#[command(about = "Ask a relational database questions in natural language", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (JSON or YAML)
    #[arg(long, env = "ASKDB_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config and ASKDB_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Model name (overrides config and ASKDB_LLM_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and run the generated SQL
    Ask {
        /// Question in natural language
        question: String,

        /// Also write the rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the full result envelope as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the introspected schema
    Schema,

    /// Print the prompt that would be sent, without calling the model
    Prompt {
        /// Question in natural language
        question: String,
    },

    /// Create the sample store database
    Seed,
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_overrides(env_lookup)?;
            config
        }
        None => Config::from_env()?,
    };

    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
        if config.llm.api_key.is_none() {
            config.llm.api_key = match config.provider() {
                LlmProvider::OpenAI => env_lookup("OPENAI_API_KEY"),
                LlmProvider::Anthropic => env_lookup("ANTHROPIC_API_KEY"),
                LlmProvider::Ollama => None,
            };
        }
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(config.log_format)?;

    match &cli.command {
        Commands::Ask { question, csv, json } => {
            let pipeline = Pipeline::from_config(&config)?;
            let envelope = pipeline.ask(question).await;

            if *json {
                println!("{}", export::to_json(&envelope)?);
            } else {
                render(&envelope);
            }

            if let (Some(path), true) = (csv, envelope.success) {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("cannot create {}", path.display()))?;
                export::to_csv(&envelope, file)?;
                eprintln!("Rows written to {}", path.display());
            }

            Ok(if envelope.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Schema => {
            let schema = SchemaIntrospector::new(config.database_target()).introspect()?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Prompt { question } => {
            let schema = SchemaIntrospector::new(config.database_target()).introspect()?;
            let request = config.prompt_builder()?.build(&schema, question)?;
            println!("{}", request.render());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Seed => {
            let path = config.resolved_database_path();
            if sample::seed(&path)? {
                println!("Sample data written to {}", path.display());
            } else {
                println!("{} already contains sample data", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Print SQL, a text table and a status line.
fn render(envelope: &ResultEnvelope) {
    if let Some(query) = &envelope.query {
        println!("SQL:\n{}\n", query);
    }

    if !envelope.success {
        eprintln!(
            "Error: {}",
            envelope.error.as_deref().unwrap_or("unknown error")
        );
        return;
    }

    let columns = envelope.columns();
    let rows = envelope.rows();
    if columns.is_empty() || rows.is_empty() {
        match envelope.rows_affected {
            Some(n) => println!("OK: {} row(s) affected", n),
            None => println!("OK: query returned no rows"),
        }
        return;
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", line(columns));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in &cells {
        println!("{}", line(row.as_slice()));
    }
    println!("\nOK: {} row(s)", rows.len());
}
