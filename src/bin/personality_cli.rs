//! Command-line front end for the prediction service.
//!
//! Collects input, validates it against the feature schema locally, then
//! calls the service and prints or saves the result.

use anyhow::Context;
use clap::{Parser, Subcommand};
use personality_api::batch::CsvTable;
use personality_api::client::PredictionClient;
use personality_api::models::PersonalityRecord;
use personality_api::preprocessing::preprocess;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "personality-cli")]
#[command(about = "Predict introvert/extrovert personality types via the prediction API")]
struct Args {
    /// Base URL of the prediction service
    #[arg(long, env = "PREDICTION_API_URL", default_value = "http://localhost:8000")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the service is up
    Health,
    /// Predict a single person's personality type
    Predict {
        /// Average hours per day spent alone
        #[arg(long)]
        time_spent_alone: String,
        /// Stage fear (Yes/No)
        #[arg(long)]
        stage_fear: String,
        /// Social events attended
        #[arg(long)]
        social_event_attendance: String,
        /// Enjoyment of going outside (0-10)
        #[arg(long)]
        going_outside: String,
        /// Drained after socializing (Yes/No)
        #[arg(long)]
        drained_after_socializing: String,
        /// Number of close friends
        #[arg(long)]
        friends_circle_size: String,
        /// Social media posts per period
        #[arg(long)]
        post_frequency: String,
    },
    /// Predict every row of a CSV file
    PredictCsv {
        /// CSV file with the seven feature columns
        #[arg(long)]
        input: PathBuf,
        /// Where to save the annotated file
        #[arg(long, default_value = "predictions.csv")]
        output: PathBuf,
        /// Number of result rows to print
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let client = PredictionClient::new(&args.url, Duration::from_secs(args.timeout))?;

    match args.command {
        Commands::Health => {
            let message = client.root().await?;
            let status = client.health().await?;
            println!("{} ({})", message, status);
        }
        Commands::Predict {
            time_spent_alone,
            stage_fear,
            social_event_attendance,
            going_outside,
            drained_after_socializing,
            friends_circle_size,
            post_frequency,
        } => {
            let raw: Map<String, Value> = [
                ("Time_spent_Alone", time_spent_alone),
                ("Stage_fear", stage_fear),
                ("Social_event_attendance", social_event_attendance),
                ("Going_outside", going_outside),
                ("Drained_after_socializing", drained_after_socializing),
                ("Friends_circle_size", friends_circle_size),
                ("Post_frequency", post_frequency),
            ]
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value)))
            .collect();

            let row = preprocess(&raw).context("invalid input")?;
            let record = PersonalityRecord::from_features(&row)
                .context("preprocessed row has invalid yes/no encoding")?;

            let personality = client.predict(&record).await?;
            println!("Predicted personality: {}", personality);
        }
        Commands::PredictCsv {
            input,
            output,
            preview,
        } => {
            let contents = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;

            // Fail fast on files the service would reject anyway
            let table = CsvTable::parse(&contents).context("invalid CSV file")?;
            table.features().context("invalid CSV file")?;
            println!("Uploading {} rows from {}", table.len(), input.display());

            let file_name = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.csv".to_string());
            let annotated = client.predict_csv(&file_name, contents).await?;

            std::fs::write(&output, &annotated)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Saved predictions to {}", output.display());

            print_preview(&annotated, preview)?;
        }
    }

    Ok(())
}

/// Prints the header and the first `rows` data rows of a CSV file.
fn print_preview(csv_bytes: &[u8], rows: usize) -> anyhow::Result<()> {
    if rows == 0 {
        return Ok(());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(csv_bytes);
    for record in reader.records().take(rows + 1) {
        let record = record.context("service returned malformed CSV")?;
        println!("{}", record.iter().collect::<Vec<_>>().join(" | "));
    }
    Ok(())
}
