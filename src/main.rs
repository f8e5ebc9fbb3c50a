use clap::{Parser, Subcommand};
use tracing::{error, info};

use weather_pipeline::config::{AppConfig, ConfigValue};
use weather_pipeline::logging;
use weather_pipeline::pipeline::runner::{RunOutcome, WeatherPipeline};
use weather_pipeline::pipeline::storage::sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "weather_pipeline")]
#[command(about = "Scheduled weather observation pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full pipeline pass (invoked daily by the scheduler)
    Run {
        /// Override the configured country list (comma-separated)
        #[arg(long)]
        countries: Option<String>,
        /// Override the configured city list (comma-separated)
        #[arg(long)]
        cities: Option<String>,
    },
    /// Create the weather schema in the configured database
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { countries, cities } => {
            let mut config = AppConfig::from_env()?;
            if let Some(countries) = countries {
                config.country_names = ConfigValue::parse(&countries);
            }
            if let Some(cities) = cities {
                config.city_names = ConfigValue::parse(&cities);
            }

            println!("🌦  Running weather pipeline...");
            let pipeline = WeatherPipeline::from_config(config)?;
            match pipeline.run().await {
                RunOutcome::Success(summary) => {
                    info!("Pipeline finished");
                    println!("\n📊 Pipeline results:");
                    println!("   Country codes: {:?}", summary.country_codes);
                    println!("   Cities located: {}", summary.cities_located);
                    println!("   Records fetched: {}", summary.records_fetched);
                    println!("   Records loaded: {}", summary.records_loaded);
                    println!("✅ {}", summary.message);
                }
                RunOutcome::Failed { stage, report } => {
                    error!("Pipeline failed at stage {}: {}", stage, report.message);
                    println!("❌ Pipeline failed at stage {}: {}", stage, report.message);
                    std::process::exit(1);
                }
            }
        }
        Commands::InitDb => {
            let config = AppConfig::from_env()?;
            SqliteStore::open(&config.database_path)?;
            println!("✅ Weather schema ready at {}", config.database_path);
        }
    }

    Ok(())
}
