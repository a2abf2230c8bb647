use activity_etl::core::ConfigProvider;
use activity_etl::utils::error::ErrorSeverity;
use activity_etl::utils::{logger, validation::Validate};
use activity_etl::{CleanerPipeline, CliConfig, EtlEngine, LocalStorage, Result, TomlConfig};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting activity-etl");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let result = match cli.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(&path) {
                Ok(config) => {
                    tracing::info!("Pipeline: {}", config.pipeline.name);
                    run(config).await
                }
                Err(e) => Err(e),
            }
        }
        None => run(cli).await,
    };

    match result {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ Cleaned dataset saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::High => 1,     // data could not be processed
                ErrorSeverity::Medium => 2,   // configuration
                ErrorSeverity::Critical => 3, // file system
            };
            std::process::exit(exit_code);
        }
    }
}

async fn run<C: ConfigProvider + Validate>(config: C) -> Result<String> {
    config.validate()?;
    tracing::info!(
        "Input: {}, output: {}",
        config.input_path(),
        config.output_path()
    );

    let storage = LocalStorage::default();
    let pipeline = CleanerPipeline::new(storage, config);
    EtlEngine::new(pipeline).run().await
}
