use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Runs extract, transform and load once. Returns the output path.
    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process");

        tracing::info!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", raw_data.len());

        tracing::info!("Transforming data...");
        let transformed_result = self.pipeline.transform(raw_data).await?;
        let stats = transformed_result.stats;
        tracing::info!(
            "Retained {} of {} records (dropped: {} invalid email, {} not attended)",
            stats.rows_retained,
            stats.rows_read,
            stats.dropped_invalid_email,
            stats.dropped_not_attended
        );

        tracing::info!("Loading data...");
        let output_path = self.pipeline.load(transformed_result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
