use crate::core::codec::{parse_csv_records, write_tsv};
use crate::core::rules::RowTransformer;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{RowOutcome, TransformStats};
use crate::utils::error::Result;

/// Reads the activity CSV, keeps and enriches the rows that pass the
/// cleaning rules, and writes them back as TSV.
pub struct CleanerPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    transformer: RowTransformer,
}

impl<S: Storage, C: ConfigProvider> CleanerPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let transformer = RowTransformer::new(config.rules());
        Self {
            storage,
            config,
            transformer,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CleanerPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading input from: {}", self.config.input_path());
        let bytes = self.storage.read_file(self.config.input_path()).await?;
        tracing::debug!("Read {} bytes", bytes.len());

        parse_csv_records(&bytes)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let mut stats = TransformStats::default();
        let mut processed_records = Vec::new();

        for (index, record) in data.into_iter().enumerate() {
            let outcome = self.transformer.process(record);
            stats.record(&outcome);

            match outcome {
                RowOutcome::Retained(record) => processed_records.push(record),
                RowOutcome::Dropped(reason) => {
                    tracing::debug!("Dropping data row {}: {}", index + 1, reason);
                }
            }
        }

        let tsv_output = write_tsv(&processed_records)?;

        Ok(TransformResult {
            processed_records,
            tsv_output,
            stats,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = self.config.output_path().to_string();

        if result.processed_records.is_empty() {
            tracing::warn!("No rows passed the filters; writing an empty output file");
        }

        tracing::debug!(
            "Writing {} rows ({} bytes) to storage",
            result.processed_records.len(),
            result.tsv_output.len()
        );
        self.storage
            .write_file(&output_path, result.tsv_output.as_bytes())
            .await?;

        Ok(output_path)
    }
}
