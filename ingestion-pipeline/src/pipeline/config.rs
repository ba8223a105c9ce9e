use common::utils::config::AppConfig;

/// Chunking parameters applied to every file of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}
