//! CLI commands

pub mod extract;
pub mod structure;

use chartgen_core::{CoreError, GeneratorConfig, Value, manifest};
use chartgen_extract::{GenerationReport, Generator};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Generator settings shared by every command; flags override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct GeneratorArgs {
    /// Generator configuration file (YAML)
    #[arg(short, long, env = "CHARTGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Size in bytes from which values are externalized
    #[arg(short, long)]
    pub threshold: Option<usize>,

    /// Chart name used in template helpers
    #[arg(long)]
    pub chart_name: Option<String>,

    /// Directory for external files, relative to the chart root
    #[arg(long)]
    pub files_dir: Option<String>,
}

impl GeneratorArgs {
    /// Resolve the effective configuration
    pub fn load_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load_from(path).map_err(|err| match err {
                CoreError::Io(io) => CliError::Io {
                    message: format!("{}: {}", path.display(), io),
                },
                other => CliError::config(format!("{}: {}", path.display(), other)),
            })?,
            None => GeneratorConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(chart_name) = &self.chart_name {
            config.chart_name = chart_name.clone();
        }
        if let Some(files_dir) = &self.files_dir {
            config.files_dir = files_dir.clone();
        }

        config.validate().map_err(|err| CliError::config(err.to_string()))?;
        tracing::debug!(?config, "effective configuration");
        Ok(config)
    }
}

/// Load every document of every manifest, in argument order
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for path in paths {
        let loaded = load_manifest(path)?;
        tracing::debug!(path = %path.display(), documents = loaded.len(), "manifest loaded");
        documents.extend(loaded);
    }
    Ok(documents)
}

fn load_manifest(path: &Path) -> Result<Vec<Value>> {
    manifest::load_file(path).map_err(|err| CliError::manifest(path, err))
}

/// Run the generator over the given manifests
pub fn generate(paths: &[PathBuf], args: &GeneratorArgs) -> Result<GenerationReport> {
    let config = args.load_config()?;
    let documents = load_documents(paths)?;
    Ok(Generator::new(config).run(documents)?)
}
