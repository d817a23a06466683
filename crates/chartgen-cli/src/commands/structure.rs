//! Structure command - print the proposed metadata tree of external files

use std::path::PathBuf;

use super::{GeneratorArgs, generate};
use crate::error::{CliError, Result};

pub fn run(manifests: &[PathBuf], args: &GeneratorArgs) -> Result<()> {
    let report = generate(manifests, args)?;

    if report.structure.is_empty() {
        tracing::info!("no values were externalized");
        println!("{{}}");
        return Ok(());
    }

    let yaml = serde_yaml::to_string(&report.structure).map_err(|e| CliError::internal(e.to_string()))?;
    print!("{}", yaml);
    Ok(())
}
