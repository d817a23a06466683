//! Extract command - run the strategies over manifests and report the result

use console::style;
use std::path::PathBuf;

use super::{GeneratorArgs, generate};
use crate::display::{print_report, report_json};
use crate::error::{CliError, Result};

pub fn run(manifests: &[PathBuf], args: &GeneratorArgs, json_output: bool, strict: bool) -> Result<()> {
    if !json_output {
        println!(
            "{} Extracting from {} manifest(s)",
            style("→").blue(),
            manifests.len()
        );
        println!();
    }

    let report = generate(manifests, args)?;

    if json_output {
        let output = serde_json::to_string_pretty(&report_json(&report))
            .map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", output);
    } else {
        print_report(&report);
    }

    if strict && !report.unhandled.is_empty() {
        return Err(CliError::Unhandled {
            count: report.unhandled.len(),
        });
    }

    Ok(())
}
