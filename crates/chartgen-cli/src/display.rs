//! Display formatting for generation reports
//!
//! Human-readable output goes through [`print_report`]; `--json` output is
//! built by [`report_json`] so both views list the same facts.

use chartgen_extract::{ExternalFile, GenerationReport, HandledResource};
use console::style;
use serde_json::json;

use crate::util::{count, format_size, short_checksum};

/// Print a report for humans
pub fn print_report(report: &GenerationReport) {
    for handled in &report.handled {
        print_handled(handled);
    }

    for key in &report.unhandled {
        println!(
            "{} {}  {}",
            style("⚠").yellow(),
            key,
            style("no strategy, skipped").dim()
        );
    }

    if !report.files.is_empty() {
        println!();
        println!(
            "{}",
            style(format!("External files ({})", report.files.len())).cyan().bold()
        );
        for file in &report.files {
            print_file(file);
        }
    }

    println!();
    println!(
        "{} {} handled, {} unhandled, {}",
        style("Summary:").bold(),
        report.handled.len(),
        report.unhandled.len(),
        count(report.files.len(), "external file", "external files")
    );
}

fn print_handled(handled: &HandledResource) {
    let result = &handled.result;
    println!(
        "{} {}  {}",
        style("✓").green(),
        style(&handled.resource).bold(),
        style(format!("[{}]", handled.strategy)).dim()
    );
    println!("    template:   {}", result.template_path);
    if !result.values_path.is_empty() {
        println!("    values:     .Values.{}", result.values_path.join("."));
    }
    for dependency in &result.dependencies {
        println!("    depends on: {}", dependency);
    }
    for path in &result.external_files {
        println!("    file:       {}", path);
    }
}

fn print_file(file: &ExternalFile) {
    println!(
        "  {}  {}  {}  {}",
        file.path,
        style(file.kind).dim(),
        format_size(file.content.len()),
        style(format!("sha256:{}", short_checksum(&file.checksum))).dim()
    );
}

/// Machine-readable rendition of a report
pub fn report_json(report: &GenerationReport) -> serde_json::Value {
    json!({
        "handled": report.handled.iter().map(|handled| {
            let result = &handled.result;
            json!({
                "resource": handled.resource.to_string(),
                "strategy": handled.strategy,
                "serviceName": result.service_name,
                "templatePath": result.template_path,
                "valuesPath": result.values_path,
                "dependencies": result.dependencies.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "externalFiles": result.external_files,
                "metadata": result.metadata,
            })
        }).collect::<Vec<_>>(),
        "unhandled": report.unhandled.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "files": report.files.iter().map(|file| {
            json!({
                "path": file.path,
                "kind": file.kind,
                "size": file.content.len(),
                "checksum": file.checksum,
                "sourceResource": file.source_resource,
                "sourceField": file.source_field,
            })
        }).collect::<Vec<_>>(),
        "values": report.values(),
    })
}
