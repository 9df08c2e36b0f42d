//! webstract - Fast baseprint converter

use std::process::ExitCode;

use clap::Parser;

use webstract::{ConversionConfig, PlainFormatter, convert_file, rendered_references};

#[derive(Parser)]
#[command(name = "webstract")]
#[command(version, about = "Fast baseprint converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    webstract article.xml article.json    Convert JATS XML to webstract JSON
    webstract -i article.xml              Show article metadata")]
struct Cli {
    /// Input JATS XML file
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output JSON file
    #[arg(value_name = "OUTPUT", required_unless_present = "info")]
    output: Option<String>,

    /// Show article metadata without converting
    #[arg(short, long)]
    info: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.info {
        match show_info(&cli.input) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        }
    } else {
        let output = cli.output.expect("output required");
        match convert(&cli.input, &output, cli.quiet) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        }
    }
}

fn show_info(path: &str) -> Result<(), String> {
    let conversion =
        convert_file(path, &ConversionConfig::default()).map_err(|e| e.to_string())?;
    let doc = &conversion.document;

    println!("File: {path}");
    println!("Title: {}", webstract::model::plain_text(&doc.title));
    if !doc.contributors.is_empty() {
        let names: Vec<String> = doc
            .contributors
            .iter()
            .map(|c| c.display_name())
            .collect();
        println!("Contributors: {}", names.join(", "));
    }
    if let Some(edition) = &doc.edition
        && let Some(succession) = &edition.succession
    {
        println!("DSI: {succession}");
    }
    println!("References: {}", doc.references.len());
    for (number, text) in rendered_references(doc, &PlainFormatter) {
        println!("  [{number}] {text}");
    }
    if !conversion.issues.is_empty() {
        println!("Issues: {}", conversion.issues.len());
        for issue in &conversion.issues {
            println!("  {issue}");
        }
    }
    Ok(())
}

fn convert(input: &str, output: &str, quiet: bool) -> Result<(), String> {
    let conversion =
        convert_file(input, &ConversionConfig::default()).map_err(|e| e.to_string())?;

    for issue in &conversion.issues {
        if !quiet {
            eprintln!("warning: {issue}");
        }
    }

    let json =
        webstract::to_json_string(&conversion.document).map_err(|e| e.to_string())?;
    std::fs::write(output, json).map_err(|e| e.to_string())?;

    if !quiet {
        println!("{input} -> {output}");
    }
    Ok(())
}
