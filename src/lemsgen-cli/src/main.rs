// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lemsgen_engine::{ExportOptions, UnitCatalogue, export_json, render, units_artifact};

/// Export standardized spiking-network dictionaries to LEMS.
#[derive(Parser, Debug)]
#[command(name = "lemsgen", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a run dictionary (JSON) into a LEMS document
    Export {
        /// input dictionary, or `-` for stdin
        input: String,
        /// where to write the document; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON file overriding export options
        #[arg(long)]
        options: Option<PathBuf>,
        /// neither include nor copy the units constants file
        #[arg(long)]
        no_units_file: bool,
    },
    /// Print a model-grammar expression in LEMS syntax
    Render {
        expr: String,
    },
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut contents = String::new();
        io::stdin()
            .read_to_string(&mut contents)
            .context("reading stdin")?;
        return Ok(contents);
    }
    fs::read_to_string(input).with_context(|| format!("reading {input}"))
}

fn load_options(path: Option<&Path>, no_units_file: bool) -> Result<ExportOptions> {
    let mut options = match path {
        Some(path) => {
            let contents =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing options in {}", path.display()))?
        }
        None => ExportOptions::default(),
    };
    if no_units_file {
        options.units_file = None;
    }
    Ok(options)
}

fn export(
    input: &str,
    output: Option<&Path>,
    options: Option<&Path>,
    no_units_file: bool,
) -> Result<()> {
    let options = load_options(options, no_units_file)?;
    let json = read_input(input)?;
    let catalogue = UnitCatalogue::bundled().context("loading the bundled unit catalogue")?;

    let export = export_json(&json, &catalogue, &options)
        .with_context(|| format!("exporting {input}"))?;
    let xml = export.document.to_xml().context("serializing the document")?;

    let output = match output {
        Some(output) => output,
        None => {
            io::stdout().write_all(xml.as_bytes())?;
            return Ok(());
        }
    };
    fs::write(output, xml).with_context(|| format!("writing {}", output.display()))?;
    log::info!("wrote {}", output.display());

    // the document includes the units file by relative path
    if let Some(units_file) = export.units_file {
        let dir = output.parent().unwrap_or_else(|| Path::new("."));
        let path = dir.join(units_file);
        fs::write(&path, units_artifact())
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }

    for file in export.recording_files.iter() {
        log::debug!("simulation records to {file}");
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Export {
            input,
            output,
            options,
            no_units_file,
        } => export(&input, output.as_deref(), options.as_deref(), no_units_file),
        Command::Render { expr } => {
            let rendered = render(&expr).with_context(|| format!("rendering `{expr}`"))?;
            println!("{rendered}");
            Ok(())
        }
    }
}
