//! `adg design` command - designs held in the store

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cli::helpers::{cell, load_config, open_client, rows_table, rows_tsv};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::error::Error;
use crate::core::scalar::Scalar;
use crate::entities::component::Catalog;
use crate::entities::wire::{from_wire_with, WireDesign};
use crate::query::client::DESIGN_KEY;

#[derive(Subcommand, Debug)]
pub enum DesignCommands {
    /// List stored designs
    List,

    /// Write a stored design as a wire document
    Export(ExportArgs),

    /// Push a wire document into the store
    Import(ImportArgs),

    /// Delete a design and everything it owns
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Design name
    pub name: String,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Wire document (JSON, or YAML by extension)
    pub file: PathBuf,

    /// Replace a stored design of the same name
    #[arg(long)]
    pub overwrite: bool,

    /// Catalog file (default: configured catalog, then the built-in corpus)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Design name
    pub name: String,
}

pub fn run(cmd: DesignCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DesignCommands::List => run_list(global),
        DesignCommands::Export(args) => run_export(args, global),
        DesignCommands::Import(args) => run_import(args, global),
        DesignCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let mut client = open_client(&config)?;
    let blocks = client.submit_script("design_names", &BTreeMap::new())?;
    let rows = blocks.into_iter().next().transpose()?.unwrap_or_default();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&rows).into_diagnostic()?),
        OutputFormat::Tsv => println!("{}", rows_tsv(&rows)),
        OutputFormat::Auto => {
            if rows.is_empty() {
                if !global.quiet {
                    println!("No designs in {}", config.store_path().display());
                }
            } else {
                println!("{}", rows_table(&rows));
                if !global.quiet {
                    println!("\n{} design(s)", style(rows.len()).cyan());
                }
            }
        }
    }

    client.close()?;
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let mut client = open_client(&config)?;
    let doc = client.export_design(&args.name)?;
    client.close()?;

    let text = match global.format {
        OutputFormat::Yaml => serde_yml::to_string(&doc).into_diagnostic()?,
        _ => doc.to_json_pretty()? + "\n",
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, text).map_err(|e| Error::io(path, e))?;
            if !global.quiet {
                println!(
                    "{} Exported {} to {}",
                    style("✓").green(),
                    style(&args.name).cyan(),
                    path.display()
                );
            }
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn load_wire(path: &Path) -> Result<WireDesign> {
    let is_yaml = path
        .extension()
        .map_or(false, |e| e == "yaml" || e == "yml");
    if is_yaml {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_yml::from_str(&content).map_err(Error::from)?)
    } else {
        Ok(WireDesign::load(path)?)
    }
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let catalog_path = args.catalog.or_else(|| config.catalog.clone());
    let catalog = Catalog::load_or_embedded(catalog_path.as_deref())?;

    let doc = load_wire(&args.file)?;
    let design = from_wire_with(&doc, &config.type_ladder())?;

    let mut client = open_client(&config)?;
    if client.design_names()?.contains(&design.name) {
        if !(args.overwrite || config.overwrite_designs()) {
            client.close()?;
            return Err(Error::DesignExists {
                design: design.name.clone(),
            }
            .into());
        }
        client.delete_design(&design.name)?;
    }
    client.push_design(&design, &catalog)?;

    if !global.quiet {
        let mut params = BTreeMap::new();
        params.insert(DESIGN_KEY.to_string(), Scalar::Str(design.name.replace('\'', "''")));
        let summary = client.submit_script("design_summary", &params)?;
        if let Some(Ok(rows)) = summary.first() {
            if let Some(row) = rows.first() {
                println!(
                    "{} Imported {} ({} instance(s), {} parameter(s), {} connection(s))",
                    style("✓").green(),
                    style(&design.name).cyan(),
                    row.get("instances").map(cell).unwrap_or_default(),
                    row.get("parameters").map(cell).unwrap_or_default(),
                    row.get("connections").map(cell).unwrap_or_default(),
                );
            }
        }
    }

    client.close()?;
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let mut client = open_client(&config)?;
    client.delete_design(&args.name)?;
    client.close()?;

    if !global.quiet {
        println!("{} Deleted {}", style("✓").green(), style(&args.name).cyan());
    }
    Ok(())
}
