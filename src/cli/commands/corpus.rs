//! `adg corpus` command - catalog validation and model lookup

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::load_config;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::component::Catalog;
use crate::schema::validator::{validate, CorpusSchema};

#[derive(Subcommand, Debug)]
pub enum CorpusCommands {
    /// Check every catalog entry against the corpus schema
    Validate(ValidateArgs),

    /// List models, or show one model in full
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Catalog file (default: configured catalog, then the built-in corpus)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Corpus schema file (default: configured schema, then the built-in one)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Model name (omit to list every model)
    pub model: Option<String>,

    /// Only list models of this classification
    #[arg(long, short = 'c')]
    pub class: Option<String>,

    /// Catalog file (default: configured catalog, then the built-in corpus)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

pub fn run(cmd: CorpusCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CorpusCommands::Validate(args) => run_validate(args, global),
        CorpusCommands::Show(args) => run_show(args, global),
    }
}

fn run_validate(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let catalog_path = args.catalog.or(config.catalog);
    let schema_path = args.schema.or(config.schema);
    let catalog = Catalog::load_or_embedded(catalog_path.as_deref())?;
    let schema = CorpusSchema::load_or_embedded(schema_path.as_deref())?;

    if !global.quiet {
        println!(
            "{} Validating {} catalog entr{}...\n",
            style("→").blue(),
            catalog.len(),
            if catalog.len() == 1 { "y" } else { "ies" }
        );
    }

    let report = validate(&catalog, &schema);
    for entry in &report.entries {
        if !entry.is_valid() {
            println!(
                "{} {} ({})",
                style("✗").red(),
                style(&entry.model).bold(),
                entry.class
            );
            for violation in &entry.violations {
                println!("    {} {}", style("•").red(), violation);
            }
        } else if !global.quiet {
            println!("{} {}", style("✓").green(), entry.model);
        }
        for warning in &entry.warnings {
            println!("    {} {}", style("!").yellow(), style(warning).dim());
        }
    }

    println!();
    println!(
        "{} valid, {} invalid, {} warning(s)",
        style(report.valid_count()).green(),
        style(report.invalid_count()).red(),
        style(report.warning_count()).yellow()
    );

    if !report.is_valid() || (args.strict && report.warning_count() > 0) {
        std::process::exit(1);
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let catalog_path = args.catalog.or(config.catalog);
    let catalog = Catalog::load_or_embedded(catalog_path.as_deref())?;

    if let Some(name) = &args.model {
        let model = catalog.get_model(name)?;
        match global.format {
            OutputFormat::Yaml => print!("{}", serde_yml::to_string(model).into_diagnostic()?),
            _ => println!("{}", serde_json::to_string_pretty(model).into_diagnostic()?),
        }
        return Ok(());
    }

    let models: Vec<_> = catalog
        .models()
        .filter(|m| args.class.as_deref().map_or(true, |c| m.class == c))
        .collect();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&models).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&models).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            for m in &models {
                println!("{}\t{}\t{}", m.model, m.class, m.connectors.join(","));
            }
        }
        OutputFormat::Auto => {
            let mut builder = Builder::default();
            builder.push_record(["MODEL", "CLASS", "PARAMETERS", "CONNECTORS"]);
            for m in &models {
                builder.push_record([
                    m.model.clone(),
                    m.class.clone(),
                    m.parameters.len().to_string(),
                    m.connectors.join(", "),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            if !global.quiet {
                println!("\n{} model(s)", style(models.len()).cyan());
            }
        }
    }
    Ok(())
}
