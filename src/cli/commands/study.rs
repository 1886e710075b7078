//! `adg study` command - build a study parameter table from an input file

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{load_config, parse_key_value};
use crate::cli::GlobalOpts;
use crate::core::error::Error;
use crate::core::scalar::Scalar;
use crate::study::{align, load_input, stage_table, sweep, DirectorySink};

#[derive(clap::Args, Debug)]
pub struct StudyArgs {
    /// Study input (YAML or JSON map of name to value or list of values)
    pub input: PathBuf,

    /// Sweep a column over comma-separated values (repeatable, applied in order)
    #[arg(long, value_name = "NAME=V1,V2,...", value_parser = parse_key_value)]
    pub sweep: Vec<(String, String)>,

    /// Write the table as CSV to this file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Also stage the table in this directory for the build runner
    #[arg(long, requires = "design")]
    pub stage: Option<PathBuf>,

    /// Design the staged table belongs to
    #[arg(long)]
    pub design: Option<String>,
}

pub fn run(args: StudyArgs, global: &GlobalOpts) -> Result<()> {
    let ladder = load_config(global).type_ladder();

    let input = load_input(&args.input)?;
    let mut table = align(&input)?;
    for (name, raw) in &args.sweep {
        let values: Vec<Scalar> = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| ladder.parse(name, v))
            .collect();
        table = sweep(&table, name, &values);
    }

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
            table.write_csv(file)?;
            if !global.quiet {
                println!(
                    "{} Wrote {} run(s) x {} column(s) to {}",
                    style("✓").green(),
                    table.rows(),
                    table.columns().len(),
                    path.display()
                );
            }
        }
        None => table.write_csv(std::io::stdout().lock())?,
    }

    if let (Some(dir), Some(design)) = (&args.stage, &args.design) {
        let mut sink = DirectorySink::new(dir);
        let staged = stage_table(&table, design, &mut sink)?;
        if !global.quiet {
            println!(
                "{} Staged {} at {}",
                style("✓").green(),
                style(&staged.key).cyan(),
                staged.location
            );
        }
    }

    Ok(())
}
