//! `adg query` command - run a query template against the store

use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;

use crate::cli::helpers::{load_config, open_client, parse_key_value, rows_table, rows_tsv};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::query::template::TemplateLoader;

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    /// Template name, resolved against the template path then the built-ins
    #[arg(required_unless_present = "list")]
    pub template: Option<String>,

    /// Template parameter (repeatable)
    #[arg(long = "param", short = 'p', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// List available templates instead of running one
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: QueryArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);

    let Some(template) = args.template.filter(|_| !args.list) else {
        let loader = TemplateLoader::new(config.template_paths.clone());
        for name in loader.list() {
            println!("{}", name);
        }
        return Ok(());
    };

    let ladder = config.type_ladder();
    let params: BTreeMap<_, _> = args
        .params
        .iter()
        .map(|(k, v)| (k.clone(), ladder.parse(k, v)))
        .collect();

    let mut client = open_client(&config)?;
    let results = client.submit_script(&template, &params)?;
    client.close()?;

    if global.format == OutputFormat::Json || global.format == OutputFormat::Yaml {
        let doc: Vec<serde_json::Value> = results
            .iter()
            .map(|r| match r {
                Ok(rows) => serde_json::json!({ "rows": rows }),
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            })
            .collect();
        if global.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
        } else {
            print!("{}", serde_yml::to_string(&doc).into_diagnostic()?);
        }
    }

    let mut failed = 0;
    for (block, result) in results.iter().enumerate() {
        match result {
            Ok(rows) => match global.format {
                OutputFormat::Tsv => println!("{}", rows_tsv(rows)),
                OutputFormat::Auto => {
                    if !global.quiet {
                        println!("{} block {}", style("→").blue(), block);
                    }
                    if rows.is_empty() {
                        println!("{}", style("(no rows)").dim());
                    } else {
                        println!("{}", rows_table(rows));
                    }
                }
                _ => {}
            },
            Err(e) => {
                failed += 1;
                eprintln!("{} block {}: {}", style("✗").red(), block, e);
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
