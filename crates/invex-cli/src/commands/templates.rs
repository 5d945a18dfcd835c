//! Templates command - inspect the template directory.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use invex_core::invoice::check_template;
use invex_core::{Template, TemplateSet, TemplateStore};

use super::load_config;

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// List templates in matching order
    List(ListArgs),

    /// Compile every pattern and report problems
    Check(DirArgs),
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    dir: DirArgs,

    /// Print definitions as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DirArgs {
    /// Template directory (overrides config)
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

pub async fn run(args: TemplatesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store_for = |dir: Option<PathBuf>| match dir {
        Some(dir) => TemplateStore::new(dir).with_extension(config.templates.extension.clone()),
        None => TemplateStore::from_config(&config.templates),
    };

    match args.command {
        TemplatesCommand::List(args) => list(&store_for(args.dir.dir), args.json),
        TemplatesCommand::Check(dir) => check(&store_for(dir.dir)),
    }
}

fn load(store: &TemplateStore) -> anyhow::Result<TemplateSet> {
    if !store.dir().is_dir() {
        anyhow::bail!("Template directory not found: {}", store.dir().display());
    }
    Ok(store.load())
}

fn list(store: &TemplateStore, json: bool) -> anyhow::Result<()> {
    let templates = load(store)?;

    // Matching order: vendors by name, then the fallback.
    let ordered: Vec<&Template> = templates
        .iter()
        .filter(|t| !t.is_default())
        .chain(templates.default_template())
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&ordered)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!(
            "{} No templates in {}",
            style("ℹ").blue(),
            store.dir().display()
        );
        return Ok(());
    }

    for template in ordered {
        let kind = match (&template.match_pattern, template.is_default()) {
            (_, true) => style("fallback".to_string()).yellow(),
            (Some(pattern), false) => style(format!("match /{}/", pattern)).cyan(),
            (None, false) => style("never matches".to_string()).dim(),
        };
        println!(
            "{:<24} {:>3} fields  {}",
            template.name,
            template.fields.len(),
            kind
        );
    }

    Ok(())
}

fn check(store: &TemplateStore) -> anyhow::Result<()> {
    let templates = load(store)?;
    let mut problems = 0;

    for template in templates.iter() {
        let issues = check_template(template);
        if issues.is_empty() {
            println!("{} {}", style("✓").green(), template.name);
            continue;
        }

        problems += issues.len();
        println!("{} {}", style("✗").red(), template.name);
        for issue in issues {
            println!("    {}", issue);
        }
    }

    if templates.default_template().is_none() {
        println!(
            "{} No default template: unmatched documents will be rejected",
            style("!").yellow()
        );
    }

    if problems > 0 {
        anyhow::bail!("{} pattern problems found", problems);
    }
    Ok(())
}
