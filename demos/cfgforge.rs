// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

fn make_engine(
    vars: &[String],
    search_paths: Vec<PathBuf>,
    settings: Option<String>,
) -> Result<cfgforge::Engine> {
    let mut settings = match settings {
        Some(file) => cfgforge::Settings::from_file(&file)?,
        None => cfgforge::Settings::default(),
    };
    if !search_paths.is_empty() {
        settings.search_paths = search_paths;
    }

    let mut engine = cfgforge::Engine::with_settings(settings);

    // Later files override earlier ones.
    for file in vars {
        engine
            .add_variables_from_file(file)
            .with_context(|| format!("Error processing {file}"))?;
    }
    Ok(engine)
}

fn print_rendered(engine: &cfgforge::Engine, rendered: &cfgforge::Rendered) -> Result<()> {
    for diagnostic in engine.diagnostics() {
        if diagnostic.level == cfgforge::Level::Warning {
            eprintln!("[WARNING]: {}", diagnostic.message);
        }
    }
    println!("{}", serde_json::to_string_pretty(rendered)?);
    Ok(())
}

fn render(
    template: String,
    vars: &[String],
    search_paths: Vec<PathBuf>,
    settings: Option<String>,
) -> Result<()> {
    let mut engine = make_engine(vars, search_paths, settings)?;
    let rendered = engine.render_file(&template)?;
    print_rendered(&engine, &rendered)
}

fn render_dir(
    dir: String,
    include: Vec<String>,
    exclude: Vec<String>,
    vars: &[String],
    settings: Option<String>,
) -> Result<()> {
    let mut engine = make_engine(vars, vec![], settings)?;
    let to_list = |patterns: Vec<String>| {
        cfgforge::Value::from(
            patterns
                .into_iter()
                .map(cfgforge::Value::from)
                .collect::<Vec<_>>(),
        )
    };
    let rendered = engine.render_directory(&dir, &to_list(include), &to_list(exclude))?;
    print_rendered(&engine, &rendered)
}

fn parse(
    parser: String,
    config: String,
    tags: Vec<String>,
    search_paths: Vec<PathBuf>,
) -> Result<()> {
    let text =
        std::fs::read_to_string(&config).with_context(|| format!("Failed to read {config}"))?;

    let mut engine = make_engine(&[], search_paths, None)?;
    let tags: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
    let facts = engine.parse_file(&parser, &text, &tags)?;
    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}

#[derive(Subcommand)]
enum CfgforgeCommand {
    /// Render a template.
    Render {
        /// Template name, resolved under the search paths.
        template: String,

        /// Variable files. json or yaml.
        #[arg(long, short, value_name = "vars.yaml")]
        vars: Vec<String>,

        /// Directories searched for templates.
        #[arg(long, short, value_name = "dir")]
        search_path: Vec<PathBuf>,

        /// Settings file. json or yaml.
        #[arg(long)]
        settings: Option<String>,
    },

    /// Render every template in a directory.
    RenderDir {
        /// Template directory.
        dir: String,

        /// Only render files matching one of these regexes.
        #[arg(long, short)]
        include: Vec<String>,

        /// Skip files matching one of these regexes.
        #[arg(long, short)]
        exclude: Vec<String>,

        /// Variable files. json or yaml.
        #[arg(long, short, value_name = "vars.yaml")]
        vars: Vec<String>,

        /// Settings file. json or yaml.
        #[arg(long)]
        settings: Option<String>,
    },

    /// Extract facts from device configuration.
    Parse {
        /// Parser name, resolved under the search paths.
        parser: String,

        /// Configuration text file.
        config: String,

        /// Only run definitions with exactly these tags.
        #[arg(long, short)]
        tag: Vec<String>,

        /// Directories searched for parsers.
        #[arg(long, short, value_name = "dir")]
        search_path: Vec<PathBuf>,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: CfgforgeCommand,
}

fn main() -> Result<()> {
    env_logger::init();

    // Parse and dispatch command.
    let cli = Cli::parse();
    match cli.command {
        CfgforgeCommand::Render {
            template,
            vars,
            search_path,
            settings,
        } => render(template, &vars, search_path, settings),
        CfgforgeCommand::RenderDir {
            dir,
            include,
            exclude,
            vars,
            settings,
        } => render_dir(dir, include, exclude, &vars, settings),
        CfgforgeCommand::Parse {
            parser,
            config,
            tag,
            search_path,
        } => parse(parser, config, tag, search_path),
    }
}
