//! `tdg` - generate API test cases from an OpenAPI document

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tdg_ai::{AiOrchestrator, GenerationOptions, Speed, MAX_CASES, MIN_CASES};
use tdg_cli::{endpoint_lines, load_config, load_document};
use tdg_core::{init_tracing, GenerationRequest, GenerationService, JsonFilePackager};
use tdg_scheduler::LoggingSink;
use tdg_schema::normalize_document;

fn cli() -> Command {
    Command::new("tdg")
        .version(tdg_core::VERSION)
        .about("Schema-driven API test case generator")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate test cases for every endpoint")
                .arg(
                    Arg::new("spec")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("OpenAPI document (JSON or YAML)"),
                )
                .arg(
                    Arg::new("count")
                        .long("count")
                        .value_parser(value_parser!(usize))
                        .help("Cases per endpoint (defaults to the configured value)"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducible output"),
                )
                .arg(
                    Arg::new("domain")
                        .long("domain")
                        .help("Business domain hint, e.g. 'pet store'"),
                )
                .arg(
                    Arg::new("speed")
                        .long("speed")
                        .default_value("fast")
                        .value_parser(value_parser!(Speed))
                        .help("Backend preference: fast, balanced or quality"),
                )
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .help("Provider: deterministic, openai, anthropic or hybrid"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Also write the cases into this directory"),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .action(ArgAction::SetTrue)
                        .help("Print the full report instead of the case list"),
                ),
        )
        .subcommand(
            Command::new("endpoints")
                .about("List the endpoints of a document")
                .arg(
                    Arg::new("spec")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("OpenAPI document (JSON or YAML)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn spec_path(args: &ArgMatches) -> Result<&PathBuf> {
    args.get_one::<PathBuf>("spec").context("missing document path")
}

async fn generate(args: &ArgMatches, config: tdg_core::GeneratorConfig) -> Result<()> {
    let document = load_document(spec_path(args)?)?;

    let count = args
        .get_one::<usize>("count")
        .copied()
        .unwrap_or(config.default_cases_per_endpoint);
    let mut options = GenerationOptions::default()
        .with_count(count.clamp(MIN_CASES, MAX_CASES))
        .with_speed(args.get_one::<Speed>("speed").copied().unwrap_or_default());
    if let Some(seed) = args.get_one::<u64>("seed") {
        options = options.with_seed(*seed);
    }
    if let Some(domain) = args.get_one::<String>("domain") {
        options = options.with_domain_hint(domain.clone());
    }
    if let Some(provider) = args.get_one::<String>("provider") {
        options = options.with_provider(provider.clone());
    }

    let orchestrator = AiOrchestrator::new(config.ai.clone());
    tracing::info!(providers = ?orchestrator.available_providers(), "providers configured");
    let service = match args.get_one::<PathBuf>("output") {
        Some(dir) => GenerationService::with_packager(config, orchestrator, Arc::new(JsonFilePackager::new(dir)))?,
        None => GenerationService::with_orchestrator(config, orchestrator)?,
    };

    let request = GenerationRequest::new(document).with_options(options);
    let result = service.generate_now(&request, &LoggingSink).await;
    service.shutdown().await;
    let report = result?;

    let rendered = if args.get_flag("report") {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.cases)?
    };
    println!("{rendered}");
    if let Some(artifact) = &report.artifact {
        tracing::info!(artifact = %artifact, "cases written");
    }
    Ok(())
}

fn endpoints(args: &ArgMatches) -> Result<()> {
    let document = load_document(spec_path(args)?)?;
    let api = normalize_document(&document)?;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&api.endpoints)?);
    } else {
        if let Some(title) = &api.title {
            println!("{title} ({} endpoints)", api.endpoints.len());
        }
        for line in endpoint_lines(&api.endpoints) {
            println!("{line}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    init_tracing(&config.log_level, matches.get_flag("json-logs"))?;

    match matches.subcommand() {
        Some(("generate", args)) => generate(args, config).await,
        Some(("endpoints", args)) => endpoints(args),
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}
