use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rewire_cli::batch::{migrate_files, BatchOptions, BatchReport};
use rewire_cli::files::collect_php_files;
use rewire_config::{init_tracing, load_for_root, RewireConfig};
use rewire_refactor::{CatalogOptions, Migrator};
use rewire_syntax::Tokens;
use rewire_types::SchemaIntrospector;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "rewire",
    version,
    about = "Migrate legacy generated client calls to request objects"
)]
struct Cli {
    /// Config file (defaults to `REWIRE_CONFIG_PATH`, `rewire.toml` or `.rewire.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite legacy client calls in place
    Fix(FixArgs),
    /// Report files that would change; exits with 1 if any would
    Check(CheckArgs),
    /// Dump the token sequence of a single file
    Tokens(TokensArgs),
}

#[derive(Args)]
struct FixArgs {
    /// Files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// JSON type schema (overrides `[schema] path`)
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Report changes without writing files
    #[arg(long)]
    dry_run: bool,
    /// Print unified diffs of changed files
    #[arg(long)]
    diff: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// JSON type schema (overrides `[schema] path`)
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Print unified diffs of files that would change
    #[arg(long)]
    diff: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TokensArgs {
    /// File to tokenize
    file: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Fix(args) => {
            let options = BatchOptions {
                write: !args.dry_run,
                diff: args.diff,
            };
            let report = run_batch(&config, args.schema, &args.paths, options)?;
            print_report(&report, args.json, !args.dry_run)?;
            Ok(0)
        }
        Command::Check(args) => {
            let options = BatchOptions {
                write: false,
                diff: args.diff,
            };
            let report = run_batch(&config, args.schema, &args.paths, options)?;
            print_report(&report, args.json, false)?;
            Ok(if report.any_changed() { 1 } else { 0 })
        }
        Command::Tokens(args) => {
            let text = std::fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let tokens = Tokens::from_code(&text);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                for token in &tokens {
                    println!("{:?} {:?}", token.kind, token.text);
                }
            }
            Ok(0)
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<RewireConfig> {
    if let Some(path) = explicit {
        return RewireConfig::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let root = std::env::current_dir().context("failed to determine current directory")?;
    let (config, _path) = load_for_root(&root).context("failed to load config")?;
    Ok(config)
}

fn run_batch(
    config: &RewireConfig,
    schema: Option<PathBuf>,
    paths: &[PathBuf],
    options: BatchOptions,
) -> Result<BatchReport> {
    let schema_path = schema.or_else(|| config.schema.path.clone()).context(
        "no type schema configured; pass --schema or set `[schema] path` in rewire.toml",
    )?;
    let introspector = SchemaIntrospector::load(&schema_path)
        .with_context(|| format!("failed to load type schema {}", schema_path.display()))?;
    tracing::debug!(
        target: "rewire.cli",
        schema = %schema_path.display(),
        types = introspector.type_count(),
        "loaded type schema"
    );

    let catalog = CatalogOptions {
        namespace_prefix: config.catalog.namespace_prefix.clone(),
        client_suffix: config.catalog.client_suffix.clone(),
        next_gen_segment: config.catalog.next_gen_segment.clone(),
        generated_parent_marker: config.catalog.generated_parent_marker().map(str::to_owned),
        options_parameter: config.catalog.options_parameter.clone(),
        setter_prefix: config.catalog.setter_prefix.clone(),
    };
    let migrator = Migrator::new(&introspector, catalog).context("type schema probe failed")?;

    let files = collect_php_files(paths)?;
    migrate_files(&migrator, &files, options)
}

fn print_report(report: &BatchReport, json: bool, wrote: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let verb = if wrote { "rewrote" } else { "would rewrite" };
    for file in &report.files {
        let path = file.path.display();
        if file.changed {
            println!("{verb} {path} ({} calls)", file.report.rewritten.len());
        }
        for skip in &file.report.skipped {
            println!(
                "{path}:{}: skipped {}->{}: {}",
                skip.line, skip.variable, skip.method, skip.reason
            );
        }
        if let Some(diff) = &file.diff {
            print!("{diff}");
        }
    }

    let summary = &report.summary;
    println!(
        "{} of {} files {}, {} calls rewritten, {} skipped",
        summary.changed_files,
        summary.files,
        if wrote { "changed" } else { "would change" },
        summary.rewritten_calls,
        summary.skipped_calls
    );
    Ok(())
}
