use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use posterrs::config::Settings;
use posterrs::core::policy::RunOptions;
use posterrs::core::{DuplicateClusterer, ReconciliationReport};
use posterrs::logging;
use posterrs::pipeline::{Pass, Pipeline, RunRequest};
use posterrs::services::{DirectoryLibrary, LocalExecutor, LocalFileTree, TerminalConfirm};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "posterrs", version, about = "CLI for organizing poster sets into media libraries")]
struct Cli {
    /// Settings file (default: <config dir>/posterrs/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find poster folders with near-identical names
    FindDupes {
        /// Root directory to search (default: the configured poster dir)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Process new posters and zip files
    New {
        #[command(flatten)]
        libs: LibraryArgs,
        /// Process movie posters without matching to a media folder
        #[arg(short, long)]
        force: bool,
        /// Hardlink posters into the media folders
        #[arg(short, long)]
        copy: bool,
        /// Replace poster files in media folders without prompting
        #[arg(short, long)]
        all: bool,
    },

    /// Organize existing posters by syncing them with media folders
    Sync {
        #[command(flatten)]
        libs: LibraryArgs,
        /// Hardlink posters into the media folders
        #[arg(short, long)]
        copy: bool,
        /// Process every folder and replace poster files without prompting
        #[arg(short, long)]
        all: bool,
    },

    /// Find and rename poster folders not linked to any movie
    Unlinked {
        #[command(flatten)]
        libs: LibraryArgs,
    },
}

#[derive(Args, Debug)]
struct LibraryArgs {
    /// Library to process, repeatable (default: all)
    #[arg(short = 'l', long = "libraries", value_name = "LIBRARY")]
    libraries: Vec<String>,

    /// String filter for source poster folders
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
}

impl LibraryArgs {
    fn into_request(self, options: RunOptions) -> RunRequest {
        RunRequest {
            libraries: self.libraries,
            options,
            filter: self.filter,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::FindDupes { dir, json } => find_dupes(&settings, dir, json),
        Commands::New {
            libs,
            force,
            copy,
            all,
        } => run_pass(&settings, Pass::New, libs.into_request(RunOptions { force, all, copy })),
        Commands::Sync { libs, copy, all } => run_pass(
            &settings,
            Pass::Sync,
            libs.into_request(RunOptions {
                all,
                copy,
                ..RunOptions::default()
            }),
        ),
        Commands::Unlinked { libs } => run_pass(&settings, Pass::Unlinked, libs.into_request(RunOptions::default())),
    }
}

fn find_dupes(settings: &Settings, dir: Option<PathBuf>, json: bool) -> Result<()> {
    let dir = dir.unwrap_or_else(|| settings.poster_dir.clone());
    let tree = LocalFileTree::new();
    let clusterer = DuplicateClusterer::new(settings.cutoffs.duplicate, settings.ignore_dirs.clone());

    let spinner = spinner("Scanning folders…")?;
    let report = clusterer
        .find_duplicates(&tree, &dir)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    spinner.finish_with_message("Scan complete");

    if report.directory_count < 2 {
        anyhow::bail!(
            "There must be >=2 subdirectories in {} to find duplicates",
            dir.display()
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("▶ Compared {} folders under {}", report.directory_count, dir.display());
    for level in &report.levels {
        println!("\n🔎 Checking for duplicates at level {}...", level.level);
        if !level.has_duplicates() {
            println!("   No duplicates found at level {}.", level.level);
            continue;
        }
        for pair in &level.pairs {
            println!(
                "   ⚠️  Potential duplicate: {}  <-->  {} (Score: {})",
                pair.path.display(),
                pair.duplicate_of.display(),
                pair.score
            );
        }
    }

    let groups = report.groups();
    if !groups.is_empty() {
        println!("\nFound {} duplicate group(s):", groups.len());
        for (i, group) in groups.iter().enumerate() {
            println!(" Group {} (level {}):", i + 1, group.level);
            for path in &group.paths {
                println!("   ▶ {}", path.display());
            }
        }
    }
    Ok(())
}

fn run_pass(settings: &Settings, pass: Pass, request: RunRequest) -> Result<()> {
    let tree = LocalFileTree::new();
    let executor = LocalExecutor::new();
    let confirm = TerminalConfirm::new();
    let provider = DirectoryLibrary::new(&tree, settings.libraries.clone());
    let pipeline = Pipeline::new(settings, &provider, &tree, &executor, &confirm);

    let (libraries, missing) = pipeline.select_libraries(&request.libraries);
    for name in &missing {
        eprintln!("❌ Library '{}' not found.", name);
    }
    if libraries.is_empty() {
        anyhow::bail!("No libraries to process; add [[libraries]] to the settings file");
    }

    let progress = ProgressBar::new(libraries.len() as u64);
    progress.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{bar:30}] {pos}/{len} {msg}",
    )?);

    for library in &libraries {
        progress.set_message(library.title.clone());
        if !pass.supports(library.kind) {
            progress.suspend(|| {
                println!("\n⚠️  Unlinked command only supports movie libraries; skipping '{}'.", library.title)
            });
            progress.inc(1);
            continue;
        }

        // prompts need the terminal to themselves
        let result = progress.suspend(|| {
            println!("\n▶ Processing library: {}", library.title);
            pipeline.run_library(pass, library, &request)
        });
        match result {
            Ok(report) => progress.suspend(|| print_report(&report)),
            Err(e) => progress.suspend(|| eprintln!("❌ {}: {}", library.title, e)),
        }
        progress.inc(1);
    }
    progress.finish_with_message("done");
    Ok(())
}

fn print_report(report: &ReconciliationReport) {
    for applied in &report.applied {
        println!(
            "   📦 {} → {}",
            applied.source.display(),
            applied.destination.display()
        );
    }
    for error in &report.errors {
        eprintln!("   ❌ {}: {}", error.path.display(), error.message);
    }
    for unmatched in &report.unmatched {
        println!("\n⚠️  Unmatched files in {}:", unmatched.folder.display());
        for file in &unmatched.files {
            println!("   - {}", file);
        }
        println!("   These files were left in the collection folder for manual organization.");
    }
    println!(
        "\n✅ {} applied, {} skipped, {} error(s)",
        report.applied.len(),
        report.skipped.len(),
        report.errors.len()
    );
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}
