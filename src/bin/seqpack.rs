use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use seqpack::collate::collate_package;
use seqpack::config::ConfigLoader;
use seqpack::error::SeqpackError;
use seqpack::inventory;
use seqpack::output::{InventoryListing, JsonOutput};
use seqpack::package::Package;
use seqpack::reconcile::import_missing_parts;
use seqpack::retrieve::SourceRouter;

#[derive(Parser)]
#[command(name = "seqpack")]
#[command(about = "Reconcile, retrieve, and collate a package's genetic parts")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Retrieve parts missing from the package's cached files")]
    Import(PackageArgs),
    #[command(about = "Collate the specification and cached files into one document")]
    Collate(PackageArgs),
    #[command(about = "List parts available in the package's cached files")]
    Inventory(PackageArgs),
}

#[derive(Args)]
struct PackageArgs {
    package: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SeqpackError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SeqpackError) -> u8 {
    match error {
        SeqpackError::SpecificationMissing(_)
        | SeqpackError::CollectionMissing(_)
        | SeqpackError::ConfigRead(_)
        | SeqpackError::ConfigParse(_) => 2,
        SeqpackError::NcbiHttp(_)
        | SeqpackError::NcbiStatus { .. }
        | SeqpackError::RegistryHttp(_)
        | SeqpackError::SynbiohubHttp(_)
        | SeqpackError::SynbiohubStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => {
            let config = ConfigLoader::resolve(&args.package).into_diagnostic()?;
            let package = Package::new(args.package, &config.namespace);
            let router = SourceRouter::with_default_sources(&config).into_diagnostic()?;
            let report = import_missing_parts(&package, &router).into_diagnostic()?;
            JsonOutput::print_report(&report).into_diagnostic()?;
        }
        Commands::Collate(args) => {
            let config = ConfigLoader::resolve(&args.package).into_diagnostic()?;
            let package = Package::new(args.package, &config.namespace);
            let summary = collate_package(&package).into_diagnostic()?;
            JsonOutput::print_collation(&summary).into_diagnostic()?;
        }
        Commands::Inventory(args) => {
            let config = ConfigLoader::resolve(&args.package).into_diagnostic()?;
            let package = Package::new(args.package, &config.namespace);
            let inventory = inventory::scan(&package).into_diagnostic()?;
            JsonOutput::print_inventory(&InventoryListing::from_inventory(&inventory))
                .into_diagnostic()?;
        }
    }
    Ok(())
}
