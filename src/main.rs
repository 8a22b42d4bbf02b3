use std::{process, sync::Arc};

use inkchain::{
    application::{
        catalog::{AssetCatalogView, read_chain_catalog},
        enrichment::EnrichmentEngine,
        error::AppError,
        library::UserAssetView,
        pagination::{MetadataPaginator, PaginationLimits},
        repos::{ContractAssetReader, MetadataProvider},
    },
    cache::{CacheConfig, CacheStore},
    config,
    domain::entities::EnrichedAsset,
    infra::{
        error::InfraError, output, pinata::PinataMetadataProvider,
        snapshot::ChainSnapshotReader, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let chain = error.report().chain();
    if dispatcher::has_been_set() {
        error!(error = %chain, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Catalog(config::CatalogArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Catalog(args) if args.raw => run_raw_catalog(&settings).await,
        config::Command::Catalog(_) => run_catalog(&settings).await,
        config::Command::Library(args) => run_library(&settings, args).await,
    }
}

fn chain_reader(settings: &config::Settings) -> Arc<ChainSnapshotReader> {
    Arc::new(ChainSnapshotReader::new(settings.chain.snapshot_path.clone()))
}

fn build_catalog(
    settings: &config::Settings,
    chain: Arc<dyn ContractAssetReader>,
) -> Result<AssetCatalogView, AppError> {
    let provider: Arc<dyn MetadataProvider> =
        Arc::new(PinataMetadataProvider::new(&settings.metadata)?);
    let paginator = MetadataPaginator::new(provider, PaginationLimits::from(&settings.metadata));

    let cache = Arc::new(CacheStore::new(CacheConfig::from(&settings.cache)));
    let engine = Arc::new(EnrichmentEngine::new(cache.clone(), paginator));

    info!(
        target = "inkchain::startup",
        snapshot = %settings.chain.snapshot_path.display(),
        metadata = %settings.metadata.base_url,
        cache_enabled = settings.cache.enabled,
        "Catalog services ready"
    );

    Ok(AssetCatalogView::new(chain, cache, engine))
}

async fn run_raw_catalog(settings: &config::Settings) -> Result<(), AppError> {
    let chain = chain_reader(settings);
    let assets = read_chain_catalog(chain.as_ref()).await?;
    print_assets(&assets)
}

async fn run_catalog(settings: &config::Settings) -> Result<(), AppError> {
    let catalog = build_catalog(settings, chain_reader(settings))?;
    catalog.load().await?.finished().await;
    print_assets(catalog.state().assets())
}

async fn run_library(
    settings: &config::Settings,
    args: config::LibraryArgs,
) -> Result<(), AppError> {
    let chain = chain_reader(settings);
    let catalog = build_catalog(settings, chain.clone())?;
    let library = UserAssetView::new(catalog.clone(), chain);

    catalog.load().await?.finished().await;
    let snapshot = library.load(&args.account).await?;

    info!(
        target = "inkchain::library",
        account = %args.account,
        assets = snapshot.assets.len(),
        "Library resolved"
    );
    print_assets(&snapshot.assets)
}

fn print_assets(assets: &[EnrichedAsset]) -> Result<(), AppError> {
    let stdout = std::io::stdout();
    output::write_assets(&mut stdout.lock(), assets)?;
    Ok(())
}
