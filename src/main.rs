use anyhow::{Context, bail};
use flyer_geocoder::config;
use flyer_geocoder::geocoding::{NominatimProvider, ResilientResolver, ResolverConfig};
use flyer_geocoder::logging;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    let app_config = config::load().context("Failed to load configuration")?;
    logging::init(&app_config.observability)?;

    let address = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if address.trim().is_empty() {
        bail!("usage: flyer-geocoder <address>");
    }

    tracing::info!(
        app = %app_config.app.name,
        version = %app_config.app.version,
        environment = %app_config.app.environment,
        "Starting geocoder"
    );

    let resolver = ResilientResolver::with_config(
        "nominatim",
        NominatimProvider::from_config(&app_config.geocoder),
        ResolverConfig::from(&app_config),
    );

    let coordinates = resolver.resolve(address.trim()).await?;
    println!("{}", coordinates);

    Ok(())
}
