use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vt_app::{App, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    let app = App::new(config);

    let cancel = app.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining jobs");
            cancel.cancel();
        }
    });

    let results = app.generate().await?;
    let failed = results.iter().filter(|r| !r.is_ok()).count();
    let shown = app.present(results);

    info!(shown, failed, "Done");
    Ok(())
}
