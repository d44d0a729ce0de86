use depl_monitor::{config::ControllerConfig, controller::run_controller, init_tracing};
use envconfig::Envconfig;
use kube::Client;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = ControllerConfig::init_from_env()?;
    init_tracing(&cfg.log);

    if let Err(e) = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::aws_lc_rs::default_provider(),
    ) {
        tracing::debug!(
            ?e,
            "CryptoProvider already installed or incompatible; proceeding"
        );
    }

    info!(?cfg, "Starting depl-monitor");
    let client = Client::try_default().await?;
    run_controller(client, cfg).await
}
