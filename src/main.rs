use std::sync::Arc;

use hotdeal_poster::fetchers::aliexpress::AliexpressFetcher;
use hotdeal_poster::http::{HttpTransport, ReqwestTransport};
use hotdeal_poster::models::config::AppConfig;
use hotdeal_poster::notifiers::telegram::TelegramNotifier;
use hotdeal_poster::processing::runner::{run_forever, run_once};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    log::debug!("Loaded configuration: {config:?}");

    let transport: Arc<dyn HttpTransport> = match ReqwestTransport::new() {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let fetcher = AliexpressFetcher::new(config.affiliate, Arc::clone(&transport));
    let notifier = TelegramNotifier::new(config.telegram, transport);

    match config.fetch_interval {
        Some(interval) => run_forever(&fetcher, &notifier, interval).await,
        None => {
            let outcome = run_once(&fetcher, &notifier).await;
            log::info!("Finished: {outcome:?}");
        }
    }
}
