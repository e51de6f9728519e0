use std::future::Future;
use std::time::Duration;

use crate::fetchers::{FetchError, ProductFetcher};
use crate::notifiers::format::format_announcement;
use crate::notifiers::{BotMethod, Notifier};

/// What a single fetch-and-post cycle ended with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The product was announced using the given bot operation.
    Posted { title: String, method: BotMethod },
    /// Nothing to announce this cycle.
    NoProduct,
    /// A product was found but the bot API did not take it.
    DeliveryFailed { title: String },
}

/// Fetches one product and announces it. Never fails: every problem is
/// logged and reflected in the returned [`RunOutcome`].
pub async fn run_once<F, N>(fetcher: &F, notifier: &N) -> RunOutcome
where
    F: ProductFetcher + ?Sized,
    N: Notifier + ?Sized,
{
    log::info!("Starting fetch cycle");

    let product = match fetcher.fetch_product().await {
        Ok(product) => product,
        Err(FetchError::NoProductAvailable(failures)) => {
            for failure in &failures {
                log::warn!("Endpoint failed: {failure}");
            }
            log::warn!("No product fetched, skipping this cycle");
            return RunOutcome::NoProduct;
        }
        Err(e) => {
            log::error!("Failed to fetch product: {e}");
            return RunOutcome::NoProduct;
        }
    };

    if let Ok(json) = serde_json::to_string(&product) {
        log::debug!("Fetched product {json}");
    }

    let announcement = format_announcement(&product, notifier.parse_mode());
    match notifier.notify(&announcement).await {
        Ok(method) => {
            log::info!("Posted \"{}\" via {method}", product.title);
            RunOutcome::Posted {
                title: product.title,
                method,
            }
        }
        Err(e) => {
            log::error!("Failed to send \"{}\": {e}", product.title);
            RunOutcome::DeliveryFailed {
                title: product.title,
            }
        }
    }
}

/// Repeats [`run_once`] with a fixed pause between cycles until Ctrl-C.
pub async fn run_forever<F, N>(fetcher: &F, notifier: &N, interval: Duration)
where
    F: ProductFetcher + ?Sized,
    N: Notifier + ?Sized,
{
    run_until(fetcher, notifier, interval, interrupted()).await
}

/// Repeats [`run_once`] with a fixed pause between cycles until `shutdown`
/// completes. A shutdown requested mid-cycle takes effect once that cycle
/// has finished.
pub async fn run_until<F, N, S>(fetcher: &F, notifier: &N, interval: Duration, shutdown: S)
where
    F: ProductFetcher + ?Sized,
    N: Notifier + ?Sized,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let cycle = run_once(fetcher, notifier);
        tokio::pin!(cycle);

        let mut stopping = false;
        let outcome = tokio::select! {
            outcome = &mut cycle => outcome,
            _ = &mut shutdown => {
                log::info!("Interrupted, finishing the current cycle");
                stopping = true;
                cycle.await
            }
        };
        log::debug!("Cycle finished: {outcome:?}");
        if stopping {
            return;
        }

        log::info!("Sleeping for {}s", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => {
                log::info!("Interrupted, stopping");
                return;
            }
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
