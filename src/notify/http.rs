//! HTTP webhook notifier

use super::{Notifier, PublishEvent};
use crate::telemetry::{increment_counter, CounterMetric};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// POSTs each `PublishEvent` as JSON to every configured URL
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    urls: Arc<Vec<String>>,
}

impl HttpNotifier {
    pub fn new(urls: Vec<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            urls: Arc::new(urls),
        })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, event: PublishEvent) {
        for url in self.urls.iter().cloned() {
            let client = self.client.clone();
            let event = event.clone();

            tokio::spawn(async move {
                match client.post(&url).json(&event).send().await {
                    Ok(response) if response.status().is_success() => {
                        debug!(url = %url, cycle = event.cycle, "Publish notification delivered");
                    }
                    Ok(response) => {
                        increment_counter(CounterMetric::NotificationFailed);
                        warn!(
                            url = %url,
                            cycle = event.cycle,
                            status = %response.status(),
                            "Publish notification rejected"
                        );
                    }
                    Err(e) => {
                        increment_counter(CounterMetric::NotificationFailed);
                        warn!(url = %url, cycle = event.cycle, error = %e, "Publish notification failed");
                    }
                }
            });
        }
    }
}
