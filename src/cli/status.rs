//! Status command implementation
//!
//! Reads the published artifacts and reports how fresh they are.

use crate::artifact::{ArtifactRepository, FileArtifactRepository};
use crate::config::{ArtifactBackend, Config};
use chrono::{DateTime, Utc};
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Artifacts older than this are reported stale
    #[arg(long, default_value_t = 5)]
    pub max_age_secs: i64,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if config.artifacts.backend != ArtifactBackend::File {
            anyhow::bail!("status reads file artifacts; artifacts.backend is not \"file\"");
        }

        let repo = FileArtifactRepository::new(&config.artifacts.dir);
        let symbol = config.market.symbol.to_lowercase();
        let now = Utc::now();

        println!("strike-engine status ({})", symbol);
        println!("  Artifacts: {}", repo.dir().display());

        match repo.live_probabilities(&symbol).await? {
            Some(live) => println!(
                "  Live probabilities: {} strikes, bucket {}, {}",
                live.strikes.len(),
                live.momentum_bucket,
                self.freshness(live.timestamp, now)
            ),
            None => println!("  Live probabilities: not published"),
        }

        match repo.strike_table(&symbol).await? {
            Some(table) => {
                println!(
                    "  Strike table: {} rows, event {}, ttc {}s, {}",
                    table.rows.len(),
                    table.event_id,
                    table.ttc_seconds,
                    self.freshness(table.last_updated, now)
                );
                println!(
                    "  Price: {}  momentum {:+.4}%  table {}",
                    table.current_price, table.momentum.weighted_score, table.fingerprint_id
                );
            }
            None => println!("  Strike table: not published"),
        }

        Ok(())
    }

    fn freshness(&self, published: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let age = (now - published).num_seconds().max(0);
        if age > self.max_age_secs {
            format!("STALE ({}s old)", age)
        } else {
            format!("fresh ({}s old)", age)
        }
    }
}
