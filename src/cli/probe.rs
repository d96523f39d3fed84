//! Probe command implementation
//!
//! One-shot engine query against the configured fingerprint tables.

use crate::config::Config;
use crate::pipeline::build_strike_ladder;
use crate::probability::{StrikeProbability, StrikeSide};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Current price
    #[arg(long)]
    pub price: Decimal,

    /// Seconds to settlement
    #[arg(long)]
    pub ttc_secs: f64,

    /// Weighted momentum score in percent (0.12 = +0.12%)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub momentum: f64,

    /// Strikes to price; defaults to the configured ladder around the price
    #[arg(long, value_delimiter = ',')]
    pub strikes: Vec<Decimal>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl ProbeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut engine = super::load_engine(config)?;

        let strikes = if self.strikes.is_empty() {
            build_strike_ladder(
                self.price,
                config.pipeline.strike_step,
                config.pipeline.strike_levels,
            )
        } else {
            self.strikes.clone()
        };

        let probabilities =
            engine.calculate_strike_probabilities(self.price, self.ttc_secs, &strikes, self.momentum);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&probabilities)?);
            return Ok(());
        }

        println!(
            "{} @ {}  ttc={}s  momentum={:+.4}%  table={}",
            engine.symbol(),
            self.price,
            self.ttc_secs,
            self.momentum,
            engine.fingerprint_id()
        );
        println!(
            "{:>12} {:>6} {:>8} {:>8} {:>8}",
            "strike", "side", "move%", "beyond", "within"
        );
        for p in &probabilities {
            println!("{}", format_row(p));
        }
        if engine.fallback_count() > 0 {
            println!("({} nearest-sample fallbacks)", engine.fallback_count());
        }

        Ok(())
    }
}

fn format_row(p: &StrikeProbability) -> String {
    let side = match p.direction {
        StrikeSide::Above => "above",
        StrikeSide::Below => "below",
    };
    format!(
        "{:>12} {:>6} {:>8.3} {:>8.2} {:>8.2}",
        p.strike, side, p.move_percent, p.prob_beyond, p.prob_within
    )
}
