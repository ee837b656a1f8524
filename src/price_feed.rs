// Price Feed Integration
//
// The vault never stores prices. Every operation asks a PriceOracle for a fresh
// max or min price per asset. SampledPriceFeed is the reference oracle: reporters
// submit into rounds, a round's price is the median of its submissions, and the
// answer is the extreme over the last few rounds widened by a per-asset spread.

use crate::config::PriceFeedConfig;
use crate::math;
use crate::types::{AssetId, Price, Timestamp, BASIS_POINTS_DIVISOR};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Unique identifier for a price reporter
pub type PriceSourceId = u32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("no price available for {0}")]
    NoPriceAvailable(AssetId),

    #[error("stale price for {asset}: {age_secs}s old, max {max_age_secs}s")]
    StalePrice { asset: AssetId, age_secs: u64, max_age_secs: u64 },

    #[error("latest round for {asset} has {available} of {required} sources")]
    InsufficientQuorum { asset: AssetId, required: usize, available: usize },

    #[error("price for {0} is out of range")]
    InvalidPrice(AssetId),
}

/// Read-only price capability consumed by the vault and the order book.
pub trait PriceOracle {
    /// `maximise` picks the upper bound of the sampled range, otherwise the lower.
    /// `prefer_strict_stable` pins stable assets to 1 USD when close enough.
    /// `ignore_latest_quorum` lets a still-open latest round count.
    fn get_price(
        &self,
        asset: AssetId,
        maximise: bool,
        prefer_strict_stable: bool,
        ignore_latest_quorum: bool,
    ) -> Result<Price, OracleError>;
}

/// One reporting round for an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRound {
    pub round_id: u64,
    pub submissions: Vec<(PriceSourceId, Price)>,
    pub updated_at: Timestamp,
    // set for rounds pushed directly by the feed owner
    pub is_final: bool,
}

impl PriceRound {
    fn has_quorum(&self, min_sources: usize) -> bool {
        self.is_final || self.submissions.len() >= min_sources
    }

    pub fn median(&self) -> Option<Price> {
        let mut sorted: Vec<Price> = self.submissions.iter().map(|(_, p)| *p).collect();
        sorted.sort();

        let len = sorted.len();
        if len == 0 {
            return None;
        }

        if len % 2 == 0 {
            let low = sorted[len / 2 - 1].value();
            let high = sorted[len / 2].value();
            Price::new(low + (high - low) / 2)
        } else {
            Some(sorted[len / 2])
        }
    }
}

#[derive(Debug, Clone, Default)]
struct AssetFeed {
    spread_bps: u32,
    is_strict_stable: bool,
    rounds: VecDeque<PriceRound>,
    next_round_id: u64,
}

#[derive(Debug, Clone)]
pub struct SampledPriceFeed {
    config: PriceFeedConfig,
    assets: HashMap<AssetId, AssetFeed>,
    current_time: Timestamp,
    max_history: usize,
}

impl SampledPriceFeed {
    pub fn new(config: PriceFeedConfig) -> Self {
        Self {
            config,
            assets: HashMap::new(),
            current_time: Timestamp::default(),
            max_history: 64,
        }
    }

    pub fn config(&self) -> &PriceFeedConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    /// Register an asset with its spread and strict-stable flag.
    pub fn set_asset(&mut self, asset: AssetId, spread_bps: u32, is_strict_stable: bool) {
        let feed = self.feed_mut(asset);
        feed.spread_bps = spread_bps;
        feed.is_strict_stable = is_strict_stable;
    }

    /// Add a reporter's price to the open round, starting a new round once the
    /// previous one reached quorum. A repeat submission replaces the reporter's value.
    pub fn submit_price(&mut self, asset: AssetId, source: PriceSourceId, price: Price) {
        let now = self.current_time;
        let min_sources = self.config.min_sources;
        let feed = self.feed_mut(asset);

        if let Some(open) = feed.rounds.back_mut().filter(|r| !r.has_quorum(min_sources)) {
            match open.submissions.iter_mut().find(|(id, _)| *id == source) {
                Some(entry) => entry.1 = price,
                None => open.submissions.push((source, price)),
            }
            open.updated_at = now;
            return;
        }

        let round_id = feed.next_round_id;
        feed.next_round_id += 1;
        feed.rounds.push_back(PriceRound {
            round_id,
            submissions: vec![(source, price)],
            updated_at: now,
            is_final: false,
        });
        self.trim(asset);
    }

    /// Push a finalised round with a single answer. Used by the feed owner and tests.
    pub fn set_latest_answer(&mut self, asset: AssetId, price: Price) {
        let now = self.current_time;
        let feed = self.feed_mut(asset);
        let round_id = feed.next_round_id;
        feed.next_round_id += 1;
        feed.rounds.push_back(PriceRound {
            round_id,
            submissions: vec![(0, price)],
            updated_at: now,
            is_final: true,
        });
        self.trim(asset);
    }

    pub fn latest_round(&self, asset: AssetId) -> Option<&PriceRound> {
        self.assets.get(&asset).and_then(|f| f.rounds.back())
    }

    fn feed_mut(&mut self, asset: AssetId) -> &mut AssetFeed {
        let spread_bps = self.config.spread_bps;
        self.assets.entry(asset).or_insert_with(|| AssetFeed {
            spread_bps,
            ..AssetFeed::default()
        })
    }

    fn trim(&mut self, asset: AssetId) {
        let max_history = self.max_history;
        if let Some(feed) = self.assets.get_mut(&asset) {
            while feed.rounds.len() > max_history {
                feed.rounds.pop_front();
            }
        }
    }

    // newest first. only the latest round can be below quorum
    fn sample(&self, asset: AssetId, feed: &AssetFeed, maximise: bool, ignore_latest_quorum: bool) -> Result<Price, OracleError> {
        let min_sources = self.config.min_sources;
        let mut picked: Option<Price> = None;
        let mut newest: Option<Timestamp> = None;
        let mut counted = 0usize;

        for (i, round) in feed.rounds.iter().rev().enumerate() {
            if counted >= self.config.sample_space {
                break;
            }
            let include = round.has_quorum(min_sources) || (i == 0 && ignore_latest_quorum);
            if !include {
                continue;
            }
            let Some(price) = round.median() else { continue };
            counted += 1;
            newest = newest.or(Some(round.updated_at));
            picked = Some(match picked {
                None => price,
                Some(current) if maximise => current.max(price),
                Some(current) => current.min(price),
            });
        }

        let (Some(price), Some(updated_at)) = (picked, newest) else {
            return match feed.rounds.back() {
                Some(latest) => Err(OracleError::InsufficientQuorum {
                    asset,
                    required: min_sources,
                    available: latest.submissions.len(),
                }),
                None => Err(OracleError::NoPriceAvailable(asset)),
            };
        };

        let age_secs = self.current_time.secs_since(updated_at);
        if age_secs > self.config.max_price_age_secs {
            return Err(OracleError::StalePrice {
                asset,
                age_secs,
                max_age_secs: self.config.max_price_age_secs,
            });
        }

        Ok(price)
    }
}

impl PriceOracle for SampledPriceFeed {
    fn get_price(
        &self,
        asset: AssetId,
        maximise: bool,
        prefer_strict_stable: bool,
        ignore_latest_quorum: bool,
    ) -> Result<Price, OracleError> {
        let feed = self.assets.get(&asset).ok_or(OracleError::NoPriceAvailable(asset))?;
        let price = self.sample(asset, feed, maximise, ignore_latest_quorum)?;

        if prefer_strict_stable && feed.is_strict_stable {
            let one_usd = Price::one_usd();
            let deviation = math::abs_diff(price.value(), one_usd.value());
            if deviation <= self.config.max_strict_price_deviation {
                return Ok(one_usd);
            }
            // outside the band keep whichever side is worse for the caller
            if maximise && price > one_usd {
                return Ok(price);
            }
            if !maximise && price < one_usd {
                return Ok(price);
            }
            return Ok(one_usd);
        }

        let divisor = U256::from(BASIS_POINTS_DIVISOR);
        let spread = U256::from(feed.spread_bps);
        let factor = if maximise { divisor + spread } else { divisor.saturating_sub(spread) };
        let widened = math::mul_div(price.value(), factor, divisor).map_err(|_| OracleError::InvalidPrice(asset))?;
        Price::new(widened).ok_or(OracleError::InvalidPrice(asset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTC: AssetId = AssetId(1);
    const DAI: AssetId = AssetId(2);

    fn usd(units: u64) -> Price {
        Price::from_units(units).unwrap()
    }

    fn feed() -> SampledPriceFeed {
        let mut feed = SampledPriceFeed::new(PriceFeedConfig::default());
        feed.set_asset(BTC, 0, false);
        feed.set_asset(DAI, 0, true);
        feed
    }

    #[test]
    fn test_max_and_min_over_sample_space() {
        let mut feed = feed();
        feed.set_latest_answer(BTC, usd(40000));
        feed.set_latest_answer(BTC, usd(41000));
        feed.set_latest_answer(BTC, usd(40000));

        assert_eq!(feed.get_price(BTC, true, false, false).unwrap(), usd(41000));
        assert_eq!(feed.get_price(BTC, false, false, false).unwrap(), usd(40000));

        // oldest round falls out of the window of three
        feed.set_latest_answer(BTC, usd(40000));
        feed.set_latest_answer(BTC, usd(40000));
        assert_eq!(feed.get_price(BTC, true, false, false).unwrap(), usd(40000));
    }

    #[test]
    fn test_round_median_with_quorum() {
        let config = PriceFeedConfig { min_sources: 3, ..Default::default() };
        let mut feed = SampledPriceFeed::new(config);
        feed.set_asset(BTC, 0, false);

        feed.submit_price(BTC, 1, usd(49900));
        feed.submit_price(BTC, 2, usd(50100));
        let result = feed.get_price(BTC, true, false, false);
        assert!(matches!(result, Err(OracleError::InsufficientQuorum { available: 2, .. })));

        // the open round counts when quorum is waived. median of two is the midpoint
        assert_eq!(feed.get_price(BTC, true, false, true).unwrap(), usd(50000));

        feed.submit_price(BTC, 3, usd(50000));
        assert_eq!(feed.get_price(BTC, true, false, false).unwrap(), usd(50000));
    }

    #[test]
    fn test_stale_price() {
        let mut feed = feed();
        feed.set_latest_answer(BTC, usd(50000));
        let max_age = feed.config().max_price_age_secs;

        feed.advance_time(max_age);
        assert!(feed.get_price(BTC, true, false, false).is_ok());

        feed.advance_time(1);
        assert!(matches!(
            feed.get_price(BTC, true, false, false),
            Err(OracleError::StalePrice { .. })
        ));
    }

    #[test]
    fn test_spread_widens_both_sides() {
        let mut feed = feed();
        feed.set_asset(BTC, 10, false);
        feed.set_latest_answer(BTC, usd(10000));

        assert_eq!(feed.get_price(BTC, true, false, false).unwrap(), usd(10010));
        assert_eq!(feed.get_price(BTC, false, false, false).unwrap(), usd(9990));
    }

    #[test]
    fn test_strict_stable_snaps_to_one() {
        let mut feed = feed();
        // 1.0001 is inside the default band
        let near_peg = Price::new(Price::one_usd().value() + Price::one_usd().value() / 10_000).unwrap();
        feed.set_latest_answer(DAI, near_peg);

        assert_eq!(feed.get_price(DAI, true, true, false).unwrap(), Price::one_usd());
        assert_eq!(feed.get_price(DAI, true, false, false).unwrap(), near_peg);
    }

    #[test]
    fn test_unknown_asset() {
        let feed = feed();
        assert_eq!(
            feed.get_price(AssetId(99), true, false, false),
            Err(OracleError::NoPriceAvailable(AssetId(99)))
        );
        assert_eq!(
            feed.get_price(BTC, true, false, false),
            Err(OracleError::NoPriceAvailable(BTC))
        );
    }
}
