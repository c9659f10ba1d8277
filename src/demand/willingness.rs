//! Willingness to pay for fixed broadband, derived from premise demographics.
//!
//! Each premise's demographic attributes are scored against four lookup tables. The summed
//! score maps to a monthly willingness to pay through fixed thresholds.
use crate::area::LADID;
use crate::fixed::{FixedNetwork, HouseholdID};
use crate::units::Money;
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;

/// Score thresholds and the monthly willingness to pay below each, in GBP
const WTP_THRESHOLDS: [(i32, f64); 4] = [(4, 20.0), (8, 30.0), (12, 40.0), (16, 50.0)];

/// Monthly willingness to pay for scores at or above the top threshold
const WTP_MAX: f64 = 60.0;

/// The proportion of premises which may be dropped from the join before warning
const DROPPED_WARNING_THRESHOLD: f64 = 0.01;

/// The demographic attributes of a premise's occupants
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Demographics {
    /// Age band
    pub age: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Nation of the UK
    pub nation: Option<String>,
    /// Socio-economic status
    pub ses: Option<String>,
}

/// A table of scores for the categories of one demographic attribute
pub type ScoreTable = HashMap<String, i32>;

/// Scores for each demographic attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WtpScores {
    /// Scores by age band
    pub age: ScoreTable,
    /// Scores by gender
    pub gender: ScoreTable,
    /// Scores by nation
    pub nation: ScoreTable,
    /// Scores by socio-economic status
    pub ses: ScoreTable,
}

impl WtpScores {
    /// The total score for a set of demographics, or `None` if any category is missing or unknown
    pub fn score(&self, demographics: &Demographics) -> Option<i32> {
        let lookup = |table: &ScoreTable, category: Option<&String>| {
            category.and_then(|c| table.get(c)).copied()
        };

        Some(
            lookup(&self.age, demographics.age.as_ref())?
                + lookup(&self.gender, demographics.gender.as_ref())?
                + lookup(&self.nation, demographics.nation.as_ref())?
                + lookup(&self.ses, demographics.ses.as_ref())?,
        )
    }
}

/// Map a total demographic score to a monthly willingness to pay
pub fn wtp_from_score(score: i32) -> Money {
    let wtp = WTP_THRESHOLDS
        .iter()
        .find(|(threshold, _)| score < *threshold)
        .map_or(WTP_MAX, |(_, wtp)| *wtp);

    Money(wtp)
}

/// Monthly willingness to pay for a set of demographics, if they can be scored
pub fn willingness_to_pay(demographics: &Demographics, scores: &WtpScores) -> Option<Money> {
    scores.score(demographics).map(wtp_from_score)
}

/// The outcome of joining premises against the score tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    /// Premises for which a willingness to pay was found
    pub matched: usize,
    /// Premises dropped because of a missing or unknown category
    pub dropped: usize,
}

impl JoinSummary {
    /// The proportion of premises dropped
    pub fn dropped_fraction(&self) -> f64 {
        let total = self.matched + self.dropped;
        if total == 0 {
            0.0
        } else {
            self.dropped as f64 / total as f64
        }
    }
}

/// Compute and cache the willingness to pay of every premise in the network.
///
/// Premises which cannot be scored are left without a willingness to pay. A warning is logged if
/// more than 1% of premises are dropped.
pub fn assign_willingness_to_pay(network: &mut FixedNetwork, scores: &WtpScores) -> JoinSummary {
    let mut summary = JoinSummary::default();
    for premise in network.premises_mut() {
        premise.wtp = willingness_to_pay(&premise.demographics, scores);
        if premise.wtp.is_some() {
            summary.matched += 1;
        } else {
            summary.dropped += 1;
        }
    }

    if summary.dropped_fraction() > DROPPED_WARNING_THRESHOLD {
        warn!(
            "{} of {} premises ({:.1}%) have missing or unknown demographic categories and were \
            dropped from the willingness-to-pay calculation",
            summary.dropped,
            summary.matched + summary.dropped,
            summary.dropped_fraction() * 100.0
        );
    }

    summary
}

/// Willingness to pay and accept aggregated over the premises of one household
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdDemand {
    /// Household identifier
    pub household_id: HouseholdID,
    /// The LAD of the exchange serving the household
    pub lad_id: LADID,
    /// Number of premises in the household
    pub premises: usize,
    /// Summed monthly willingness to pay
    pub wtp: Money,
    /// Mean willingness to accept, over premises for which it is known
    pub wta: Option<f64>,
}

/// Aggregate premise willingness to pay/accept by (household, LAD), in order of first appearance.
///
/// Premises without a willingness to pay were dropped by the demographic join and are left out,
/// so a household none of whose premises matched does not appear.
pub fn aggregate_households(network: &FixedNetwork) -> Vec<HouseholdDemand> {
    #[derive(Default)]
    struct Accumulator {
        premises: usize,
        wtp: Money,
        wta_sum: f64,
        wta_count: usize,
    }

    let mut households: IndexMap<(&HouseholdID, &LADID), Accumulator> = IndexMap::new();
    for exchange in network.exchanges() {
        for premise in exchange.premises() {
            let (Some(household_id), Some(wtp)) = (&premise.household_id, premise.wtp) else {
                continue;
            };

            let acc = households
                .entry((household_id, &exchange.lad_id))
                .or_default();
            acc.premises += 1;
            acc.wtp += wtp;
            if let Some(wta) = premise.wta {
                acc.wta_sum += wta;
                acc.wta_count += 1;
            }
        }
    }

    households
        .into_iter()
        .map(|((household_id, lad_id), acc)| HouseholdDemand {
            household_id: household_id.clone(),
            lad_id: lad_id.clone(),
            premises: acc.premises,
            wtp: acc.wtp,
            wta: (acc.wta_count > 0).then(|| acc.wta_sum / acc.wta_count as f64),
        })
        .collect()
}
