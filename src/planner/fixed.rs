//! The fixed-access rollout planner.
//!
//! Every distribution point or cabinet (depending on the strategy) is a candidate for upgrading
//! to the strategy's technology. Candidates are ranked by benefit-cost ratio and committed in
//! order until the first one the remaining budget cannot cover.
use super::Budget;
use crate::fixed::cost::{Benefit, benefit, benefit_cost_ratio, cabinet_cost, distribution_cost};
use crate::fixed::{
    AccessTechnology, CabinetID, DistributionID, ExchangeID, FixedNetwork, PlantLevel,
};
use crate::model::fixed::FixedParameters;
use crate::strategy::FixedStrategy;
use crate::units::{Dimensionless, Money};
use anyhow::Result;
use std::fmt;

/// The node of the access tree an upgrade is applied to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateNode {
    /// A distribution point
    Distribution(DistributionID),
    /// A cabinet
    Cabinet(CabinetID),
}

impl CandidateNode {
    /// The level of the tree the node sits at
    pub fn level(&self) -> PlantLevel {
        match self {
            Self::Distribution(_) => PlantLevel::Distribution,
            Self::Cabinet(_) => PlantLevel::Cabinet,
        }
    }
}

impl fmt::Display for CandidateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distribution(id) => write!(f, "{id}"),
            Self::Cabinet(id) => write!(f, "{id}"),
        }
    }
}

/// A possible upgrade of one node
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutCandidate {
    /// The node upgraded
    pub node: CandidateNode,
    /// The exchange the node belongs to
    pub exchange_id: ExchangeID,
    /// The technology deployed
    pub technology: AccessTechnology,
    /// Number of premises whose best technology would improve
    pub premises: usize,
    /// Cost of the upgrade, after any subsidy
    pub cost: Money,
    /// Value of the upgrade to the premises reached
    pub benefit: Money,
    /// Benefit-cost ratio
    pub bcr: f64,
}

/// The outcome of planning one year
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPlan {
    /// Candidates committed, in order
    pub committed: Vec<RolloutCandidate>,
    /// The budget after planning
    pub budget: Budget,
}

/// Enumerate and rank every candidate upgrade for a strategy.
///
/// Nodes which would reach no premises or cost nothing are not candidates.
pub fn rollout_candidates(
    network: &FixedNetwork,
    strategy: FixedStrategy,
    parameters: &FixedParameters,
) -> Result<Vec<RolloutCandidate>> {
    let FixedStrategy::Rollout {
        technology,
        level,
        subsidised,
    } = strategy
    else {
        return Ok(Vec::new());
    };

    let multiplier = Dimensionless(if subsidised {
        parameters.subsidy_cost_multiplier
    } else {
        1.0
    });
    let mut candidates = Vec::new();
    let mut push_candidate =
        |node: CandidateNode, exchange_id: &ExchangeID, cost: Money, benefit: Benefit| {
            let cost = cost * multiplier;
            if benefit.premises == 0 || cost <= Money(0.0) {
                return;
            }
            candidates.push(RolloutCandidate {
                node,
                exchange_id: exchange_id.clone(),
                technology,
                premises: benefit.premises,
                cost,
                benefit: benefit.value,
                bcr: benefit_cost_ratio(benefit.value, cost),
            });
        };

    for exchange in network.exchanges() {
        for cabinet in exchange.cabinets.values() {
            if level == PlantLevel::Cabinet {
                let cost = cabinet_cost(cabinet, technology, &parameters.costs)?;
                let benefit = benefit(cabinet.premises(), technology, parameters.benefit_months);
                push_candidate(
                    CandidateNode::Cabinet(cabinet.id.clone()),
                    &exchange.id,
                    cost,
                    benefit,
                );
                continue;
            }

            for dp in cabinet.distributions.values() {
                let cost = distribution_cost(dp, cabinet, technology, &parameters.costs)?;
                let benefit = benefit(dp.premises.values(), technology, parameters.benefit_months);
                push_candidate(
                    CandidateNode::Distribution(dp.id.clone()),
                    &exchange.id,
                    cost,
                    benefit,
                );
            }
        }
    }

    rank_candidates(&mut candidates);
    Ok(candidates)
}

/// Sort candidates by descending BCR, then ascending cost, then ascending node ID
pub fn rank_candidates(candidates: &mut [RolloutCandidate]) {
    candidates.sort_by(|a, b| {
        b.bcr
            .total_cmp(&a.bcr)
            .then_with(|| a.cost.value().total_cmp(&b.cost.value()))
            .then_with(|| a.node.to_string().cmp(&b.node.to_string()))
    });
}

/// Commit ranked candidates until the first one which cannot be afforded
pub fn plan_year(
    network: &mut FixedNetwork,
    candidates: Vec<RolloutCandidate>,
    annual_budget: Money,
) -> Result<FixedPlan> {
    let mut budget = Budget::new(annual_budget);
    let mut committed = Vec::new();
    for candidate in candidates {
        if !budget.try_spend(candidate.cost) {
            break;
        }

        match &candidate.node {
            CandidateNode::Distribution(id) => {
                network.commit_distribution(id, candidate.technology)?;
            }
            CandidateNode::Cabinet(id) => network.commit_cabinet(id, candidate.technology)?,
        }
        committed.push(candidate);
    }

    Ok(FixedPlan { committed, budget })
}
