//! Upgrade costs and benefits for nodes of the fixed access tree.
use super::{AccessTechnology, Cabinet, DistributionPoint, Premise};
use crate::model::fixed::CostParameters;
use crate::units::{Dimensionless, Money};
use anyhow::{Result, bail};

/// Cost of bringing FTTP to every premise of a distribution point not already on it
fn fttp_distribution_cost(dp: &DistributionPoint, costs: &CostParameters) -> Money {
    let premises: Money = dp
        .premises
        .values()
        .filter(|premise| !premise.technologies.fttp)
        .map(|premise| premise.link_length * costs.fibre_per_metre + costs.premise_fttp_terminal)
        .sum();

    if dp.technologies.fttp {
        premises
    } else {
        premises + costs.dp_fttp_head_end
    }
}

/// Cost of G.fast electronics at a distribution point, excluding any cabinet interface
fn gfast_distribution_cost(dp: &DistributionPoint, costs: &CostParameters) -> Money {
    if dp.technologies.gfast {
        Money(0.0)
    } else {
        costs.dp_gfast_unit + dp.link_length * costs.fibre_per_metre
    }
}

/// Cost of the G.fast interface at a cabinet, if it lacks one
fn gfast_interface_cost(cabinet: &Cabinet, costs: &CostParameters) -> Money {
    if cabinet.technologies.gfast {
        Money(0.0)
    } else {
        costs.cabinet_gfast_interface
    }
}

/// The cost of deploying `technology` at a distribution point
pub fn distribution_cost(
    dp: &DistributionPoint,
    cabinet: &Cabinet,
    technology: AccessTechnology,
    costs: &CostParameters,
) -> Result<Money> {
    match technology {
        AccessTechnology::Fttp => Ok(fttp_distribution_cost(dp, costs)),
        AccessTechnology::GFast => {
            Ok(gfast_distribution_cost(dp, costs) + gfast_interface_cost(cabinet, costs))
        }
        _ => bail!("{technology} cannot be deployed at a distribution point"),
    }
}

/// The cost of deploying `technology` at a cabinet and every distribution point it serves
pub fn cabinet_cost(
    cabinet: &Cabinet,
    technology: AccessTechnology,
    costs: &CostParameters,
) -> Result<Money> {
    let cost = match technology {
        AccessTechnology::Fttp => cabinet
            .distributions
            .values()
            .map(|dp| fttp_distribution_cost(dp, costs))
            .sum(),
        AccessTechnology::GFast => {
            let dps: Money = cabinet
                .distributions
                .values()
                .map(|dp| gfast_distribution_cost(dp, costs))
                .sum();
            dps + gfast_interface_cost(cabinet, costs)
        }
        AccessTechnology::Fttc => {
            if cabinet.technologies.fttc {
                Money(0.0)
            } else {
                costs.cabinet_fttc_unit + cabinet.link_length * costs.fibre_per_metre
            }
        }
        _ => bail!("{technology} cannot be deployed at a cabinet"),
    };

    Ok(cost)
}

/// The benefit of upgrading a group of premises
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Benefit {
    /// Number of premises whose best technology would improve
    pub premises: usize,
    /// Total willingness to pay of those premises over the benefit horizon
    pub value: Money,
}

/// The benefit of bringing `target` to the given premises.
///
/// Only premises whose best technology is slower than `target` are reached. Premises without a
/// willingness to pay count as reached but add no value.
pub fn benefit<'a, I>(premises: I, target: AccessTechnology, benefit_months: f64) -> Benefit
where
    I: IntoIterator<Item = &'a Premise>,
{
    premises
        .into_iter()
        .filter(|premise| premise.technologies.best() < target)
        .fold(Benefit::default(), |acc, premise| Benefit {
            premises: acc.premises + 1,
            value: acc.value
                + premise.wtp.unwrap_or_default() * Dimensionless(benefit_months),
        })
}

/// The benefit-cost ratio of an upgrade
pub fn benefit_cost_ratio(benefit: Money, cost: Money) -> f64 {
    (benefit / cost).value()
}
