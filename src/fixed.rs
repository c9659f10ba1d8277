//! The fixed access plant: exchanges, cabinets, distribution points and premises.
//!
//! The plant is a forest owned top-down (exchange → cabinet → distribution point → premise).
//! Interior nodes are reached from the root by ID through explicit indices, so there are no
//! back-pointers from children to their parents.
use crate::area::LADID;
use crate::demand::willingness::Demographics;
use crate::id::{define_id_getter, define_id_type};
use crate::model::fixed::SpeedParameters;
use crate::units::{Length, Money, Speed};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod bands;
pub mod cost;

define_id_type! {ExchangeID}
define_id_type! {CabinetID}
define_id_type! {DistributionID}
define_id_type! {PremiseID}
define_id_type! {HouseholdID}

/// Copper distance bounds (in metres) separating the three speed bands
const BAND_BOUNDS: [f64; 2] = [1000.0, 3000.0];

/// A fixed-line access technology, ordered from slowest to fastest
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
    Serialize,
)]
#[serde(into = "&'static str")]
pub enum AccessTechnology {
    /// ADSL over the full copper line from the exchange
    #[strum(to_string = "adsl")]
    Adsl,
    /// Fibre to the cabinet with VDSL over copper from the cabinet
    #[strum(to_string = "fttc")]
    Fttc,
    /// Cable
    #[strum(to_string = "docsis3")]
    Docsis3,
    /// Fibre to the distribution point with G.fast over the final drop
    #[strum(to_string = "gfast")]
    GFast,
    /// Fibre to the premise
    #[strum(to_string = "fttp")]
    Fttp,
}

/// A level of the fixed access tree
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr, Serialize,
)]
#[serde(into = "&'static str")]
pub enum PlantLevel {
    /// An exchange
    #[strum(to_string = "exchange")]
    Exchange,
    /// A street cabinet
    #[strum(to_string = "cabinet")]
    Cabinet,
    /// A distribution point
    #[strum(to_string = "distribution")]
    Distribution,
    /// A premise
    #[strum(to_string = "premise")]
    Premise,
}

/// The set of technologies available at a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessTechnologies {
    /// Fibre to the premise
    pub fttp: bool,
    /// G.fast
    pub gfast: bool,
    /// Fibre to the cabinet
    pub fttc: bool,
    /// Cable
    pub docsis3: bool,
    /// ADSL
    pub adsl: bool,
}

impl AccessTechnologies {
    /// Whether the given technology is available
    pub fn has(&self, technology: AccessTechnology) -> bool {
        match technology {
            AccessTechnology::Fttp => self.fttp,
            AccessTechnology::GFast => self.gfast,
            AccessTechnology::Fttc => self.fttc,
            AccessTechnology::Docsis3 => self.docsis3,
            AccessTechnology::Adsl => self.adsl,
        }
    }

    /// Make the given technology available
    pub fn set(&mut self, technology: AccessTechnology) {
        match technology {
            AccessTechnology::Fttp => self.fttp = true,
            AccessTechnology::GFast => self.gfast = true,
            AccessTechnology::Fttc => self.fttc = true,
            AccessTechnology::Docsis3 => self.docsis3 = true,
            AccessTechnology::Adsl => self.adsl = true,
        }
    }

    /// The fastest available technology (ADSL if none is flagged)
    pub fn best(&self) -> AccessTechnology {
        [
            AccessTechnology::Fttp,
            AccessTechnology::GFast,
            AccessTechnology::Docsis3,
            AccessTechnology::Fttc,
        ]
        .into_iter()
        .find(|technology| self.has(*technology))
        .unwrap_or(AccessTechnology::Adsl)
    }
}

/// Counts of premises by their best available technology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TechnologyCounts {
    /// Premises on FTTP
    pub fttp: usize,
    /// Premises on G.fast
    pub gfast: usize,
    /// Premises on FTTC
    pub fttc: usize,
    /// Premises on cable
    pub docsis3: usize,
    /// Premises on ADSL only
    pub adsl: usize,
}

impl TechnologyCounts {
    /// Count one premise with the given best technology
    pub fn add(&mut self, technology: AccessTechnology) {
        match technology {
            AccessTechnology::Fttp => self.fttp += 1,
            AccessTechnology::GFast => self.gfast += 1,
            AccessTechnology::Fttc => self.fttc += 1,
            AccessTechnology::Docsis3 => self.docsis3 += 1,
            AccessTechnology::Adsl => self.adsl += 1,
        }
    }

    /// Total number of premises counted
    pub fn total(&self) -> usize {
        self.fttp + self.gfast + self.fttc + self.docsis3 + self.adsl
    }
}

impl<'a> FromIterator<&'a Premise> for TechnologyCounts {
    fn from_iter<I: IntoIterator<Item = &'a Premise>>(iter: I) -> Self {
        let mut counts = Self::default();
        for premise in iter {
            counts.add(premise.technologies.best());
        }
        counts
    }
}

/// The speed band (0, 1 or 2) for a copper line of the given length.
///
/// Band 0 is under 1 km, band 1 runs from 1 km to 3 km inclusive and band 2 is over 3 km.
pub fn copper_band(distance: Length) -> usize {
    let [near, far] = BAND_BOUNDS;
    match distance.value() {
        d if d < near => 0,
        d if d <= far => 1,
        _ => 2,
    }
}

/// A premise: a leaf of the access tree
#[derive(Debug, Clone, PartialEq)]
pub struct Premise {
    /// Premise identifier
    pub id: PremiseID,
    /// Length of the drop cable to the distribution point
    pub link_length: Length,
    /// Technologies available at the premise
    pub technologies: AccessTechnologies,
    /// Number of occupants
    pub occupants: u32,
    /// The household the premise belongs to, if known
    pub household_id: Option<HouseholdID>,
    /// Demographic attributes of the occupants
    pub demographics: Demographics,
    /// Willingness to accept, if known
    pub wta: Option<f64>,
    /// Monthly willingness to pay, if it could be derived from the demographics
    pub wtp: Option<Money>,
}
define_id_getter! {Premise, PremiseID}

/// A distribution point, serving a group of premises
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionPoint {
    /// Distribution point identifier
    pub id: DistributionID,
    /// Length of the link to the parent cabinet
    pub link_length: Length,
    /// Technologies installed at the distribution point
    pub technologies: AccessTechnologies,
    /// Premises served
    pub premises: IndexMap<PremiseID, Premise>,
}
define_id_getter! {DistributionPoint, DistributionID}

/// A street cabinet, serving a group of distribution points
#[derive(Debug, Clone, PartialEq)]
pub struct Cabinet {
    /// Cabinet identifier
    pub id: CabinetID,
    /// Length of the link to the parent exchange
    pub link_length: Length,
    /// Technologies installed at the cabinet
    pub technologies: AccessTechnologies,
    /// Distribution points served
    pub distributions: IndexMap<DistributionID, DistributionPoint>,
}
define_id_getter! {Cabinet, CabinetID}

impl Cabinet {
    /// Iterate over all premises served by the cabinet
    pub fn premises(&self) -> impl Iterator<Item = &Premise> {
        self.distributions.values().flat_map(|dp| dp.premises.values())
    }
}

/// A local exchange: the root of an access tree
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Exchange identifier
    pub id: ExchangeID,
    /// Exchange name
    pub name: String,
    /// The LAD in which the exchange lies
    pub lad_id: LADID,
    /// Geotype label of the exchange area
    pub geotype: String,
    /// Cabinets served
    pub cabinets: IndexMap<CabinetID, Cabinet>,
}
define_id_getter! {Exchange, ExchangeID}

impl Exchange {
    /// Iterate over all premises served by the exchange
    pub fn premises(&self) -> impl Iterator<Item = &Premise> {
        self.cabinets.values().flat_map(Cabinet::premises)
    }

    /// Number of premises served
    pub fn premise_count(&self) -> usize {
        self.premises().count()
    }

    /// Total number of occupants of the premises served
    pub fn occupants(&self) -> u64 {
        self.premises().map(|p| u64::from(p.occupants)).sum()
    }

    /// Counts of premises by best available technology
    pub fn technology_counts(&self) -> TechnologyCounts {
        self.premises().collect()
    }

    /// The delivered speed of every premise served, in tree order
    pub fn premise_speeds<'a>(
        &'a self,
        speeds: &'a SpeedParameters,
    ) -> impl Iterator<Item = Speed> + 'a {
        self.cabinets.values().flat_map(move |cabinet| {
            cabinet.distributions.values().flat_map(move |dp| {
                dp.premises
                    .values()
                    .map(move |premise| premise_speed(premise, dp, cabinet, speeds))
            })
        })
    }

    /// Mean delivered speed over premises served (zero if there are none)
    pub fn average_speed(&self, speeds: &SpeedParameters) -> Speed {
        let (count, total) = self
            .premise_speeds(speeds)
            .fold((0usize, Speed(0.0)), |(count, total), speed| {
                (count + 1, total + speed)
            });
        if count == 0 {
            Speed(0.0)
        } else {
            Speed(total.value() / count as f64)
        }
    }
}

/// The delivered speed of a premise under its best available technology.
///
/// Copper technologies degrade with distance: FTTC is limited by the copper from the cabinet
/// (premise drop plus distribution link) and ADSL by the copper from the exchange.
pub fn premise_speed(
    premise: &Premise,
    dp: &DistributionPoint,
    cabinet: &Cabinet,
    speeds: &SpeedParameters,
) -> Speed {
    match premise.technologies.best() {
        AccessTechnology::Fttp => speeds.fttp,
        AccessTechnology::GFast => speeds.gfast,
        AccessTechnology::Docsis3 => speeds.docsis3,
        AccessTechnology::Fttc => {
            speeds.fttc_by_band[copper_band(premise.link_length + dp.link_length)]
        }
        AccessTechnology::Adsl => {
            let distance = premise.link_length + dp.link_length + cabinet.link_length;
            speeds.adsl_by_band[copper_band(distance)]
        }
    }
}

/// The fixed access network: a forest of exchange trees with indices into it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedNetwork {
    exchanges: IndexMap<ExchangeID, Exchange>,
    cabinet_index: HashMap<CabinetID, ExchangeID>,
    distribution_index: HashMap<DistributionID, (ExchangeID, CabinetID)>,
}

impl FixedNetwork {
    /// Create a new network from fully-built exchange trees
    pub fn new(exchanges: IndexMap<ExchangeID, Exchange>) -> Self {
        let mut cabinet_index = HashMap::new();
        let mut distribution_index = HashMap::new();
        for exchange in exchanges.values() {
            for cabinet in exchange.cabinets.values() {
                cabinet_index.insert(cabinet.id.clone(), exchange.id.clone());
                for dp in cabinet.distributions.values() {
                    distribution_index
                        .insert(dp.id.clone(), (exchange.id.clone(), cabinet.id.clone()));
                }
            }
        }

        Self {
            exchanges,
            cabinet_index,
            distribution_index,
        }
    }

    /// Iterate over exchanges in input order
    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.values()
    }

    /// Get an exchange by ID
    pub fn exchange(&self, id: &ExchangeID) -> Option<&Exchange> {
        self.exchanges.get(id)
    }

    /// Iterate over every premise in the network
    pub fn premises(&self) -> impl Iterator<Item = &Premise> {
        self.exchanges.values().flat_map(Exchange::premises)
    }

    /// Iterate mutably over every premise in the network
    pub fn premises_mut(&mut self) -> impl Iterator<Item = &mut Premise> {
        self.exchanges.values_mut().flat_map(|exchange| {
            exchange.cabinets.values_mut().flat_map(|cabinet| {
                cabinet
                    .distributions
                    .values_mut()
                    .flat_map(|dp| dp.premises.values_mut())
            })
        })
    }

    /// Get a cabinet and the ID of its exchange
    pub fn cabinet(&self, id: &CabinetID) -> Option<(&Cabinet, &ExchangeID)> {
        let exchange_id = self.cabinet_index.get(id)?;
        let cabinet = self.exchanges.get(exchange_id)?.cabinets.get(id)?;
        Some((cabinet, exchange_id))
    }

    /// Get a distribution point, its parent cabinet and the ID of its exchange
    pub fn distribution(
        &self,
        id: &DistributionID,
    ) -> Option<(&DistributionPoint, &Cabinet, &ExchangeID)> {
        let (exchange_id, cabinet_id) = self.distribution_index.get(id)?;
        let cabinet = self.exchanges.get(exchange_id)?.cabinets.get(cabinet_id)?;
        let dp = cabinet.distributions.get(id)?;
        Some((dp, cabinet, exchange_id))
    }

    /// Deploy a technology at a distribution point.
    ///
    /// The distribution point and every premise it serves gain the technology. G.fast also
    /// requires an interface at the parent cabinet, which is flagged too.
    pub fn commit_distribution(
        &mut self,
        id: &DistributionID,
        technology: AccessTechnology,
    ) -> Result<()> {
        let (exchange_id, cabinet_id) = self
            .distribution_index
            .get(id)
            .with_context(|| format!("Unknown distribution point {id}"))?;
        let cabinet = self
            .exchanges
            .get_mut(exchange_id)
            .and_then(|exchange| exchange.cabinets.get_mut(cabinet_id))
            .with_context(|| format!("Unknown cabinet {cabinet_id}"))?;

        if technology == AccessTechnology::GFast {
            cabinet.technologies.set(technology);
        }
        let dp = cabinet
            .distributions
            .get_mut(id)
            .with_context(|| format!("Unknown distribution point {id}"))?;
        dp.technologies.set(technology);
        for premise in dp.premises.values_mut() {
            premise.technologies.set(technology);
        }

        Ok(())
    }

    /// Deploy a technology at a cabinet, and at every distribution point and premise it serves
    pub fn commit_cabinet(&mut self, id: &CabinetID, technology: AccessTechnology) -> Result<()> {
        let exchange_id = self
            .cabinet_index
            .get(id)
            .with_context(|| format!("Unknown cabinet {id}"))?;
        let cabinet = self
            .exchanges
            .get_mut(exchange_id)
            .and_then(|exchange| exchange.cabinets.get_mut(id))
            .with_context(|| format!("Unknown cabinet {id}"))?;

        cabinet.technologies.set(technology);
        for dp in cabinet.distributions.values_mut() {
            dp.technologies.set(technology);
            for premise in dp.premises.values_mut() {
                premise.technologies.set(technology);
            }
        }

        Ok(())
    }
}
