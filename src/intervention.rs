//! Interventions: admissible builds which emit new assets into a sector.
use crate::area::{PostcodeSector, SMALL_CELL_BANDWIDTH, SMALL_CELL_FREQUENCY, SectorID};
use crate::asset::{
    AssetType, Bandwidth, Frequency, MobileAsset, SMALL_CELL_SITE, SiteID, Technology,
};
use crate::model::MobileParameters;
use crate::units::{Dimensionless, Money};
use serde::{Deserialize, Serialize};

/// The kinds of mobile intervention, in planner priority order
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
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum InterventionKind {
    /// Add LTE 800 MHz and 2.6 GHz carriers to a mast without LTE
    #[strum(to_string = "upgrade_to_lte")]
    UpgradeToLte,
    /// Add a 700 MHz carrier to an LTE mast
    #[strum(to_string = "carrier_700")]
    Carrier700,
    /// Add a 3.5 GHz carrier to an LTE mast
    #[strum(to_string = "carrier_3500")]
    Carrier3500,
    /// Deploy one small cell
    #[strum(to_string = "small_cell")]
    SmallCell,
}

impl TryFrom<String> for InterventionKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|_| format!("Unknown intervention kind: {value}"))
    }
}

/// A carrier emitted by an intervention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierSpec {
    /// Technology of the new asset
    pub technology: Technology,
    /// Carrier frequency
    pub frequency: Frequency,
    /// Carrier bandwidth
    pub bandwidth: Bandwidth,
}

const fn lte(frequency: u32, bandwidth: u32) -> CarrierSpec {
    CarrierSpec {
        technology: Technology::Lte,
        frequency: Frequency(frequency),
        bandwidth: Bandwidth(bandwidth),
    }
}

const UPGRADE_TO_LTE_CARRIERS: [CarrierSpec; 2] = [lte(800, 10), lte(2600, 10)];
const CARRIER_700: [CarrierSpec; 1] = [lte(700, 10)];
const CARRIER_3500: [CarrierSpec; 1] = [lte(3500, 40)];
const SMALL_CELL: [CarrierSpec; 1] = [CarrierSpec {
    technology: Technology::FiveG,
    frequency: SMALL_CELL_FREQUENCY,
    bandwidth: SMALL_CELL_BANDWIDTH,
}];

impl InterventionKind {
    /// The carriers emitted by one application of this intervention
    pub fn carriers(self) -> &'static [CarrierSpec] {
        match self {
            Self::UpgradeToLte => &UPGRADE_TO_LTE_CARRIERS,
            Self::Carrier700 => &CARRIER_700,
            Self::Carrier3500 => &CARRIER_3500,
            Self::SmallCell => &SMALL_CELL,
        }
    }

    /// The frequency added to a mast by a carrier intervention
    pub fn added_frequency(self) -> Option<Frequency> {
        match self {
            Self::Carrier700 | Self::Carrier3500 => Some(self.carriers()[0].frequency),
            Self::UpgradeToLte | Self::SmallCell => None,
        }
    }

    /// Whether the intervention deploys a small cell rather than altering a mast
    pub fn is_small_cell(self) -> bool {
        self == Self::SmallCell
    }

    /// Total cost of one application of this intervention
    pub fn cost(self, parameters: &MobileParameters) -> Money {
        let costs = &parameters.intervention_costs;
        match self {
            Self::UpgradeToLte => costs.upgrade_to_lte,
            Self::Carrier700 => costs.carrier_700,
            Self::Carrier3500 => costs.carrier_3500,
            Self::SmallCell => costs.small_cell,
        }
    }

    /// Whether this intervention can be applied to the given mast of a sector
    pub fn applies_to_mast(self, sector: &PostcodeSector, site_ngr: &SiteID) -> bool {
        match self {
            Self::UpgradeToLte => !sector.is_lte_mast(site_ngr),
            Self::Carrier700 | Self::Carrier3500 => {
                sector.is_lte_mast(site_ngr)
                    && self
                        .added_frequency()
                        .is_some_and(|freq| !sector.mast_has_frequency(site_ngr, freq))
            }
            Self::SmallCell => false,
        }
    }
}

/// An admissible build at a specific location.
///
/// The cost is split evenly across the emitted assets, each of which the planner treats as an
/// individual action against the budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Intervention {
    /// The kind of intervention
    pub kind: InterventionKind,
    /// The sector in which it is built
    pub pcd_sector: SectorID,
    /// The mast on which it is built ([`SMALL_CELL_SITE`] for small cells)
    pub site_ngr: SiteID,
    /// Total cost
    pub cost: Money,
    /// The assets emitted into the sector
    pub assets: Vec<MobileAsset>,
}

impl Intervention {
    /// Create a new intervention of the given kind at a site in `year`
    pub fn new(
        kind: InterventionKind,
        pcd_sector: &SectorID,
        site_ngr: &SiteID,
        year: u32,
        parameters: &MobileParameters,
    ) -> Self {
        let cost = kind.cost(parameters);
        let carriers = kind.carriers();
        let share = cost / Dimensionless(carriers.len() as f64);
        let (asset_type, opex, site_ngr) = if kind.is_small_cell() {
            (
                AssetType::SmallCell,
                parameters.opex.small_cell,
                SiteID::new(SMALL_CELL_SITE),
            )
        } else {
            (
                AssetType::MacrocellSite,
                parameters.opex.macrocell_carrier,
                site_ngr.clone(),
            )
        };

        let assets = carriers
            .iter()
            .map(|carrier| MobileAsset {
                pcd_sector: pcd_sector.clone(),
                site_ngr: site_ngr.clone(),
                asset_type,
                technology: carrier.technology,
                frequency: carrier.frequency,
                bandwidth: carrier.bandwidth,
                build_date: Some(year),
                network: None,
                capex: share,
                opex,
            })
            .collect();

        Self {
            kind,
            pcd_sector: pcd_sector.clone(),
            site_ngr,
            cost,
            assets,
        }
    }

    /// A small cell in the given sector
    pub fn small_cell(pcd_sector: &SectorID, year: u32, parameters: &MobileParameters) -> Self {
        Self::new(
            InterventionKind::SmallCell,
            pcd_sector,
            &SiteID::new(SMALL_CELL_SITE),
            year,
            parameters,
        )
    }
}
