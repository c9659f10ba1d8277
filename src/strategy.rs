//! Intervention strategies and demand scenarios.
//!
//! A strategy enumerates which kinds of intervention the planner may build. Mobile strategies are
//! a fixed table; fixed-access strategies are composed from a technology, the level of the plant
//! at which it is rolled out and whether the rollout is subsidised.
use crate::fixed::{AccessTechnology, PlantLevel};
use crate::intervention::InterventionKind;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A mobile intervention strategy
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum MobileStrategy {
    /// Build nothing
    #[strum(to_string = "minimal")]
    Minimal,
    /// Upgrade masts and add 700 MHz and 3.5 GHz carriers
    #[strum(to_string = "macrocell")]
    Macrocell,
    /// Upgrade masts and add 700 MHz carriers
    #[strum(to_string = "macrocell_700")]
    Macrocell700,
    /// Upgrade masts and deploy small cells
    #[strum(to_string = "small_cell")]
    SmallCell,
    /// Upgrade masts, add new carriers and deploy small cells
    #[strum(to_string = "small_cell_and_spectrum")]
    SmallCellAndSpectrum,
}

impl TryFrom<String> for MobileStrategy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|_| format!("Unknown mobile strategy: {value}"))
    }
}

impl MobileStrategy {
    /// The intervention kinds this strategy may build, in planner priority order
    pub fn admissible_kinds(self) -> &'static [InterventionKind] {
        use InterventionKind::{Carrier700, Carrier3500, SmallCell, UpgradeToLte};
        match self {
            Self::Minimal => &[],
            Self::Macrocell => &[UpgradeToLte, Carrier700, Carrier3500],
            Self::Macrocell700 => &[UpgradeToLte, Carrier700],
            Self::SmallCell => &[UpgradeToLte, SmallCell],
            Self::SmallCellAndSpectrum => &[UpgradeToLte, Carrier700, Carrier3500, SmallCell],
        }
    }

    /// Whether this strategy may build the given kind of intervention
    pub fn admits(self, kind: InterventionKind) -> bool {
        self.admissible_kinds().contains(&kind)
    }
}

/// A population scenario
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum PopulationScenario {
    /// High population growth
    #[strum(to_string = "high")]
    High,
    /// Central population projection
    #[strum(to_string = "baseline")]
    Baseline,
    /// Low population growth
    #[strum(to_string = "low")]
    Low,
    /// Population held at 2017 levels
    #[strum(to_string = "static2017")]
    Static2017,
}

impl TryFrom<String> for PopulationScenario {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|_| format!("Unknown population scenario: {value}"))
    }
}

impl PopulationScenario {
    /// The throughput scenario used when none is given explicitly
    pub fn default_throughput(self) -> ThroughputScenario {
        match self {
            Self::High => ThroughputScenario::High,
            Self::Baseline | Self::Static2017 => ThroughputScenario::Baseline,
            Self::Low => ThroughputScenario::Low,
        }
    }
}

/// A per-user throughput scenario, naming a column of the throughput table
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ThroughputScenario {
    /// Low throughput growth
    #[strum(to_string = "low")]
    Low,
    /// Central throughput projection
    #[strum(to_string = "baseline")]
    Baseline,
    /// High throughput growth
    #[strum(to_string = "high")]
    High,
}

impl TryFrom<String> for ThroughputScenario {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|_| format!("Unknown throughput scenario: {value}"))
    }
}

/// A fixed-access rollout strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FixedStrategy {
    /// Build nothing
    Minimal,
    /// Roll out a technology at the given level of the plant
    Rollout {
        /// The technology built
        technology: AccessTechnology,
        /// The plant level whose nodes are candidates
        level: PlantLevel,
        /// Whether candidate costs are reduced by the subsidy multiplier
        subsidised: bool,
    },
}

impl FixedStrategy {
    /// The target technology, if any
    pub fn technology(self) -> Option<AccessTechnology> {
        match self {
            Self::Minimal => None,
            Self::Rollout { technology, .. } => Some(technology),
        }
    }

    /// Whether this strategy applies the subsidy cost multiplier
    pub fn is_subsidised(self) -> bool {
        matches!(self, Self::Rollout { subsidised: true, .. })
    }
}

/// The strategy name used for each technology
fn technology_label(technology: AccessTechnology) -> &'static str {
    match technology {
        AccessTechnology::Fttp => "fttp",
        AccessTechnology::GFast => "fttdp",
        _ => "fttc",
    }
}

impl fmt::Display for FixedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Rollout {
                technology,
                level,
                subsidised,
            } => {
                let prefix = if *subsidised { "subsidised" } else { "rollout" };
                write!(f, "{prefix}_{}_per_{level}", technology_label(*technology))
            }
        }
    }
}

impl FromStr for FixedStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "minimal" {
            return Ok(Self::Minimal);
        }

        let parts: Vec<&str> = s.split('_').collect();
        let [prefix, technology, "per", level] = parts[..] else {
            bail!("Unknown fixed strategy: {s}");
        };

        let subsidised = match prefix {
            "rollout" => false,
            "subsidised" => true,
            _ => bail!("Unknown fixed strategy: {s}"),
        };
        let technology = match technology {
            "fttp" => AccessTechnology::Fttp,
            "fttdp" => AccessTechnology::GFast,
            "fttc" => AccessTechnology::Fttc,
            _ => bail!("Unknown fixed strategy: {s}"),
        };
        let level = match level {
            "distribution" => PlantLevel::Distribution,
            "cabinet" => PlantLevel::Cabinet,
            _ => bail!("Unknown fixed strategy: {s}"),
        };
        if technology == AccessTechnology::Fttc && level != PlantLevel::Cabinet {
            bail!("FTTC can only be rolled out per cabinet");
        }

        Ok(Self::Rollout {
            technology,
            level,
            subsidised,
        })
    }
}

impl TryFrom<String> for FixedStrategy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map_err(|err: anyhow::Error| err.to_string())
    }
}

impl From<FixedStrategy> for String {
    fn from(value: FixedStrategy) -> Self {
        value.to_string()
    }
}
