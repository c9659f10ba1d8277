//! Radio assets installed in postcode sectors.
//!
//! An asset is a single carrier (a frequency/bandwidth pair) on a macrocell mast, or a single
//! small cell. Assets sharing a `site_ngr` within a sector are co-sited on the same mast. Small
//! cells are pooled per sector under the [`SMALL_CELL_SITE`] sentinel.
use crate::area::SectorID;
use crate::id::define_id_type;
use crate::units::Money;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

define_id_type! {SiteID}

/// The `site_ngr` shared by all small cells in a sector
pub const SMALL_CELL_SITE: &str = "small_cell_sites";

/// The kind of radio asset
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
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum AssetType {
    /// A carrier on a macrocell mast
    #[strum(to_string = "macrocell_site")]
    MacrocellSite,
    /// A small cell
    #[strum(to_string = "small_cell")]
    SmallCell,
}

/// The radio access technology of an asset
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
    Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Technology {
    /// 2G
    #[strum(to_string = "GSM")]
    Gsm,
    /// 3G
    #[strum(to_string = "UMTS")]
    Umts,
    /// 4G
    #[strum(to_string = "LTE", serialize = "4G", serialize = "LTE/4G")]
    Lte,
    /// 5G
    #[strum(to_string = "5G")]
    FiveG,
}

impl Technology {
    /// Whether assets of this technology contribute to delivered capacity
    pub fn is_lte_capable(self) -> bool {
        matches!(self, Self::Lte | Self::FiveG)
    }
}

macro_rules! impl_try_from_string {
    ($t:ty) => {
        impl TryFrom<String> for $t {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value
                    .parse()
                    .map_err(|_| format!("Invalid value for {}: {value}", stringify!($t)))
            }
        }
    };
}
impl_try_from_string!(AssetType);
impl_try_from_string!(Technology);
impl_try_from_string!(Bandwidth);

/// A carrier frequency in MHz
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Frequency(pub u32);

impl Frequency {
    /// Convert a frequency in GHz (as given in lookup tables) to an integral number of MHz
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_ghz(ghz: f64) -> Result<Self> {
        let mhz = (ghz * 1000.0).round();
        ensure!(
            ghz.is_finite() && mhz > 0.0 && mhz <= f64::from(u32::MAX),
            "Invalid frequency: {ghz} GHz"
        );

        Ok(Self(mhz as u32))
    }
}

/// A channel bandwidth, stored as the MHz per direction of a paired allocation.
///
/// Written as `2x<N>MHz`. When parsing, the `2x` prefix and `MHz` suffix are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bandwidth(pub u32);

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "2x{}MHz", self.0)
    }
}

impl FromStr for Bandwidth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let without_prefix = trimmed.strip_prefix("2x").unwrap_or(trimmed);
        let digits = without_prefix
            .strip_suffix("MHz")
            .unwrap_or(without_prefix);
        let mhz: u32 = digits
            .parse()
            .with_context(|| format!("Invalid bandwidth: {s}"))?;
        ensure!(mhz > 0, "Bandwidth must be greater than zero");

        Ok(Self(mhz))
    }
}

impl From<Bandwidth> for String {
    fn from(value: Bandwidth) -> Self {
        value.to_string()
    }
}

/// A radio asset resident in a postcode sector
#[derive(Debug, Clone, PartialEq)]
pub struct MobileAsset {
    /// The postcode sector in which the asset is installed
    pub pcd_sector: SectorID,
    /// The mast on which the asset is installed ([`SMALL_CELL_SITE`] for small cells)
    pub site_ngr: SiteID,
    /// Macrocell carrier or small cell
    pub asset_type: AssetType,
    /// Radio access technology
    pub technology: Technology,
    /// Carrier frequency
    pub frequency: Frequency,
    /// Channel bandwidth
    pub bandwidth: Bandwidth,
    /// The year the asset was built, if known
    pub build_date: Option<u32>,
    /// The operator network the asset belongs to
    pub network: Option<String>,
    /// Capital cost of building the asset
    pub capex: Money,
    /// Annual operating cost
    pub opex: Money,
}

impl MobileAsset {
    /// Whether this is a carrier on a macrocell mast
    pub fn is_macrocell(&self) -> bool {
        self.asset_type == AssetType::MacrocellSite
    }

    /// Whether this is a small cell
    pub fn is_small_cell(&self) -> bool {
        self.asset_type == AssetType::SmallCell
    }

    /// The (frequency, bandwidth) pair identifying the asset's carrier
    pub fn carrier(&self) -> (Frequency, Bandwidth) {
        (self.frequency, self.bandwidth)
    }
}
