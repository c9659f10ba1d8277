//! Local authority districts and the postcode sectors they contain.
//!
//! Ownership is strictly LAD → sector → asset. A sector refers back to its LAD by ID only; the
//! reverse index is held by [`MobileNetwork`].
use crate::asset::{Bandwidth, Frequency, MobileAsset, SiteID};
use crate::id::{define_id_getter, define_id_type};
use crate::lookup::{Environment, LookupTables};
use crate::model::MobileParameters;
use crate::units::{Area, Energy, Money, PopulationDensity, Power, SiteDensity, TrafficDensity};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashMap;

define_id_type! {SectorID}
define_id_type! {LADID}

/// The frequency of the small-cell carrier, in MHz
pub const SMALL_CELL_FREQUENCY: Frequency = Frequency(3700);

/// The bandwidth of the small-cell carrier
pub const SMALL_CELL_BANDWIDTH: Bandwidth = Bandwidth(25);

/// A postcode sector: the unit of mobile demand and supply
#[derive(Debug, Clone, PartialEq)]
pub struct PostcodeSector {
    /// Sector identifier, e.g. `CB1 1`
    pub id: SectorID,
    /// The LAD containing this sector
    pub lad_id: LADID,
    /// Human-readable name
    pub name: String,
    /// Land area of the sector
    pub area: Area,
    /// Resident population in the current year
    pub population: u64,
    /// Per-user throughput in the current year, in GB/month
    pub user_throughput: f64,
    /// Clutter geotype derived from population density
    pub clutter_geotype: Environment,
    /// Radio assets installed in the sector
    pub assets: Vec<MobileAsset>,
}
define_id_getter! {PostcodeSector, SectorID}

/// The capacity contributed by a single carrier in a sector
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierCapacity {
    /// The environment used to key the capacity lookup
    pub environment: Environment,
    /// Carrier frequency
    pub frequency: Frequency,
    /// Carrier bandwidth
    pub bandwidth: Bandwidth,
    /// Density of the sites carrying this carrier
    pub site_density: SiteDensity,
    /// Capacity contributed
    pub capacity: TrafficDensity,
}

impl PostcodeSector {
    /// Population per km²
    pub fn population_density(&self) -> PopulationDensity {
        PopulationDensity::of(self.population, self.area)
    }

    /// Macrocell masts in the sector, keyed by `site_ngr`, in order of first appearance
    pub fn masts(&self) -> IndexMap<&SiteID, Vec<&MobileAsset>> {
        let mut masts: IndexMap<&SiteID, Vec<&MobileAsset>> = IndexMap::new();
        for asset in self.assets.iter().filter(|a| a.is_macrocell()) {
            masts.entry(&asset.site_ngr).or_default().push(asset);
        }

        masts
    }

    /// Whether the mast at `site_ngr` carries any LTE or 5G asset
    pub fn is_lte_mast(&self, site_ngr: &SiteID) -> bool {
        self.assets.iter().any(|a| {
            a.is_macrocell() && a.site_ngr == *site_ngr && a.technology.is_lte_capable()
        })
    }

    /// Whether the mast at `site_ngr` already carries the given frequency
    pub fn mast_has_frequency(&self, site_ngr: &SiteID, frequency: Frequency) -> bool {
        self.assets
            .iter()
            .any(|a| a.is_macrocell() && a.site_ngr == *site_ngr && a.frequency == frequency)
    }

    /// The number of small cells deployed in the sector
    pub fn small_cell_count(&self) -> usize {
        self.assets.iter().filter(|a| a.is_small_cell()).count()
    }

    /// The capacity contributed by each carrier in the sector.
    ///
    /// Every distinct (frequency, bandwidth) carried by LTE/5G macrocell assets contributes once,
    /// with a site density given by the number of masts carrying it. Small cells contribute a
    /// single entry keyed on the small-cell environment.
    pub fn carrier_capacities(&self, lookups: &LookupTables) -> Result<Vec<CarrierCapacity>> {
        let mut masts_per_carrier: IndexMap<(Frequency, Bandwidth), Vec<&SiteID>> =
            IndexMap::new();
        for asset in self
            .assets
            .iter()
            .filter(|a| a.is_macrocell() && a.technology.is_lte_capable())
        {
            let masts = masts_per_carrier.entry(asset.carrier()).or_default();
            if !masts.contains(&&asset.site_ngr) {
                masts.push(&asset.site_ngr);
            }
        }
        masts_per_carrier.sort_keys();

        let mut capacities = Vec::with_capacity(masts_per_carrier.len() + 1);
        for ((frequency, bandwidth), masts) in masts_per_carrier {
            let site_density = SiteDensity::of(masts.len(), self.area);
            let capacity =
                lookups.capacity_of(self.clutter_geotype, frequency, bandwidth, site_density)?;
            capacities.push(CarrierCapacity {
                environment: self.clutter_geotype,
                frequency,
                bandwidth,
                site_density,
                capacity,
            });
        }

        let small_cells = self.small_cell_count();
        if small_cells > 0 {
            let site_density = SiteDensity::of(small_cells, self.area);
            capacities.push(CarrierCapacity {
                environment: Environment::SmallCells,
                frequency: SMALL_CELL_FREQUENCY,
                bandwidth: SMALL_CELL_BANDWIDTH,
                site_density,
                capacity: small_cell_capacity(lookups, small_cells, self.area)?,
            });
        }

        Ok(capacities)
    }

    /// Delivered capacity of the sector: the sum of all carrier contributions
    pub fn capacity(&self, lookups: &LookupTables) -> Result<TrafficDensity> {
        let capacities = self
            .carrier_capacities(lookups)
            .with_context(|| format!("Could not compute capacity of sector {}", self.id))?;
        Ok(capacities.into_iter().map(|c| c.capacity).sum())
    }

    /// Whether adding one more small cell would increase the sector's capacity
    pub fn small_cell_would_add_capacity(&self, lookups: &LookupTables) -> Result<bool> {
        let count = self.small_cell_count();
        let current = small_cell_capacity(lookups, count, self.area)?;
        let next = small_cell_capacity(lookups, count + 1, self.area)?;
        Ok(next > current)
    }

    /// Total power drawn by the sector's assets
    pub fn power(&self, parameters: &MobileParameters) -> Power {
        self.assets
            .iter()
            .map(|asset| {
                if asset.is_small_cell() {
                    parameters.power.small_cell_kw
                } else {
                    parameters.power.macrocell_carrier_kw
                }
            })
            .sum()
    }

    /// Annual energy demand of the sector's assets
    pub fn energy_demand(&self, parameters: &MobileParameters) -> Energy {
        self.power(parameters).annual_energy()
    }

    /// Total annual operating cost of the sector's assets
    pub fn opex(&self) -> Money {
        self.assets.iter().map(|asset| asset.opex).sum()
    }
}

/// The capacity offered by `count` small cells over `area`
fn small_cell_capacity(lookups: &LookupTables, count: usize, area: Area) -> Result<TrafficDensity> {
    if count == 0 {
        return Ok(TrafficDensity(0.0));
    }

    lookups.capacity_of(
        Environment::SmallCells,
        SMALL_CELL_FREQUENCY,
        SMALL_CELL_BANDWIDTH,
        SiteDensity::of(count, area),
    )
}

/// A local authority district
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Lad {
    /// LAD code
    pub id: LADID,
    /// LAD name
    pub name: String,
    /// The postcode sectors in this LAD
    #[serde(skip)]
    pub sectors: IndexMap<SectorID, PostcodeSector>,
}
define_id_getter! {Lad, LADID}

impl Lad {
    /// Total population across the LAD's sectors
    pub fn population(&self) -> u64 {
        self.sectors.values().map(|s| s.population).sum()
    }

    /// Total area of the LAD's sectors
    pub fn area(&self) -> Area {
        self.sectors.values().map(|s| s.area).sum()
    }

    /// Population per km² across the LAD
    pub fn population_density(&self) -> PopulationDensity {
        if self.sectors.is_empty() {
            return PopulationDensity(0.0);
        }

        PopulationDensity::of(self.population(), self.area())
    }
}

/// The mobile asset graph: LADs, their sectors and the sectors' assets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MobileNetwork {
    lads: IndexMap<LADID, Lad>,
    sector_lads: HashMap<SectorID, LADID>,
}

impl MobileNetwork {
    /// Create a new network from LADs with their sectors attached
    pub fn new(lads: IndexMap<LADID, Lad>) -> Self {
        let sector_lads = lads
            .values()
            .flat_map(|lad| lad.sectors.keys().map(|id| (id.clone(), lad.id.clone())))
            .collect();

        Self { lads, sector_lads }
    }

    /// Iterate over LADs in input order
    pub fn lads(&self) -> impl Iterator<Item = &Lad> {
        self.lads.values()
    }

    /// Get a LAD by ID
    pub fn lad(&self, id: &LADID) -> Option<&Lad> {
        self.lads.get(id)
    }

    /// The LAD containing the given sector
    pub fn lad_of(&self, sector_id: &SectorID) -> Option<&LADID> {
        self.sector_lads.get(sector_id)
    }

    /// Whether the network contains the given sector
    pub fn contains_sector(&self, sector_id: &SectorID) -> bool {
        self.sector_lads.contains_key(sector_id)
    }

    /// Get a sector by ID
    pub fn sector(&self, sector_id: &SectorID) -> Option<&PostcodeSector> {
        let lad_id = self.sector_lads.get(sector_id)?;
        self.lads.get(lad_id)?.sectors.get(sector_id)
    }

    /// Get a mutable reference to a sector by ID
    pub fn sector_mut(&mut self, sector_id: &SectorID) -> Option<&mut PostcodeSector> {
        let lad_id = self.sector_lads.get(sector_id)?;
        self.lads.get_mut(lad_id)?.sectors.get_mut(sector_id)
    }

    /// Iterate over all sectors, LAD by LAD
    pub fn sectors(&self) -> impl Iterator<Item = &PostcodeSector> {
        self.lads.values().flat_map(|lad| lad.sectors.values())
    }

    /// Iterate mutably over all sectors, LAD by LAD
    pub fn sectors_mut(&mut self) -> impl Iterator<Item = &mut PostcodeSector> {
        self.lads
            .values_mut()
            .flat_map(|lad| lad.sectors.values_mut())
    }

    /// The number of sectors in the network
    pub fn sector_count(&self) -> usize {
        self.sector_lads.len()
    }

    /// Sector IDs sorted by descending population density, ties broken by ascending ID
    pub fn sector_ids_by_density(&self) -> Vec<SectorID> {
        self.sectors()
            .sorted_by(|a, b| {
                b.population_density()
                    .value()
                    .total_cmp(&a.population_density().value())
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|sector| sector.id.clone())
            .collect()
    }
}
