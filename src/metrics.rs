//! Yearly metrics of the mobile and fixed networks.
//!
//! LAD capacity and demand are means of the sector values weighted by sector area. Coverage is
//! the share of the population living in sectors whose capacity meets the coverage threshold.
use crate::area::{LADID, Lad, MobileNetwork, PostcodeSector, SectorID};
use crate::demand::sector_demand;
use crate::fixed::{ExchangeID, FixedNetwork, TechnologyCounts};
use crate::lookup::LookupTables;
use crate::model::MobileParameters;
use crate::model::fixed::SpeedParameters;
use crate::units::{Area, Energy, Money, PopulationDensity, Speed, Traffic, TrafficDensity};
use anyhow::Result;
use std::collections::HashMap;

/// The demand a sector's capacity falls short of, or zero if demand is met
pub fn capacity_deficit(demand: TrafficDensity, capacity: TrafficDensity) -> TrafficDensity {
    if demand > capacity {
        demand - capacity
    } else {
        TrafficDensity(0.0)
    }
}

/// Metrics of one postcode sector in one year
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMetrics {
    /// The sector
    pub pcd_sector: SectorID,
    /// The LAD containing the sector
    pub lad_id: LADID,
    /// Capital spend booked to the sector this year
    pub cost: Money,
    /// Offered traffic
    pub demand: TrafficDensity,
    /// Delivered capacity
    pub capacity: TrafficDensity,
    /// Shortfall of capacity against demand
    pub capacity_deficit: TrafficDensity,
    /// Resident population
    pub population: u64,
    /// Population density
    pub population_density: PopulationDensity,
    /// Land area
    pub area: Area,
    /// Annual energy demand of the sector's assets
    pub energy_demand: Energy,
    /// Annual operating cost of the sector's assets
    pub opex: Money,
}

impl SectorMetrics {
    /// Evaluate a sector in its current state
    pub fn new(
        sector: &PostcodeSector,
        lookups: &LookupTables,
        parameters: &MobileParameters,
        cost: Money,
    ) -> Result<Self> {
        let demand = sector_demand(sector, parameters);
        let capacity = sector.capacity(lookups)?;

        Ok(Self {
            pcd_sector: sector.id.clone(),
            lad_id: sector.lad_id.clone(),
            cost,
            demand,
            capacity,
            capacity_deficit: capacity_deficit(demand, capacity),
            population: sector.population,
            population_density: sector.population_density(),
            area: sector.area,
            energy_demand: sector.energy_demand(parameters),
            opex: sector.opex(),
        })
    }
}

/// Metrics of one LAD in one year
#[derive(Debug, Clone, PartialEq)]
pub struct LadMetrics {
    /// The LAD
    pub lad_id: LADID,
    /// Name of the LAD
    pub name: String,
    /// Capital spend booked to the LAD this year
    pub cost: Money,
    /// Area-weighted mean demand
    pub demand: TrafficDensity,
    /// Area-weighted mean capacity
    pub capacity: TrafficDensity,
    /// Shortfall of mean capacity against mean demand
    pub capacity_deficit: TrafficDensity,
    /// Resident population
    pub population: u64,
    /// Population density
    pub population_density: PopulationDensity,
    /// Share of the population in sectors meeting the coverage threshold
    pub coverage: f64,
    /// Annual energy demand of all assets
    pub energy_demand: Energy,
    /// Annual operating cost of all assets
    pub opex: Money,
}

impl LadMetrics {
    /// Aggregate the metrics of a LAD's sectors
    pub fn new<'a, I>(lad: &Lad, sectors: I, coverage_threshold: TrafficDensity) -> Self
    where
        I: IntoIterator<Item = &'a SectorMetrics>,
    {
        let mut cost = Money(0.0);
        let mut demand = Traffic(0.0);
        let mut capacity = Traffic(0.0);
        let mut area = Area(0.0);
        let mut population = 0;
        let mut covered = 0;
        let mut energy_demand = Energy(0.0);
        let mut opex = Money(0.0);
        for sector in sectors {
            cost += sector.cost;
            demand += sector.demand * sector.area;
            capacity += sector.capacity * sector.area;
            area += sector.area;
            population += sector.population;
            if sector.capacity >= coverage_threshold {
                covered += sector.population;
            }
            energy_demand += sector.energy_demand;
            opex += sector.opex;
        }

        let (demand, capacity) = if area > Area(0.0) {
            (demand / area, capacity / area)
        } else {
            (TrafficDensity(0.0), TrafficDensity(0.0))
        };
        let coverage = if population > 0 {
            covered as f64 / population as f64
        } else {
            0.0
        };

        Self {
            lad_id: lad.id.clone(),
            name: lad.name.clone(),
            cost,
            demand,
            capacity,
            capacity_deficit: capacity_deficit(demand, capacity),
            population,
            population_density: if area > Area(0.0) {
                PopulationDensity::of(population, area)
            } else {
                PopulationDensity(0.0)
            },
            coverage,
            energy_demand,
            opex,
        }
    }
}

/// The metrics of the whole mobile network in one year
#[derive(Debug, Clone, PartialEq)]
pub struct MobileMetrics {
    /// Per-sector metrics, in network order
    pub sectors: Vec<SectorMetrics>,
    /// Per-LAD metrics, in network order
    pub lads: Vec<LadMetrics>,
}

impl MobileMetrics {
    /// Evaluate every sector and LAD of the network.
    ///
    /// # Arguments
    ///
    /// * `network` - The network in its current state
    /// * `lookups` - Lookup tables for evaluating capacity
    /// * `parameters` - Model parameters
    /// * `spend` - Capital spend booked to each sector this year
    pub fn new(
        network: &MobileNetwork,
        lookups: &LookupTables,
        parameters: &MobileParameters,
        spend: &HashMap<SectorID, Money>,
    ) -> Result<Self> {
        let mut sectors = Vec::with_capacity(network.sector_count());
        let mut lads = Vec::new();
        for lad in network.lads() {
            let first = sectors.len();
            for sector in lad.sectors.values() {
                let cost = spend.get(&sector.id).copied().unwrap_or_default();
                sectors.push(SectorMetrics::new(sector, lookups, parameters, cost)?);
            }
            lads.push(LadMetrics::new(
                lad,
                &sectors[first..],
                parameters.coverage_threshold,
            ));
        }

        Ok(Self { sectors, lads })
    }
}

/// Metrics of one exchange in one year
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeMetrics {
    /// The exchange
    pub exchange_id: ExchangeID,
    /// Geotype label of the exchange
    pub geotype: String,
    /// Number of premises served
    pub premises: usize,
    /// Premises by best available technology
    pub technologies: TechnologyCounts,
    /// Mean speed over the premises
    pub average_speed: Speed,
    /// Capital spend booked to the exchange this year
    pub cost: Money,
}

/// Evaluate every exchange of the fixed network
pub fn exchange_metrics(
    network: &FixedNetwork,
    speeds: &SpeedParameters,
    spend: &HashMap<ExchangeID, Money>,
) -> Vec<ExchangeMetrics> {
    network
        .exchanges()
        .map(|exchange| ExchangeMetrics {
            exchange_id: exchange.id.clone(),
            geotype: exchange.geotype.clone(),
            premises: exchange.premise_count(),
            technologies: exchange.technology_counts(),
            average_speed: exchange.average_speed(speeds),
            cost: spend.get(&exchange.id).copied().unwrap_or_default(),
        })
        .collect()
}
