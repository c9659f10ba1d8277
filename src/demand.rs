//! Offered mobile traffic, derived from scenario population and per-user throughput.
//!
//! Scenario tables are read-only: every year, each sector's population and throughput are
//! overwritten from them before capacity and demand are evaluated.
use crate::area::{PostcodeSector, SectorID};
use crate::error::FailureKind;
use crate::model::MobileParameters;
use crate::strategy::{PopulationScenario, ThroughputScenario};
use crate::units::{Area, TrafficDensity};
use anyhow::{Context, Result, ensure};
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

pub mod willingness;

/// Converts a monthly volume in GB to a mean rate in Mbps, assuming a 30-day month
const GB_PER_MONTH_TO_MBPS: f64 = 8.0 * 1024.0 / (30.0 * 24.0 * 3600.0);

/// Busy-hour traffic per km² offered by the population of an area
pub fn offered_traffic(
    population: u64,
    user_throughput: f64,
    area: Area,
    market_share: f64,
    busy_hour_factor: f64,
) -> TrafficDensity {
    if population == 0 {
        return TrafficDensity(0.0);
    }

    let rate_per_user = user_throughput * GB_PER_MONTH_TO_MBPS;
    TrafficDensity(
        population as f64 * market_share * rate_per_user * busy_hour_factor / area.value(),
    )
}

/// The traffic offered in a sector in its current state
pub fn sector_demand(sector: &PostcodeSector, parameters: &MobileParameters) -> TrafficDensity {
    offered_traffic(
        sector.population,
        sector.user_throughput,
        sector.area,
        parameters.market_share,
        parameters.busy_hour_factor,
    )
}

/// The population of each sector in each year for one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSeries {
    /// The scenario the populations were read from
    pub scenario: PopulationScenario,
    populations: HashMap<SectorID, BTreeMap<u32, u64>>,
}

impl PopulationSeries {
    /// Create a new series from per-sector populations by year
    pub fn new(
        scenario: PopulationScenario,
        populations: HashMap<SectorID, BTreeMap<u32, u64>>,
    ) -> Self {
        Self {
            scenario,
            populations,
        }
    }

    /// The population of a sector in a year.
    ///
    /// Sectors absent from the scenario have no population.
    pub fn population(&self, sector_id: &SectorID, year: u32) -> Result<u64> {
        let Some(by_year) = self.populations.get(sector_id) else {
            return Ok(0);
        };

        by_year
            .get(&year)
            .copied()
            .with_context(|| {
                format!(
                    "No population for sector {sector_id} in {year} in scenario {}",
                    self.scenario
                )
            })
            .context(FailureKind::Schema)
    }

    /// Iterate over the sectors present in the scenario
    pub fn sector_ids(&self) -> impl Iterator<Item = &SectorID> {
        self.populations.keys()
    }

    /// Total population across all sectors in a year
    pub fn total_population(&self, year: u32) -> u64 {
        self.populations
            .values()
            .filter_map(|by_year| by_year.get(&year))
            .sum()
    }

    /// Check that every sector in the scenario has a population for each year in `years`
    pub fn check_covers(&self, years: &RangeInclusive<u32>) -> Result<()> {
        for (sector_id, by_year) in &self.populations {
            for year in years.clone() {
                ensure!(
                    by_year.contains_key(&year),
                    "Population scenario {} has no entry for sector {sector_id} in {year}",
                    self.scenario
                );
            }
        }

        Ok(())
    }
}

/// Per-user monthly throughput in GB for one scenario, by year
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputSeries {
    /// The scenario the throughputs were read from
    pub scenario: ThroughputScenario,
    by_year: BTreeMap<u32, f64>,
}

impl ThroughputSeries {
    /// Create a new series
    pub fn new(scenario: ThroughputScenario, by_year: BTreeMap<u32, f64>) -> Self {
        Self { scenario, by_year }
    }

    /// The per-user throughput in a year
    pub fn throughput(&self, year: u32) -> Result<f64> {
        self.by_year
            .get(&year)
            .copied()
            .with_context(|| {
                format!(
                    "No user throughput for {year} in scenario {}",
                    self.scenario
                )
            })
            .context(FailureKind::Schema)
    }

    /// Check that there is a throughput for each year in `years`
    pub fn check_covers(&self, years: &RangeInclusive<u32>) -> Result<()> {
        for year in years.clone() {
            ensure!(
                self.by_year.contains_key(&year),
                "Throughput scenario {} has no entry for {year}",
                self.scenario
            );
        }

        Ok(())
    }
}

/// Set a sector's population and user throughput for the given year
pub fn update_sector_demand(
    sector: &mut PostcodeSector,
    year: u32,
    population: &PopulationSeries,
    throughput: &ThroughputSeries,
) -> Result<()> {
    sector.population = population.population(&sector.id, year)?;
    sector.user_throughput = throughput.throughput(year)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{mobile_parameters, sector};
    use float_cmp::assert_approx_eq;
    use map_macro::hash_map;
    use rstest::rstest;

    #[test]
    fn test_offered_traffic() {
        // 1000 users, all customers, 30 GB/month each, no busy-hour uplift, 1 km²
        let traffic = offered_traffic(1000, 30.0, Area(1.0), 1.0, 1.0);
        let expected = 1000.0 * 30.0 * 8.0 * 1024.0 / (30.0 * 24.0 * 3600.0);
        assert_approx_eq!(TrafficDensity, traffic, TrafficDensity(expected));

        // Halving the market share halves demand; doubling the area halves density
        let traffic = offered_traffic(1000, 30.0, Area(2.0), 0.5, 1.0);
        assert_approx_eq!(TrafficDensity, traffic, TrafficDensity(expected / 4.0));
    }

    #[test]
    fn test_offered_traffic_zero_population() {
        assert_eq!(
            offered_traffic(0, 50.0, Area(1.0), 0.3, 3.6),
            TrafficDensity(0.0)
        );
    }

    fn series() -> (PopulationSeries, ThroughputSeries) {
        let by_year: BTreeMap<u32, u64> = [(2020, 500), (2021, 550)].into_iter().collect();
        let populations = hash_map! {
            SectorID::from("CB1 1") => by_year,
        };
        let throughput: BTreeMap<u32, f64> = [(2020, 10.0), (2021, 12.5)].into_iter().collect();
        (
            PopulationSeries::new(PopulationScenario::Baseline, populations),
            ThroughputSeries::new(ThroughputScenario::Baseline, throughput),
        )
    }

    #[rstest]
    fn test_update_sector_demand(
        mut sector: PostcodeSector,
        mobile_parameters: MobileParameters,
    ) {
        let (population, throughput) = series();
        update_sector_demand(&mut sector, 2021, &population, &throughput).unwrap();
        assert_eq!(sector.population, 550);
        assert_eq!(sector.user_throughput, 12.5);

        let expected = offered_traffic(550, 12.5, sector.area, 0.3, 3.6);
        assert_eq!(sector_demand(&sector, &mobile_parameters), expected);
    }

    #[rstest]
    fn test_update_sector_demand_missing_year(mut sector: PostcodeSector) {
        let (population, throughput) = series();
        let err = update_sector_demand(&mut sector, 2030, &population, &throughput).unwrap_err();
        assert_eq!(err.downcast_ref::<FailureKind>(), Some(&FailureKind::Schema));
    }

    #[rstest]
    fn test_sector_absent_from_scenario(mut sector: PostcodeSector) {
        let (population, throughput) = series();
        sector.id = "CB9 9".into();
        update_sector_demand(&mut sector, 2020, &population, &throughput).unwrap();
        assert_eq!(sector.population, 0);
    }

    #[test]
    fn test_check_covers() {
        let (population, throughput) = series();
        assert!(population.check_covers(&(2020..=2021)).is_ok());
        assert!(population.check_covers(&(2020..=2022)).is_err());
        assert!(throughput.check_covers(&(2021..=2021)).is_ok());
        assert!(throughput.check_covers(&(2019..=2020)).is_err());
        assert_eq!(population.total_population(2021), 550);
    }
}
