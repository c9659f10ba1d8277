//! Code for reading population and throughput scenarios.
use super::*;
use crate::area::{MobileNetwork, SectorID};
use crate::demand::{PopulationSeries, ThroughputSeries};
use crate::strategy::{PopulationScenario, ThroughputScenario};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const THROUGHPUT_FILE_NAME: &str = "throughput_scenarios.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct PopulationRaw {
    year: u32,
    pcd_sector: SectorID,
    population: u64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ThroughputRaw {
    year: u32,
    low: f64,
    baseline: f64,
    high: f64,
}

/// The name of the file holding a population scenario
pub fn population_file_name(scenario: PopulationScenario) -> String {
    format!("population_{scenario}.csv")
}

/// Read a population scenario from the model directory.
///
/// Every sector in the scenario must exist in the network and its years must be strictly
/// increasing.
pub fn read_population_scenario(
    model_dir: &Path,
    scenario: PopulationScenario,
    network: &MobileNetwork,
) -> Result<PopulationSeries> {
    let file_path = model_dir.join(population_file_name(scenario));
    let rows = read_csv(&file_path)?;
    read_population_from_iter(rows, scenario, network)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&file_path))
}

fn read_population_from_iter<I>(
    iter: I,
    scenario: PopulationScenario,
    network: &MobileNetwork,
) -> Result<PopulationSeries>
where
    I: Iterator<Item = PopulationRaw>,
{
    let grouped = iter
        .map(|row| (row.pcd_sector, (row.year, row.population)))
        .into_group_map();

    let mut populations = HashMap::new();
    for (sector_id, rows) in grouped {
        ensure!(
            network.contains_sector(&sector_id),
            "Unknown postcode sector {sector_id} in population scenario"
        );
        let years = rows.iter().map(|(year, _)| *year).collect_vec();
        ensure!(
            is_sorted_and_unique(&years),
            "Years for sector {sector_id} must be strictly increasing"
        );

        populations.insert(sector_id, rows.into_iter().collect::<BTreeMap<_, _>>());
    }

    Ok(PopulationSeries::new(scenario, populations))
}

/// Read one column of the throughput scenarios file
pub fn read_throughput_scenario(
    model_dir: &Path,
    scenario: ThroughputScenario,
) -> Result<ThroughputSeries> {
    let file_path = model_dir.join(THROUGHPUT_FILE_NAME);
    let rows = read_csv(&file_path)?;
    read_throughput_from_iter(rows, scenario)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&file_path))
}

fn read_throughput_from_iter<I>(iter: I, scenario: ThroughputScenario) -> Result<ThroughputSeries>
where
    I: Iterator<Item = ThroughputRaw>,
{
    let rows = iter
        .map(|row| {
            let throughput = match scenario {
                ThroughputScenario::Low => row.low,
                ThroughputScenario::Baseline => row.baseline,
                ThroughputScenario::High => row.high,
            };
            (row.year, throughput)
        })
        .collect_vec();

    let years = rows.iter().map(|(year, _)| *year).collect_vec();
    ensure!(is_sorted_and_unique(&years), "Years must be strictly increasing");
    for (year, throughput) in &rows {
        ensure!(
            throughput.is_finite() && *throughput >= 0.0,
            "Throughput for {year} must be a finite number greater than or equal to zero"
        );
    }

    Ok(ThroughputSeries::new(scenario, rows.into_iter().collect()))
}
