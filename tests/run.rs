//! Integration tests for the `run` command.
use dcsim::area::SectorID;
use dcsim::cli::{RunOpts, handle_run_command};
use dcsim::model::{MobileModel, MobileRunSection};
use dcsim::settings::Settings;
use dcsim::simulation::Simulation;
use dcsim::strategy::MobileStrategy;
use dcsim::units::{Money, TrafficDensity};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tempfile::tempdir;

mod common;
use common::{
    assert_budget_identity, assert_same_csv_outputs, csv_file_names, csv_records, find_output,
    get_model_dir, quiet_logs,
};

/// The demo model run up to the last year of its scenario data
fn six_year_run() -> MobileRunSection {
    MobileRunSection {
        end_year: Some(2025),
        ..MobileRunSection::default()
    }
}

fn run_mobile(output_dir: &Path, run_args: &MobileRunSection, debug_model: bool) {
    let opts = RunOpts {
        output_dir: Some(output_dir.to_path_buf()),
        overwrite: true,
        debug_model,
    };
    handle_run_command(
        &get_model_dir("mobile"),
        run_args,
        &opts,
        Some(Settings::default()),
    )
    .unwrap();
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    quiet_logs();

    let tempdir = tempdir().unwrap();
    run_mobile(tempdir.path(), &MobileRunSection::default(), false);

    let suffix = "pop_baseline_throughput_baseline_small_cell_and_spectrum";
    assert_eq!(
        csv_file_names(tempdir.path()),
        ["decisions", "metrics", "pcd_metrics", "spend", "summary"]
            .map(|name| format!("{name}_{suffix}.csv"))
    );
    assert!(tempdir.path().join("metadata.toml").is_file());
    assert_budget_identity(
        &find_output(tempdir.path(), "spend_"),
        &[2020, 2021, 2022],
        500_000.0,
    );
}

/// Two runs with the same seed produce identical outputs
#[test]
fn test_run_is_deterministic() {
    quiet_logs();

    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    run_mobile(dir1.path(), &MobileRunSection::default(), true);
    run_mobile(dir2.path(), &MobileRunSection::default(), true);

    assert!(find_output(dir1.path(), "debug_capacity_").is_file());
    assert_same_csv_outputs(dir1.path(), dir2.path());
}

/// Command-line options override the `[run]` table
#[test]
fn test_run_with_overrides() {
    quiet_logs();

    let tempdir = tempdir().unwrap();
    let run_args = MobileRunSection {
        end_year: Some(2021),
        strategy: Some(MobileStrategy::Minimal),
        annual_budget: Some(Money(1000.0)),
        ..MobileRunSection::default()
    };
    run_mobile(tempdir.path(), &run_args, false);

    let decisions = find_output(tempdir.path(), "decisions_");
    assert!(
        decisions
            .to_string_lossy()
            .ends_with("pop_baseline_throughput_baseline_minimal.csv")
    );
    // Nothing is built under the minimal strategy
    let mut reader = csv::Reader::from_path(&decisions).unwrap();
    assert_eq!(reader.records().count(), 0);
    assert_budget_identity(
        &find_output(tempdir.path(), "spend_"),
        &[2020, 2021],
        1000.0,
    );
}

/// Nothing is ever taken away from the network, so sectors never lose capacity or small cells
#[test]
fn test_network_only_grows() {
    quiet_logs();

    let model = MobileModel::from_path(get_model_dir("mobile"), &six_year_run()).unwrap();
    let mut simulation = Simulation::new(model);
    let mut previous: HashMap<SectorID, (TrafficDensity, usize, usize)> = HashMap::new();
    for year in 2020..=2025 {
        let outcome = simulation.step(year).unwrap();
        for metrics in &outcome.metrics.sectors {
            let sector = simulation.network().sector(&metrics.pcd_sector).unwrap();
            let current = (
                metrics.capacity,
                sector.small_cell_count(),
                sector.assets.len(),
            );
            if let Some(last) = previous.get(&metrics.pcd_sector) {
                assert!(
                    current.0 >= last.0,
                    "Capacity of {} fell in {year}",
                    metrics.pcd_sector
                );
                assert!(current.1 >= last.1);
                assert!(current.2 >= last.2);
            }
            previous.insert(metrics.pcd_sector.clone(), current);
        }
    }
    assert_eq!(previous.len(), 4);
}

/// Sector outputs add up to their LAD in every year
#[test]
fn test_lad_population_adds_up() {
    quiet_logs();

    let tempdir = tempdir().unwrap();
    run_mobile(tempdir.path(), &six_year_run(), false);

    let lad_of: HashMap<String, String> =
        csv_records(&get_model_dir("mobile").join("postcode_sectors.csv"))
            .into_iter()
            .map(|record| (record["id"].clone(), record["lad_id"].clone()))
            .collect();

    let mut sector_population: BTreeMap<(u32, String), u64> = BTreeMap::new();
    let mut capacity: HashMap<String, f64> = HashMap::new();
    for record in csv_records(&find_output(tempdir.path(), "pcd_metrics_")) {
        let year: u32 = record["year"].parse().unwrap();
        let postcode = &record["postcode"];
        *sector_population
            .entry((year, lad_of[postcode].clone()))
            .or_default() += record["population"].parse::<u64>().unwrap();

        // Rows are written year by year
        let current: f64 = record["capacity"].parse().unwrap();
        if let Some(last) = capacity.insert(postcode.clone(), current) {
            assert!(current >= last, "Capacity of {postcode} fell in {year}");
        }
    }

    let lad_population: BTreeMap<(u32, String), u64> =
        csv_records(&find_output(tempdir.path(), "metrics_"))
            .into_iter()
            .map(|record| {
                let year: u32 = record["year"].parse().unwrap();
                let population: u64 = record["population"].parse().unwrap();
                ((year, record["area_id"].clone()), population)
            })
            .collect();
    assert_eq!(lad_population.len(), 2 * 6);
    assert_eq!(sector_population, lad_population);
}

/// With nothing built, growing demand leaves every LAD short of capacity
#[test]
fn test_minimal_with_no_budget() {
    quiet_logs();

    let tempdir = tempdir().unwrap();
    let run_args = MobileRunSection {
        end_year: Some(2021),
        strategy: Some(MobileStrategy::Minimal),
        annual_budget: Some(Money(0.0)),
        ..MobileRunSection::default()
    };
    run_mobile(tempdir.path(), &run_args, false);

    let mut reader = csv::Reader::from_path(find_output(tempdir.path(), "decisions_")).unwrap();
    assert_eq!(reader.records().count(), 0);
    assert_budget_identity(
        &find_output(tempdir.path(), "spend_"),
        &[2020, 2021],
        0.0,
    );

    let mut demand: HashMap<String, f64> = HashMap::new();
    let mut growing_years = 0;
    for record in csv_records(&find_output(tempdir.path(), "metrics_")) {
        let current: f64 = record["demand"].parse().unwrap();
        let Some(last) = demand.insert(record["area_id"].clone(), current) else {
            continue;
        };
        if current > last {
            growing_years += 1;
            let deficit: f64 = record["capacity_deficit"].parse().unwrap();
            assert!(
                deficit > 0.0,
                "No capacity deficit for {} in {}",
                record["area_id"],
                record["year"]
            );
        }
    }
    assert_eq!(growing_years, 2);
}
