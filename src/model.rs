//! Code for simulation models.
//!
//! A model is the content of a model directory: the parameters in `model.toml` together with the
//! network, lookup and scenario data read from the CSV files beside it.
use crate::area::MobileNetwork;
use crate::demand::willingness::{JoinSummary, WtpScores, assign_willingness_to_pay};
use crate::demand::{PopulationSeries, ThroughputSeries};
use crate::error::FailureKind;
use crate::fixed::FixedNetwork;
use crate::input::area::read_mobile_network;
use crate::input::asset::read_initial_system;
use crate::input::bands::{BandInputs, read_band_inputs};
use crate::input::demographics::read_wtp_scores;
use crate::input::lookup::read_lookup_tables;
use crate::input::plant::read_fixed_network;
use crate::input::scenario::{read_population_scenario, read_throughput_scenario};
use crate::lookup::LookupTables;
use crate::strategy::{FixedStrategy, MobileStrategy, PopulationScenario, ThroughputScenario};
use crate::units::{Money, TrafficDensity};
use anyhow::{Context, Result, ensure};
use log::info;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub mod fixed;
pub use fixed::{FixedParameters, FixedRunSection};
pub mod parameters;
pub use parameters::{MODEL_PARAMETERS_FILE_NAME, MobileParameters, MobileRunSection};

/// Take an option from the command line, falling back to the `[run]` table
fn run_option<T: Copy>(cli: Option<T>, file: Option<T>, name: &str) -> Result<T> {
    cli.or(file)
        .with_context(|| {
            format!(
                "No {name} given on the command line or in the [run] table of \
                 {MODEL_PARAMETERS_FILE_NAME}"
            )
        })
        .context(FailureKind::Configuration)
}

/// Check that the simulated years form a non-empty range
fn check_years(base_year: u32, end_year: u32) -> Result<RangeInclusive<u32>> {
    ensure!(
        base_year <= end_year,
        "base_year ({base_year}) cannot be after end_year ({end_year})"
    );

    Ok(base_year..=end_year)
}

/// Fully resolved options for a mobile run
#[derive(Debug, Clone, PartialEq)]
pub struct MobileRunOptions {
    /// The years to simulate
    pub years: RangeInclusive<u32>,
    /// Population scenario
    pub scenario: PopulationScenario,
    /// Throughput scenario
    pub throughput_scenario: ThroughputScenario,
    /// Intervention strategy
    pub strategy: MobileStrategy,
    /// Budget available in each year
    pub annual_budget: Money,
    /// Capacity floor targeted by the planner's first pass
    pub service_obligation: TrafficDensity,
    /// Seed for random choices
    pub seed: u64,
}

impl MobileRunOptions {
    /// Resolve run options, with command-line values taking precedence over the `[run]` table.
    ///
    /// The throughput scenario defaults to the one matching the population scenario. The service
    /// obligation and the seed default to zero.
    pub fn resolve(file: &MobileRunSection, cli: &MobileRunSection) -> Result<Self> {
        let base_year = run_option(cli.base_year, file.base_year, "base_year")?;
        let end_year = run_option(cli.end_year, file.end_year, "end_year")?;
        let scenario = run_option(cli.scenario, file.scenario, "scenario")?;

        Ok(Self {
            years: check_years(base_year, end_year).context(FailureKind::Configuration)?,
            scenario,
            throughput_scenario: cli
                .throughput_scenario
                .or(file.throughput_scenario)
                .unwrap_or_else(|| scenario.default_throughput()),
            strategy: run_option(cli.strategy, file.strategy, "strategy")?,
            annual_budget: run_option(cli.annual_budget, file.annual_budget, "annual_budget")?,
            service_obligation: cli
                .service_obligation
                .or(file.service_obligation)
                .unwrap_or_default(),
            seed: cli.seed.or(file.seed).unwrap_or_default(),
        })
    }

    /// The suffix of the output file names for this run
    pub fn output_suffix(&self) -> String {
        format!(
            "pop_{}_throughput_{}_{}",
            self.scenario, self.throughput_scenario, self.strategy
        )
    }
}

/// A mobile model loaded from a model directory
#[derive(Debug, Clone)]
pub struct MobileModel {
    /// Path to the model directory
    pub model_path: PathBuf,
    /// Parameters from `model.toml`
    pub parameters: MobileParameters,
    /// Run options
    pub options: MobileRunOptions,
    /// LADs, sectors and the initial system
    pub network: MobileNetwork,
    /// Capacity and geotype lookup tables
    pub lookups: LookupTables,
    /// Population of each sector by year
    pub population: PopulationSeries,
    /// Per-user throughput by year
    pub throughput: ThroughputSeries,
}

impl MobileModel {
    /// Read and validate a mobile model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    /// * `overrides` - Run options given on the command line
    pub fn from_path<P: AsRef<Path>>(model_dir: P, overrides: &MobileRunSection) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let parameters = MobileParameters::from_path(model_dir)?;
        let options = MobileRunOptions::resolve(&parameters.run, overrides)?;

        let lookups = read_lookup_tables(model_dir)?;
        let assets = read_initial_system(model_dir)?;
        let network = read_mobile_network(model_dir, assets)?;
        let population = read_population_scenario(model_dir, options.scenario, &network)?;
        population
            .check_covers(&options.years)
            .context(FailureKind::Schema)?;
        let throughput = read_throughput_scenario(model_dir, options.throughput_scenario)?;
        throughput
            .check_covers(&options.years)
            .context(FailureKind::Schema)?;
        check_lookup_coverage(&network, &lookups, options.strategy)?;

        info!(
            "Loaded {} postcode sectors in {} LADs",
            network.sector_count(),
            network.lads().count()
        );

        Ok(Self {
            model_path: model_dir.to_path_buf(),
            parameters,
            options,
            network,
            lookups,
            population,
            throughput,
        })
    }
}

/// Check that the lookup has a curve for every carrier which could be evaluated during the run.
///
/// This covers the LTE/5G carriers of the initial system and every carrier the strategy can
/// build.
fn check_lookup_coverage(
    network: &MobileNetwork,
    lookups: &LookupTables,
    strategy: MobileStrategy,
) -> Result<()> {
    for asset in network
        .sectors()
        .flat_map(|sector| &sector.assets)
        .filter(|asset| asset.technology.is_lte_capable())
    {
        let (frequency, bandwidth) = asset.carrier();
        lookups
            .check_carrier(frequency, bandwidth, asset.is_small_cell())
            .with_context(|| {
                format!(
                    "Initial asset at site {} in sector {} cannot be evaluated",
                    asset.site_ngr, asset.pcd_sector
                )
            })?;
    }

    for kind in strategy.admissible_kinds() {
        for carrier in kind.carriers() {
            lookups
                .check_carrier(carrier.frequency, carrier.bandwidth, kind.is_small_cell())
                .with_context(|| {
                    format!("Intervention {kind} of strategy {strategy} cannot be evaluated")
                })?;
        }
    }

    Ok(())
}

/// Fully resolved options for a fixed run
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRunOptions {
    /// The years to simulate
    pub years: RangeInclusive<u32>,
    /// Rollout strategy
    pub strategy: FixedStrategy,
    /// Budget available in each year
    pub annual_budget: Money,
}

impl FixedRunOptions {
    /// Resolve run options, with command-line values taking precedence over the `[run]` table
    pub fn resolve(file: &FixedRunSection, cli: &FixedRunSection) -> Result<Self> {
        let base_year = run_option(cli.base_year, file.base_year, "base_year")?;
        let end_year = run_option(cli.end_year, file.end_year, "end_year")?;

        Ok(Self {
            years: check_years(base_year, end_year).context(FailureKind::Configuration)?,
            strategy: run_option(cli.strategy, file.strategy, "strategy")?,
            annual_budget: run_option(cli.annual_budget, file.annual_budget, "annual_budget")?,
        })
    }
}

/// A fixed-access model loaded from a model directory
#[derive(Debug, Clone)]
pub struct FixedModel {
    /// Path to the model directory
    pub model_path: PathBuf,
    /// Parameters from `model.toml`
    pub parameters: FixedParameters,
    /// Run options
    pub options: FixedRunOptions,
    /// The access plant, with each premise's willingness to pay filled in
    pub network: FixedNetwork,
    /// Demographic score tables
    pub scores: WtpScores,
    /// Outcome of scoring the premises
    pub join: JoinSummary,
    /// Exchange bands and scheduled band decisions
    pub bands: BandInputs,
}

impl FixedModel {
    /// Read and validate a fixed model from the specified directory.
    ///
    /// Willingness to pay is computed once here and reused in every year.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    /// * `overrides` - Run options given on the command line
    pub fn from_path<P: AsRef<Path>>(model_dir: P, overrides: &FixedRunSection) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let parameters = FixedParameters::from_path(model_dir)?;
        let options = FixedRunOptions::resolve(&parameters.run, overrides)?;

        let mut network = read_fixed_network(model_dir)?;
        let scores = read_wtp_scores(model_dir)?;
        let join = assign_willingness_to_pay(&mut network, &scores);
        let bands = read_band_inputs(model_dir)?;

        info!(
            "Loaded {} exchanges serving {} premises",
            network.exchanges().count(),
            network.premises().count()
        );

        Ok(Self {
            model_path: model_dir.to_path_buf(),
            parameters,
            options,
            network,
            scores,
            join,
            bands,
        })
    }
}
