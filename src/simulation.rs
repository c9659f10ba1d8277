//! Functionality for running the mobile simulation.
//!
//! Each year the sectors' population and throughput are updated from the scenarios, the planner
//! builds what the budget allows and the network is re-evaluated. Outputs for a year are written
//! once all of its computation is complete.
use crate::area::{MobileNetwork, SectorID};
use crate::demand::update_sector_demand;
use crate::metrics::MobileMetrics;
use crate::model::{MobileModel, MobileParameters};
use crate::output::DataWriter;
use crate::planner::mobile::{MobilePlan, MobilePlanner};
use crate::units::Money;
use anyhow::Result;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::Path;

pub mod fixed;
pub use fixed::FixedSimulation;

/// The years to which undated LTE/5G assets of the initial system are back-dated
const BACKDATE_YEARS: RangeInclusive<u32> = 2012..=2014;

/// What happened in one simulated year
#[derive(Debug, Clone, PartialEq)]
pub struct YearOutcome {
    /// The assets built and the money spent
    pub plan: MobilePlan,
    /// The state of the network at the end of the year
    pub metrics: MobileMetrics,
}

/// A mobile simulation run.
///
/// The simulation owns the network; nothing else mutates it.
pub struct Simulation {
    model: MobileModel,
}

impl Simulation {
    /// Prepare a model for simulation.
    ///
    /// Undated LTE/5G assets of the initial system are given a build year drawn from the seeded
    /// generator and every initial asset is given its operating cost.
    pub fn new(mut model: MobileModel) -> Self {
        let mut rng = StdRng::seed_from_u64(model.options.seed);
        prepare_initial_system(&mut model.network, &model.parameters, &mut rng);

        Self { model }
    }

    /// The model being simulated
    pub fn model(&self) -> &MobileModel {
        &self.model
    }

    /// The network in its current state
    pub fn network(&self) -> &MobileNetwork {
        &self.model.network
    }

    /// Simulate a single year
    pub fn step(&mut self, year: u32) -> Result<YearOutcome> {
        let model = &mut self.model;
        for sector in model.network.sectors_mut() {
            update_sector_demand(sector, year, &model.population, &model.throughput)?;
            sector.clutter_geotype = model
                .lookups
                .clutter_geotype_of(sector.population_density());
        }

        let planner = MobilePlanner {
            lookups: &model.lookups,
            parameters: &model.parameters,
            strategy: model.options.strategy,
            service_obligation: model.options.service_obligation,
        };
        let plan = planner.plan_year(&mut model.network, year, model.options.annual_budget)?;

        let mut spend: HashMap<SectorID, Money> = HashMap::new();
        for item in &plan.spend {
            *spend.entry(item.pcd_sector.clone()).or_default() += item.cost;
        }
        let metrics =
            MobileMetrics::new(&model.network, &model.lookups, &model.parameters, &spend)?;

        Ok(YearOutcome { plan, metrics })
    }

    /// Run the simulation over every year, writing outputs as each year completes.
    ///
    /// # Arguments
    ///
    /// * `output_path` - The folder to which output files will be written
    /// * `debug_model` - Whether to write additional information for debugging
    pub fn run(&mut self, output_path: &Path, debug_model: bool) -> Result<()> {
        let suffix = self.model.options.output_suffix();
        let mut writer = DataWriter::create(output_path, &suffix, debug_model)?;

        for year in self.model.options.years.clone() {
            info!("Year: {year}");
            let outcome = self.step(year)?;

            writer.write_metrics(year, &outcome.metrics)?;
            writer.write_decisions(year, &outcome.plan.built)?;
            writer.write_spend(year, &outcome.plan)?;
            writer.write_debug_capacity(year, &self.model.network, &self.model.lookups)?;
            writer.flush()?;

            info!(
                "Built {} assets in {year}, leaving {} GBP unspent",
                outcome.plan.built.len(),
                outcome.plan.budget.remaining()
            );
        }

        Ok(())
    }
}

/// Back-date undated LTE/5G assets and set the operating cost of every initial asset.
///
/// Assets are visited in network order so that the draws depend only on the seed.
fn prepare_initial_system<R: Rng>(
    network: &mut MobileNetwork,
    parameters: &MobileParameters,
    rng: &mut R,
) {
    let mut backdated = 0;
    for asset in network.sectors_mut().flat_map(|sector| &mut sector.assets) {
        if asset.build_date.is_none() && asset.technology.is_lte_capable() {
            asset.build_date = Some(rng.gen_range(BACKDATE_YEARS));
            backdated += 1;
        }

        asset.opex = if asset.is_small_cell() {
            parameters.opex.small_cell
        } else {
            parameters.opex.macrocell_carrier
        };
    }

    debug!("Back-dated {backdated} assets of the initial system");
}
