//! Functionality for running the fixed-access simulation.
use crate::demand::willingness::{HouseholdDemand, aggregate_households};
use crate::fixed::bands::apply_band_decisions;
use crate::fixed::{ExchangeID, FixedNetwork};
use crate::metrics::{ExchangeMetrics, exchange_metrics};
use crate::model::FixedModel;
use crate::output::fixed::FixedDataWriter;
use crate::planner::fixed::{FixedPlan, plan_year, rollout_candidates};
use crate::units::Money;
use anyhow::Result;
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;

/// What happened in one simulated year
#[derive(Debug, Clone, PartialEq)]
pub struct FixedYearOutcome {
    /// The upgrades committed and the money spent
    pub plan: FixedPlan,
    /// The state of every exchange at the end of the year
    pub metrics: Vec<ExchangeMetrics>,
    /// Willingness to pay and accept per household
    pub households: Vec<HouseholdDemand>,
}

/// A fixed-access simulation run
pub struct FixedSimulation {
    model: FixedModel,
}

impl FixedSimulation {
    /// Prepare a model for simulation
    pub fn new(model: FixedModel) -> Self {
        Self { model }
    }

    /// The model being simulated
    pub fn model(&self) -> &FixedModel {
        &self.model
    }

    /// The access plant in its current state
    pub fn network(&self) -> &FixedNetwork {
        &self.model.network
    }

    /// Simulate a single year.
    ///
    /// Band decisions scheduled for the year are applied first, then the rollout candidates are
    /// ranked and committed against the year's budget.
    pub fn step(&mut self, year: u32) -> Result<FixedYearOutcome> {
        let model = &mut self.model;
        let upgraded = apply_band_decisions(
            &mut model.bands.exchanges,
            &model.bands.decisions,
            year,
            &model.parameters.speeds,
        )?;
        if upgraded > 0 {
            debug!("Applied band decisions to {upgraded} exchanges");
        }

        let candidates =
            rollout_candidates(&model.network, model.options.strategy, &model.parameters)?;
        debug!("Found {} rollout candidates", candidates.len());
        let plan = plan_year(&mut model.network, candidates, model.options.annual_budget)?;

        let mut spend: HashMap<ExchangeID, Money> = HashMap::new();
        for candidate in &plan.committed {
            *spend.entry(candidate.exchange_id.clone()).or_default() += candidate.cost;
        }
        let metrics = exchange_metrics(&model.network, &model.parameters.speeds, &spend);
        let households = aggregate_households(&model.network);

        Ok(FixedYearOutcome {
            plan,
            metrics,
            households,
        })
    }

    /// Run the simulation over every year, writing outputs as each year completes
    pub fn run(&mut self, output_path: &Path) -> Result<()> {
        let suffix = self.model.options.strategy.to_string();
        let with_bands = !self.model.bands.exchanges.is_empty();
        let mut writer = FixedDataWriter::create(output_path, &suffix, with_bands)?;

        for year in self.model.options.years.clone() {
            info!("Year: {year}");
            let outcome = self.step(year)?;

            writer.write_metrics(year, &outcome.metrics)?;
            writer.write_plan(year, &outcome.plan)?;
            writer.write_households(year, &outcome.households)?;
            writer.write_bands(year, &self.model.bands.exchanges)?;
            writer.flush()?;

            info!(
                "Committed {} upgrades in {year}, leaving {} GBP unspent",
                outcome.plan.committed.len(),
                outcome.plan.budget.remaining()
            );
        }

        Ok(())
    }
}
