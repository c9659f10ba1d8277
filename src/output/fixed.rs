//! Writers for the yearly outputs of a fixed-access run.
use super::{UNSPENT_BUDGET_ITEM, new_writer};
use crate::area::LADID;
use crate::demand::willingness::HouseholdDemand;
use crate::error::FailureKind;
use crate::fixed::bands::ExchangeBands;
use crate::fixed::{ExchangeID, HouseholdID};
use crate::metrics::ExchangeMetrics;
use crate::planner::fixed::FixedPlan;
use crate::units::{Money, Speed};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FixedMetricsRow {
    year: u32,
    exchange_id: ExchangeID,
    geotype: String,
    premises: usize,
    fttp: usize,
    gfast: usize,
    fttc: usize,
    docsis3: usize,
    adsl: usize,
    average_speed: Speed,
    cost: Money,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FixedDecisionRow {
    year: u32,
    asset_id: String,
    level: String,
    technology: String,
    premises: usize,
    cost: Money,
    bcr: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FixedSpendRow {
    year: u32,
    asset_id: Option<String>,
    exchange_id: Option<ExchangeID>,
    item: String,
    cost: Money,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ExchangeBandsRow {
    year: u32,
    code: String,
    geotype: String,
    premises: u32,
    average_speed: Speed,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct HouseholdRow {
    year: u32,
    household_id: HouseholdID,
    lad_id: LADID,
    premises: usize,
    wtp: Money,
    wta: Option<f64>,
}

/// An object for writing the yearly outputs of a fixed-access run
pub struct FixedDataWriter {
    metrics_writer: csv::Writer<File>,
    decisions_writer: csv::Writer<File>,
    spend_writer: csv::Writer<File>,
    households_writer: csv::Writer<File>,
    bands_writer: Option<csv::Writer<File>>,
}

impl FixedDataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `suffix` - Suffix of each file name identifying the run
    /// * `with_bands` - Whether the run carries exchange bands
    pub fn create(output_path: &Path, suffix: &str, with_bands: bool) -> Result<Self> {
        let new_writer = |name: &str| new_writer(output_path, &format!("{name}_{suffix}.csv"));

        Ok(Self {
            metrics_writer: new_writer("fixed_metrics")?,
            decisions_writer: new_writer("fixed_decisions")?,
            spend_writer: new_writer("fixed_spend")?,
            households_writer: new_writer("households")?,
            bands_writer: if with_bands {
                Some(new_writer("exchange_bands")?)
            } else {
                None
            },
        })
    }

    /// Write the metrics of every exchange
    pub fn write_metrics(&mut self, year: u32, metrics: &[ExchangeMetrics]) -> Result<()> {
        for exchange in metrics {
            let counts = &exchange.technologies;
            let row = FixedMetricsRow {
                year,
                exchange_id: exchange.exchange_id.clone(),
                geotype: exchange.geotype.clone(),
                premises: exchange.premises,
                fttp: counts.fttp,
                gfast: counts.gfast,
                fttc: counts.fttc,
                docsis3: counts.docsis3,
                adsl: counts.adsl,
                average_speed: exchange.average_speed,
                cost: exchange.cost,
            };
            self.metrics_writer.serialize(row).context(FailureKind::Io)?;
        }

        Ok(())
    }

    /// Write the committed upgrades and the spend log, closed by the unspent budget
    pub fn write_plan(&mut self, year: u32, plan: &FixedPlan) -> Result<()> {
        for candidate in &plan.committed {
            let asset_id = candidate.node.to_string();
            let row = FixedDecisionRow {
                year,
                asset_id: asset_id.clone(),
                level: candidate.node.level().to_string(),
                technology: candidate.technology.to_string(),
                premises: candidate.premises,
                cost: candidate.cost,
                bcr: candidate.bcr,
            };
            self.decisions_writer
                .serialize(row)
                .context(FailureKind::Io)?;

            let row = FixedSpendRow {
                year,
                asset_id: Some(asset_id),
                exchange_id: Some(candidate.exchange_id.clone()),
                item: candidate.technology.to_string(),
                cost: candidate.cost,
            };
            self.spend_writer.serialize(row).context(FailureKind::Io)?;
        }

        let row = FixedSpendRow {
            year,
            asset_id: None,
            exchange_id: None,
            item: UNSPENT_BUDGET_ITEM.to_string(),
            cost: plan.budget.remaining(),
        };
        self.spend_writer.serialize(row).context(FailureKind::Io)?;

        Ok(())
    }

    /// Write household willingness to pay and accept
    pub fn write_households(&mut self, year: u32, households: &[HouseholdDemand]) -> Result<()> {
        for household in households {
            let row = HouseholdRow {
                year,
                household_id: household.household_id.clone(),
                lad_id: household.lad_id.clone(),
                premises: household.premises,
                wtp: household.wtp,
                wta: household.wta,
            };
            self.households_writer
                .serialize(row)
                .context(FailureKind::Io)?;
        }

        Ok(())
    }

    /// Write the state of the exchange bands, if the run carries them
    pub fn write_bands(&mut self, year: u32, exchanges: &[ExchangeBands]) -> Result<()> {
        let Some(writer) = &mut self.bands_writer else {
            return Ok(());
        };

        for exchange in exchanges {
            let row = ExchangeBandsRow {
                year,
                code: exchange.code.clone(),
                geotype: exchange.geotype.clone(),
                premises: exchange.premises(),
                average_speed: exchange.average_speed(),
            };
            writer.serialize(row).context(FailureKind::Io)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.metrics_writer.flush()?;
        self.decisions_writer.flush()?;
        self.spend_writer.flush()?;
        self.households_writer.flush()?;
        if let Some(writer) = &mut self.bands_writer {
            writer.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::willingness::{
        WtpScores, aggregate_households, assign_willingness_to_pay,
    };
    use crate::fixed::FixedNetwork;
    use crate::fixture::{exchange_bands, fixed_network, fixed_parameters, wtp_scores};
    use crate::metrics::exchange_metrics;
    use crate::model::FixedParameters;
    use crate::planner::fixed::{plan_year, rollout_candidates};
    use crate::strategy::FixedStrategy;
    use itertools::Itertools;
    use rstest::rstest;
    use serde::de::DeserializeOwned;
    use std::collections::HashMap;
    use tempfile::tempdir;

    const SUFFIX: &str = "rollout_fttp_per_distribution";

    fn read_rows<T: DeserializeOwned>(dir: &Path, name: &str) -> Vec<T> {
        csv::Reader::from_path(dir.join(format!("{name}_{SUFFIX}.csv")))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[rstest]
    fn test_write_year(
        mut fixed_network: FixedNetwork,
        fixed_parameters: FixedParameters,
        exchange_bands: ExchangeBands,
        wtp_scores: WtpScores,
    ) {
        assign_willingness_to_pay(&mut fixed_network, &wtp_scores);
        let strategy: FixedStrategy = "rollout_fttp_per_distribution".parse().unwrap();
        let candidates = rollout_candidates(&fixed_network, strategy, &fixed_parameters).unwrap();
        let budget = candidates[0].cost;
        let plan = plan_year(&mut fixed_network, candidates, budget).unwrap();
        assert_eq!(plan.committed.len(), 1);
        let metrics = exchange_metrics(&fixed_network, &fixed_parameters.speeds, &HashMap::new());
        let households = aggregate_households(&fixed_network);

        let dir = tempdir().unwrap();
        {
            let mut writer = FixedDataWriter::create(dir.path(), SUFFIX, true).unwrap();
            writer.write_metrics(2020, &metrics).unwrap();
            writer.write_plan(2020, &plan).unwrap();
            writer.write_households(2020, &households).unwrap();
            writer.write_bands(2020, &[exchange_bands]).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<FixedMetricsRow> = read_rows(dir.path(), "fixed_metrics");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].premises, 4);

        let rows: Vec<FixedDecisionRow> = read_rows(dir.path(), "fixed_decisions");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].technology, "fttp");
        assert_eq!(rows[0].level, "distribution");

        let rows: Vec<FixedSpendRow> = read_rows(dir.path(), "fixed_spend");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].item, UNSPENT_BUDGET_ITEM);
        assert_eq!(rows[1].cost, Money(0.0));
        assert_eq!(rows[1].exchange_id, None);

        let rows: Vec<HouseholdRow> = read_rows(dir.path(), "households");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.len(), households.len());

        let rows: Vec<ExchangeBandsRow> = read_rows(dir.path(), "exchange_bands");
        assert_eq!(rows[0].premises, 600);
    }

    #[test]
    fn test_no_bands_file_without_bands() {
        let dir = tempdir().unwrap();
        FixedDataWriter::create(dir.path(), SUFFIX, false).unwrap();
        assert!(
            !dir.path()
                .join(format!("exchange_bands_{SUFFIX}.csv"))
                .exists()
        );
    }
}
