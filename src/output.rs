//! The module responsible for writing output data to disk.
use crate::area::{LADID, MobileNetwork, SectorID};
use crate::asset::{AssetType, Bandwidth, Frequency, MobileAsset, SiteID, Technology};
use crate::error::FailureKind;
use crate::lookup::{Environment, LookupTables};
use crate::metrics::MobileMetrics;
use crate::planner::mobile::MobilePlan;
use crate::units::{Energy, Money, PopulationDensity, SiteDensity, TrafficDensity};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod fixed;
pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "dcsim_results";

/// The item recorded in the spend log for the budget left at the end of a year
pub const UNSPENT_BUDGET_ITEM: &str = "unspent_budget";

/// Get the default output directory for the model at the specified path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, or clear out an existing one.
///
/// A non-empty directory is only reused if `allow_overwrite` is set.
///
/// # Returns
///
/// Whether existing output was deleted
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace its \
             contents."
        );

        fs::remove_dir_all(output_dir).context(FailureKind::Io)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir).context(FailureKind::Io)?;

    Ok(overwrite)
}

/// Open a CSV file for writing in the output folder
pub(crate) fn new_writer(output_path: &Path, file_name: &str) -> Result<csv::Writer<File>> {
    let file_path = output_path.join(file_name);
    csv::Writer::from_path(&file_path)
        .context(FailureKind::Io)
        .with_context(|| format!("Failed to create output file {}", file_path.display()))
}

/// Represents a row in the LAD metrics CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct MetricsRow {
    year: u32,
    area_id: LADID,
    area_name: String,
    cost: Money,
    demand: TrafficDensity,
    capacity: TrafficDensity,
    capacity_deficit: TrafficDensity,
    population: u64,
    pop_density: PopulationDensity,
}

/// Represents a row in the postcode sector metrics CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PcdMetricsRow {
    year: u32,
    postcode: SectorID,
    cost: Money,
    demand: TrafficDensity,
    capacity: TrafficDensity,
    capacity_deficit: TrafficDensity,
    population: u64,
    pop_density: PopulationDensity,
}

/// Represents a row in the decisions CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DecisionRow {
    year: u32,
    pcd_sector: SectorID,
    site_ngr: SiteID,
    build_date: Option<u32>,
    #[serde(rename = "type")]
    asset_type: AssetType,
    technology: Technology,
    frequency: Frequency,
    bandwidth: Bandwidth,
}

/// Represents a row in the spend CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SpendRow {
    year: u32,
    pcd_sector: Option<SectorID>,
    lad: Option<LADID>,
    item: String,
    cost: Money,
}

/// Represents a row in the LAD summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    year: u32,
    area_id: LADID,
    coverage: f64,
    energy_demand_kwh: Energy,
    opex: Money,
}

/// Represents a row in the debug capacity CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DebugCapacityRow {
    year: u32,
    pcd_sector: SectorID,
    environment: Environment,
    frequency: Frequency,
    bandwidth: Bandwidth,
    site_density: SiteDensity,
    capacity: TrafficDensity,
}

/// An object for writing the yearly outputs of a mobile run
pub struct DataWriter {
    metrics_writer: csv::Writer<File>,
    pcd_metrics_writer: csv::Writer<File>,
    decisions_writer: csv::Writer<File>,
    spend_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
    debug_capacity_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `suffix` - Suffix of each file name identifying the run
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, suffix: &str, save_debug_info: bool) -> Result<Self> {
        let new_writer = |name: &str| new_writer(output_path, &format!("{name}_{suffix}.csv"));

        let debug_capacity_writer = if save_debug_info {
            Some(new_writer("debug_capacity")?)
        } else {
            None
        };

        Ok(Self {
            metrics_writer: new_writer("metrics")?,
            pcd_metrics_writer: new_writer("pcd_metrics")?,
            decisions_writer: new_writer("decisions")?,
            spend_writer: new_writer("spend")?,
            summary_writer: new_writer("summary")?,
            debug_capacity_writer,
        })
    }

    /// Write LAD metrics, sector metrics and LAD summaries for a year
    pub fn write_metrics(&mut self, year: u32, metrics: &MobileMetrics) -> Result<()> {
        for lad in &metrics.lads {
            let row = MetricsRow {
                year,
                area_id: lad.lad_id.clone(),
                area_name: lad.name.clone(),
                cost: lad.cost,
                demand: lad.demand,
                capacity: lad.capacity,
                capacity_deficit: lad.capacity_deficit,
                population: lad.population,
                pop_density: lad.population_density,
            };
            self.metrics_writer.serialize(row).context(FailureKind::Io)?;

            let row = SummaryRow {
                year,
                area_id: lad.lad_id.clone(),
                coverage: lad.coverage,
                energy_demand_kwh: lad.energy_demand,
                opex: lad.opex,
            };
            self.summary_writer.serialize(row).context(FailureKind::Io)?;
        }

        for sector in &metrics.sectors {
            let row = PcdMetricsRow {
                year,
                postcode: sector.pcd_sector.clone(),
                cost: sector.cost,
                demand: sector.demand,
                capacity: sector.capacity,
                capacity_deficit: sector.capacity_deficit,
                population: sector.population,
                pop_density: sector.population_density,
            };
            self.pcd_metrics_writer
                .serialize(row)
                .context(FailureKind::Io)?;
        }

        Ok(())
    }

    /// Write the assets built in a year
    pub fn write_decisions<'a, I>(&mut self, year: u32, assets: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a MobileAsset>,
    {
        for asset in assets {
            let row = DecisionRow {
                year,
                pcd_sector: asset.pcd_sector.clone(),
                site_ngr: asset.site_ngr.clone(),
                build_date: asset.build_date,
                asset_type: asset.asset_type,
                technology: asset.technology,
                frequency: asset.frequency,
                bandwidth: asset.bandwidth,
            };
            self.decisions_writer
                .serialize(row)
                .context(FailureKind::Io)?;
        }

        Ok(())
    }

    /// Write the spend log of a year, closed by a row carrying the unspent budget
    pub fn write_spend(&mut self, year: u32, plan: &MobilePlan) -> Result<()> {
        for spend in &plan.spend {
            let row = SpendRow {
                year,
                pcd_sector: Some(spend.pcd_sector.clone()),
                lad: Some(spend.lad_id.clone()),
                item: spend.item.to_string(),
                cost: spend.cost,
            };
            self.spend_writer.serialize(row).context(FailureKind::Io)?;
        }

        let row = SpendRow {
            year,
            pcd_sector: None,
            lad: None,
            item: UNSPENT_BUDGET_ITEM.to_string(),
            cost: plan.budget.remaining(),
        };
        self.spend_writer.serialize(row).context(FailureKind::Io)?;

        Ok(())
    }

    /// Write the capacity contributed by each carrier of each sector, if saving debug info
    pub fn write_debug_capacity(
        &mut self,
        year: u32,
        network: &MobileNetwork,
        lookups: &LookupTables,
    ) -> Result<()> {
        let Some(writer) = &mut self.debug_capacity_writer else {
            return Ok(());
        };

        for sector in network.sectors() {
            for carrier in sector.carrier_capacities(lookups)? {
                let row = DebugCapacityRow {
                    year,
                    pcd_sector: sector.id.clone(),
                    environment: carrier.environment,
                    frequency: carrier.frequency,
                    bandwidth: carrier.bandwidth,
                    site_density: carrier.site_density,
                    capacity: carrier.capacity,
                };
                writer.serialize(row).context(FailureKind::Io)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.metrics_writer.flush()?;
        self.pcd_metrics_writer.flush()?;
        self.decisions_writer.flush()?;
        self.spend_writer.flush()?;
        self.summary_writer.flush()?;
        if let Some(writer) = &mut self.debug_capacity_writer {
            writer.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::PostcodeSector;
    use crate::fixture::{lookup_tables, mobile_asset, mobile_network, mobile_parameters, sector};
    use crate::intervention::InterventionKind;
    use crate::metrics::MobileMetrics;
    use crate::model::MobileParameters;
    use crate::planner::Budget;
    use crate::planner::mobile::MobileSpend;
    use itertools::Itertools;
    use serde::de::DeserializeOwned;
    use std::collections::HashMap;
    use tempfile::tempdir;

    const SUFFIX: &str = "pop_baseline_throughput_baseline_minimal";

    fn read_rows<T: DeserializeOwned>(dir: &Path, name: &str) -> Vec<T> {
        csv::Reader::from_path(dir.join(format!("{name}_{SUFFIX}.csv")))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[test]
    fn test_create_output_directory_new() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), "").unwrap();

        // Non-empty folder is only reused when overwriting
        assert!(create_output_directory(dir.path(), false).is_err());
        assert!(create_output_directory(dir.path(), true).unwrap());
        assert!(!dir.path().join("file.txt").exists());

        // Empty folder can be reused either way
        assert!(!create_output_directory(dir.path(), false).unwrap());
    }

    #[rstest::rstest]
    fn test_write_year(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        mut sector: PostcodeSector,
    ) {
        let asset = mobile_asset(&sector.id, "mast1", Technology::Lte, 800, 10);
        sector.assets.push(asset.clone());
        let network = mobile_network(vec![sector]);
        let metrics =
            MobileMetrics::new(&network, &lookup_tables, &mobile_parameters, &HashMap::new())
                .unwrap();
        let mut budget = Budget::new(Money(100.0));
        assert!(budget.try_spend(Money(60.0)));
        let plan = MobilePlan {
            built: vec![asset.clone()],
            spend: vec![MobileSpend {
                pcd_sector: asset.pcd_sector.clone(),
                lad_id: "E07000008".into(),
                item: InterventionKind::Carrier700,
                cost: Money(60.0),
            }],
            budget,
        };

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), SUFFIX, true).unwrap();
            writer.write_metrics(2020, &metrics).unwrap();
            writer.write_decisions(2020, &plan.built).unwrap();
            writer.write_spend(2020, &plan).unwrap();
            writer
                .write_debug_capacity(2020, &network, &lookup_tables)
                .unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<MetricsRow> = read_rows(dir.path(), "metrics");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].population, 500);
        let rows: Vec<PcdMetricsRow> = read_rows(dir.path(), "pcd_metrics");
        assert_eq!(rows[0].postcode, "CB1 1".into());
        let rows: Vec<DecisionRow> = read_rows(dir.path(), "decisions");
        assert_eq!(rows[0].bandwidth, Bandwidth(10));
        assert_eq!(rows[0].asset_type, AssetType::MacrocellSite);

        let rows: Vec<SpendRow> = read_rows(dir.path(), "spend");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item, "carrier_700");
        assert_eq!(rows[1].item, UNSPENT_BUDGET_ITEM);
        assert_eq!(rows[1].pcd_sector, None);
        assert_eq!(rows[0].cost + rows[1].cost, Money(100.0));

        let rows: Vec<SummaryRow> = read_rows(dir.path(), "summary");
        assert_eq!(rows[0].area_id, "E07000008".into());
        let rows: Vec<DebugCapacityRow> = read_rows(dir.path(), "debug_capacity");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].environment, Environment::Urban);
    }

    #[test]
    fn test_no_debug_file_by_default() {
        let dir = tempdir().unwrap();
        DataWriter::create(dir.path(), SUFFIX, false).unwrap();
        assert!(
            !dir.path()
                .join(format!("debug_capacity_{SUFFIX}.csv"))
                .exists()
        );
    }
}
