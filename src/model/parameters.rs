//! Defines the `MobileParameters` struct, which represents the contents of a mobile `model.toml`.
use crate::error::FailureKind;
use crate::input::{deserialise_proportion, input_err_msg, read_toml};
use crate::strategy::{MobileStrategy, PopulationScenario, ThroughputScenario};
use crate::units::{Money, Power, TrafficDensity};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

/// The name of the model parameters file
pub const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}
pub(crate) use {define_param_default, define_unit_param_default};

define_param_default!(default_market_share, f64, 0.3);
define_param_default!(default_busy_hour_factor, f64, 3.6);
define_unit_param_default!(default_coverage_threshold, TrafficDensity, 2.0);
define_param_default!(default_spectrum_release_year, u32, 2020);
define_unit_param_default!(default_upgrade_to_lte_cost, Money, 142_446.0);
define_unit_param_default!(default_carrier_700_cost, Money, 50_917.0);
define_unit_param_default!(default_carrier_3500_cost, Money, 50_917.0);
define_unit_param_default!(default_small_cell_cost, Money, 40_220.0);
define_unit_param_default!(default_macrocell_carrier_kw, Power, 0.5);
define_unit_param_default!(default_small_cell_kw, Power, 0.05);
define_unit_param_default!(default_macrocell_carrier_opex, Money, 2000.0);
define_unit_param_default!(default_small_cell_opex, Money, 1000.0);

/// Represents the contents of a mobile model file
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct MobileParameters {
    /// The proportion of the population served by the modelled operator
    #[serde(default = "default_market_share")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub market_share: f64,
    /// The ratio of busy-hour traffic to mean traffic
    #[serde(default = "default_busy_hour_factor")]
    pub busy_hour_factor: f64,
    /// The capacity at which a sector is considered covered, in Mbps/km²
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: TrafficDensity,
    /// The first year in which 700 MHz and 3.5 GHz carriers can be built
    #[serde(default = "default_spectrum_release_year")]
    pub spectrum_release_year: u32,
    /// The cost of each kind of intervention
    #[serde(default)]
    pub intervention_costs: InterventionCosts,
    /// Power drawn by each kind of asset
    #[serde(default)]
    pub power: PowerParameters,
    /// Annual operating cost of each kind of asset
    #[serde(default)]
    pub opex: OpexParameters,
    /// Default options for running the model
    #[serde(default)]
    pub run: MobileRunSection,
}

/// Costs of mobile interventions, in GBP
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct InterventionCosts {
    /// Cost of upgrading a mast to LTE (split across the two new carriers)
    #[serde(default = "default_upgrade_to_lte_cost")]
    pub upgrade_to_lte: Money,
    /// Cost of adding a 700 MHz carrier
    #[serde(default = "default_carrier_700_cost")]
    pub carrier_700: Money,
    /// Cost of adding a 3.5 GHz carrier
    #[serde(default = "default_carrier_3500_cost")]
    pub carrier_3500: Money,
    /// Cost of deploying a small cell
    #[serde(default = "default_small_cell_cost")]
    pub small_cell: Money,
}

impl Default for InterventionCosts {
    fn default() -> Self {
        Self {
            upgrade_to_lte: default_upgrade_to_lte_cost(),
            carrier_700: default_carrier_700_cost(),
            carrier_3500: default_carrier_3500_cost(),
            small_cell: default_small_cell_cost(),
        }
    }
}

/// Power drawn by assets, in kW
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct PowerParameters {
    /// Power drawn by each macrocell carrier
    #[serde(default = "default_macrocell_carrier_kw")]
    pub macrocell_carrier_kw: Power,
    /// Power drawn by each small cell
    #[serde(default = "default_small_cell_kw")]
    pub small_cell_kw: Power,
}

impl Default for PowerParameters {
    fn default() -> Self {
        Self {
            macrocell_carrier_kw: default_macrocell_carrier_kw(),
            small_cell_kw: default_small_cell_kw(),
        }
    }
}

/// Annual operating costs of assets, in GBP
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct OpexParameters {
    /// Annual operating cost of each macrocell carrier
    #[serde(default = "default_macrocell_carrier_opex")]
    pub macrocell_carrier: Money,
    /// Annual operating cost of each small cell
    #[serde(default = "default_small_cell_opex")]
    pub small_cell: Money,
}

impl Default for OpexParameters {
    fn default() -> Self {
        Self {
            macrocell_carrier: default_macrocell_carrier_opex(),
            small_cell: default_small_cell_opex(),
        }
    }
}

/// Default run options given in the `[run]` table of a mobile model file.
///
/// Options given on the command line take precedence.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct MobileRunSection {
    /// First simulated year
    pub base_year: Option<u32>,
    /// Last simulated year (inclusive)
    pub end_year: Option<u32>,
    /// Population scenario
    pub scenario: Option<PopulationScenario>,
    /// Throughput scenario (defaults to the one matching the population scenario)
    pub throughput_scenario: Option<ThroughputScenario>,
    /// Intervention strategy
    pub strategy: Option<MobileStrategy>,
    /// Annual budget in GBP
    pub annual_budget: Option<Money>,
    /// Universal service obligation in Mbps/km² (zero disables the first planner pass)
    pub service_obligation: Option<TrafficDensity>,
    /// Seed for random choices
    pub seed: Option<u64>,
}

/// Check that a quantity is finite and non-negative
pub(crate) fn check_non_negative(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

impl MobileParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`MobileParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<MobileParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: MobileParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .context(FailureKind::Configuration)
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        // market_share already validated with deserialise_proportion
        ensure!(
            self.busy_hour_factor.is_finite() && self.busy_hour_factor > 0.0,
            "busy_hour_factor must be a finite number greater than zero"
        );
        check_non_negative(self.coverage_threshold.value(), "coverage_threshold")?;

        let costs = &self.intervention_costs;
        for (name, cost) in [
            ("upgrade_to_lte", costs.upgrade_to_lte),
            ("carrier_700", costs.carrier_700),
            ("carrier_3500", costs.carrier_3500),
            ("small_cell", costs.small_cell),
        ] {
            ensure!(
                cost.is_finite() && cost > Money(0.0),
                "Cost of {name} must be a finite number greater than zero"
            );
        }

        check_non_negative(self.power.macrocell_carrier_kw.value(), "macrocell_carrier_kw")?;
        check_non_negative(self.power.small_cell_kw.value(), "small_cell_kw")?;
        check_non_negative(self.opex.macrocell_carrier.value(), "macrocell_carrier opex")?;
        check_non_negative(self.opex.small_cell.value(), "small_cell opex")?;

        if let Some(budget) = self.run.annual_budget {
            check_non_negative(budget.value(), "annual_budget")?;
        }
        if let Some(obligation) = self.run.service_obligation {
            check_non_negative(obligation.value(), "service_obligation")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_model_file(dir: &Path, contents: &str) {
        let mut file = File::create(dir.join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let dir = tempdir().unwrap();
        write_model_file(dir.path(), "");
        let params = MobileParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.market_share, 0.3);
        assert_eq!(params.busy_hour_factor, 3.6);
        assert_eq!(params.coverage_threshold, TrafficDensity(2.0));
        assert_eq!(params.spectrum_release_year, 2020);
        assert_eq!(params.intervention_costs, InterventionCosts::default());
        assert_eq!(params.run, MobileRunSection::default());
    }

    #[test]
    fn test_run_section() {
        let dir = tempdir().unwrap();
        write_model_file(
            dir.path(),
            "[run]\nbase_year = 2020\nend_year = 2022\nscenario = \"static2017\"\n\
             strategy = \"small_cell\"\nannual_budget = 1e6\nseed = 7",
        );
        let params = MobileParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.run.base_year, Some(2020));
        assert_eq!(params.run.scenario, Some(PopulationScenario::Static2017));
        assert_eq!(params.run.strategy, Some(MobileStrategy::SmallCell));
        assert_eq!(params.run.annual_budget, Some(Money(1e6)));
        assert_eq!(params.run.seed, Some(7));
        assert_eq!(params.run.throughput_scenario, None);
    }

    #[rstest]
    #[case("market_share = 1.5")]
    #[case("busy_hour_factor = 0.0")]
    #[case("coverage_threshold = -1.0")]
    #[case("[intervention_costs]\nsmall_cell = 0.0")]
    #[case("[run]\nstrategy = \"everything\"")]
    #[case("unknown_parameter = 1")]
    fn test_invalid_parameters(#[case] contents: &str) {
        let dir = tempdir().unwrap();
        write_model_file(dir.path(), contents);
        let err = MobileParameters::from_path(dir.path()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<FailureKind>(),
            Some(&FailureKind::Configuration)
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(MobileParameters::from_path(dir.path()).is_err());
    }
}
