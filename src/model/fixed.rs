//! Defines the `FixedParameters` struct, which represents the contents of a fixed `model.toml`.
use super::parameters::{check_non_negative, define_param_default, define_unit_param_default};
use super::MODEL_PARAMETERS_FILE_NAME;
use crate::error::FailureKind;
use crate::input::{input_err_msg, read_toml};
use crate::strategy::FixedStrategy;
use crate::units::{Money, MoneyPerLength, Speed};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

define_unit_param_default!(default_fttp_speed, Speed, 2000.0);
define_unit_param_default!(default_gfast_speed, Speed, 300.0);
define_unit_param_default!(default_docsis3_speed, Speed, 200.0);
define_param_default!(
    default_fttc_by_band,
    [Speed; 3],
    [Speed(40.0), Speed(24.0), Speed(10.0)]
);
define_param_default!(
    default_adsl_by_band,
    [Speed; 3],
    [Speed(24.0), Speed(8.0), Speed(2.0)]
);
define_unit_param_default!(default_fibre_per_metre, MoneyPerLength, 5.0);
define_unit_param_default!(default_premise_fttp_terminal, Money, 67.0);
define_unit_param_default!(default_dp_fttp_head_end, Money, 1500.0);
define_unit_param_default!(default_dp_gfast_unit, Money, 4000.0);
define_unit_param_default!(default_cabinet_gfast_interface, Money, 1200.0);
define_unit_param_default!(default_cabinet_fttc_unit, Money, 8000.0);
define_param_default!(default_benefit_months, f64, 60.0);
define_param_default!(default_subsidy_cost_multiplier, f64, 0.5);

/// Represents the contents of a fixed model file
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct FixedParameters {
    /// Delivered speed of each technology
    #[serde(default)]
    pub speeds: SpeedParameters,
    /// Unit costs of upgrades
    #[serde(default)]
    pub costs: CostParameters,
    /// Number of months of willingness to pay counted as the benefit of an upgrade
    #[serde(default = "default_benefit_months")]
    pub benefit_months: f64,
    /// Multiplier applied to candidate costs by subsidised strategies
    #[serde(default = "default_subsidy_cost_multiplier")]
    pub subsidy_cost_multiplier: f64,
    /// Default options for running the model
    #[serde(default)]
    pub run: FixedRunSection,
}

/// Delivered downlink speeds, in Mbps
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SpeedParameters {
    /// Fibre to the premise
    #[serde(default = "default_fttp_speed")]
    pub fttp: Speed,
    /// G.fast
    #[serde(default = "default_gfast_speed")]
    pub gfast: Speed,
    /// Cable
    #[serde(default = "default_docsis3_speed")]
    pub docsis3: Speed,
    /// FTTC, by copper distance band
    #[serde(default = "default_fttc_by_band")]
    pub fttc_by_band: [Speed; 3],
    /// ADSL, by copper distance band
    #[serde(default = "default_adsl_by_band")]
    pub adsl_by_band: [Speed; 3],
}

impl Default for SpeedParameters {
    fn default() -> Self {
        Self {
            fttp: default_fttp_speed(),
            gfast: default_gfast_speed(),
            docsis3: default_docsis3_speed(),
            fttc_by_band: default_fttc_by_band(),
            adsl_by_band: default_adsl_by_band(),
        }
    }
}

/// Unit costs of fixed upgrades, in GBP
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct CostParameters {
    /// Cost of laying fibre, per metre
    #[serde(default = "default_fibre_per_metre")]
    pub fibre_per_metre: MoneyPerLength,
    /// Cost of an FTTP terminal at a premise
    #[serde(default = "default_premise_fttp_terminal")]
    pub premise_fttp_terminal: Money,
    /// Cost of the FTTP head end at a distribution point
    #[serde(default = "default_dp_fttp_head_end")]
    pub dp_fttp_head_end: Money,
    /// Cost of G.fast electronics at a distribution point
    #[serde(default = "default_dp_gfast_unit")]
    pub dp_gfast_unit: Money,
    /// Cost of the G.fast interface at a cabinet
    #[serde(default = "default_cabinet_gfast_interface")]
    pub cabinet_gfast_interface: Money,
    /// Cost of FTTC electronics at a cabinet
    #[serde(default = "default_cabinet_fttc_unit")]
    pub cabinet_fttc_unit: Money,
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            fibre_per_metre: default_fibre_per_metre(),
            premise_fttp_terminal: default_premise_fttp_terminal(),
            dp_fttp_head_end: default_dp_fttp_head_end(),
            dp_gfast_unit: default_dp_gfast_unit(),
            cabinet_gfast_interface: default_cabinet_gfast_interface(),
            cabinet_fttc_unit: default_cabinet_fttc_unit(),
        }
    }
}

/// Default run options given in the `[run]` table of a fixed model file
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FixedRunSection {
    /// First simulated year
    pub base_year: Option<u32>,
    /// Last simulated year (inclusive)
    pub end_year: Option<u32>,
    /// Rollout strategy
    pub strategy: Option<FixedStrategy>,
    /// Annual budget in GBP
    pub annual_budget: Option<Money>,
}

impl FixedParameters {
    /// Read a fixed model file from the specified directory
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<FixedParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: FixedParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .context(FailureKind::Configuration)
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        let speeds = &self.speeds;
        for (name, speed) in [
            ("fttp", speeds.fttp),
            ("gfast", speeds.gfast),
            ("docsis3", speeds.docsis3),
        ]
        .into_iter()
        .chain(speeds.fttc_by_band.map(|speed| ("fttc_by_band", speed)))
        .chain(speeds.adsl_by_band.map(|speed| ("adsl_by_band", speed)))
        {
            check_non_negative(speed.value(), &format!("Speed of {name}"))?;
        }

        let costs = &self.costs;
        check_non_negative(costs.fibre_per_metre.value(), "fibre_per_metre")?;
        for (name, cost) in [
            ("premise_fttp_terminal", costs.premise_fttp_terminal),
            ("dp_fttp_head_end", costs.dp_fttp_head_end),
            ("dp_gfast_unit", costs.dp_gfast_unit),
            ("cabinet_gfast_interface", costs.cabinet_gfast_interface),
            ("cabinet_fttc_unit", costs.cabinet_fttc_unit),
        ] {
            check_non_negative(cost.value(), name)?;
        }

        check_non_negative(self.benefit_months, "benefit_months")?;
        ensure!(
            self.subsidy_cost_multiplier > 0.0 && self.subsidy_cost_multiplier < 1.0,
            "subsidy_cost_multiplier must be greater than zero and less than one"
        );
        if let Some(budget) = self.run.annual_budget {
            check_non_negative(budget.value(), "annual_budget")?;
        }

        Ok(())
    }
}
