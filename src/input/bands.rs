//! Code for reading exchange distance bands and the decisions scheduled against them.
use super::*;
use crate::fixed::AccessTechnology;
use crate::fixed::bands::{Band, BandDecision, ExchangeBands};
use crate::units::Speed;
use serde::Deserialize;
use std::collections::HashMap;

const EXCHANGE_BANDS_FILE_NAME: &str = "exchange_bands.csv";
const FIXED_GEOTYPES_FILE_NAME: &str = "fixed_geotypes.csv";
const BAND_DECISIONS_FILE_NAME: &str = "band_decisions.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct ExchangeBandsRaw {
    code: String,
    prem_under_1km: u32,
    prem_1_3km: u32,
    prem_over_3km: u32,
    av_spd_per_prem: f64,
    oslaua: String,
    oscty: String,
    gor: String,
    geotype_number: u32,
}

#[derive(Debug, Deserialize, PartialEq)]
struct FixedGeotypeRaw {
    geotype_number: u32,
    geotype: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct BandDecisionRaw {
    year: u32,
    name: String,
}

/// Exchange bands together with the decisions which upgrade them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandInputs {
    /// Bands of each exchange, in file order
    pub exchanges: Vec<ExchangeBands>,
    /// Decisions, in file order
    pub decisions: Vec<BandDecision>,
}

/// Read the optional exchange bands and band decisions.
///
/// The geotype table is only required when either file has rows.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_band_inputs(model_dir: &Path) -> Result<BandInputs> {
    let bands_path = model_dir.join(EXCHANGE_BANDS_FILE_NAME);
    let bands_raw = if bands_path.is_file() {
        read_csv_optional::<ExchangeBandsRaw>(&bands_path)?.collect_vec()
    } else {
        Vec::new()
    };
    let decisions_path = model_dir.join(BAND_DECISIONS_FILE_NAME);
    let decisions_raw = if decisions_path.is_file() {
        read_csv_optional::<BandDecisionRaw>(&decisions_path)?.collect_vec()
    } else {
        Vec::new()
    };
    if bands_raw.is_empty() && decisions_raw.is_empty() {
        return Ok(BandInputs::default());
    }

    let geotypes = read_fixed_geotypes(model_dir)?;
    let exchanges: Vec<_> = bands_raw
        .into_iter()
        .map(|raw| exchange_bands_from_raw(raw, &geotypes))
        .try_collect()
        .with_context(|| input_err_msg(&bands_path))?;
    let decisions: Vec<_> = decisions_raw
        .into_iter()
        .map(|raw| band_decision_from_raw(&raw, &geotypes))
        .try_collect()
        .with_context(|| input_err_msg(&decisions_path))?;

    Ok(BandInputs {
        exchanges,
        decisions,
    })
}

/// Read the table mapping geotype numbers to labels
fn read_fixed_geotypes(model_dir: &Path) -> Result<HashMap<u32, String>> {
    let file_path = model_dir.join(FIXED_GEOTYPES_FILE_NAME);
    let mut geotypes = HashMap::new();
    for row in read_csv::<FixedGeotypeRaw>(&file_path)? {
        if geotypes.insert(row.geotype_number, row.geotype).is_some() {
            return Err(anyhow::anyhow!(
                "Duplicate geotype number found: {}",
                row.geotype_number
            ))
            .context(FailureKind::Schema)
            .with_context(|| input_err_msg(&file_path));
        }
    }

    Ok(geotypes)
}

fn exchange_bands_from_raw(
    raw: ExchangeBandsRaw,
    geotypes: &HashMap<u32, String>,
) -> Result<ExchangeBands> {
    let geotype = geotypes
        .get(&raw.geotype_number)
        .with_context(|| {
            format!(
                "Unknown geotype number {} for exchange {}",
                raw.geotype_number, raw.code
            )
        })
        .context(FailureKind::LookupMiss)?;
    if !(raw.av_spd_per_prem.is_finite() && raw.av_spd_per_prem >= 0.0) {
        return Err(anyhow::anyhow!(
            "Average speed of exchange {} must be a finite number greater than or equal to zero",
            raw.code
        ))
        .context(FailureKind::Schema);
    }

    let speed = Speed(raw.av_spd_per_prem);
    let band = |premises| Band {
        premises,
        speed,
        technology: AccessTechnology::Adsl,
    };

    Ok(ExchangeBands {
        geotype: geotype.clone(),
        bands: [
            band(raw.prem_under_1km),
            band(raw.prem_1_3km),
            band(raw.prem_over_3km),
        ],
        code: raw.code,
        oslaua: raw.oslaua,
        oscty: raw.oscty,
        gor: raw.gor,
    })
}

fn band_decision_from_raw(
    raw: &BandDecisionRaw,
    geotypes: &HashMap<u32, String>,
) -> Result<BandDecision> {
    let decision = BandDecision::parse(raw.year, &raw.name).context(FailureKind::Schema)?;
    if !geotypes.values().any(|geotype| *geotype == decision.geotype) {
        return Err(anyhow::anyhow!(
            "Unknown geotype {} in decision {}",
            decision.geotype,
            raw.name
        ))
        .context(FailureKind::LookupMiss);
    }

    Ok(decision)
}
