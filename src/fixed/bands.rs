//! Distance bands of premises per exchange, and the scheduled decisions which upgrade them.
use super::AccessTechnology;
use crate::model::fixed::SpeedParameters;
use crate::units::Speed;
use anyhow::{Context, Result, bail, ensure};
use serde::Serialize;

/// The number of distance bands per exchange (<1 km, 1–3 km, >3 km)
pub const BAND_COUNT: usize = 3;

/// A group of premises at similar distance from their exchange
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Number of premises in the band
    pub premises: u32,
    /// Speed delivered to each premise
    pub speed: Speed,
    /// Technology serving the band
    pub technology: AccessTechnology,
}

/// The premises served by an exchange, bucketed by distance
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeBands {
    /// Exchange code
    pub code: String,
    /// Geotype label of the exchange
    pub geotype: String,
    /// Local authority code
    pub oslaua: String,
    /// County code
    pub oscty: String,
    /// Region code
    pub gor: String,
    /// The bands, nearest first
    pub bands: [Band; BAND_COUNT],
}

impl ExchangeBands {
    /// Total number of premises across the bands
    pub fn premises(&self) -> u32 {
        self.bands.iter().map(|band| band.premises).sum()
    }

    /// Premises-weighted mean speed across the bands (zero if there are no premises)
    pub fn average_speed(&self) -> Speed {
        let premises = self.premises();
        if premises == 0 {
            return Speed(0.0);
        }

        let total: f64 = self
            .bands
            .iter()
            .map(|band| f64::from(band.premises) * band.speed.value())
            .sum();
        Speed(total / f64::from(premises))
    }

    /// Upgrade one band (numbered from 1) to the given technology
    pub fn upgrade(
        &mut self,
        band: usize,
        technology: AccessTechnology,
        speeds: &SpeedParameters,
    ) -> Result<()> {
        let speed = match technology {
            AccessTechnology::Fttp => speeds.fttp,
            AccessTechnology::GFast => speeds.gfast,
            _ => bail!("Bands can only be upgraded to fttp or gfast"),
        };
        let band = band
            .checked_sub(1)
            .and_then(|index| self.bands.get_mut(index))
            .with_context(|| format!("Band must be between 1 and {BAND_COUNT}"))?;
        band.technology = technology;
        band.speed = speed;

        Ok(())
    }
}

/// An upgrade of one band of every exchange of a geotype, scheduled for a year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandDecision {
    /// The year in which the upgrade is applied
    pub year: u32,
    /// The technology deployed
    pub technology: AccessTechnology,
    /// The geotype label of the exchanges affected
    pub geotype: String,
    /// The band upgraded (numbered from 1)
    pub band: usize,
}

impl BandDecision {
    /// Parse a decision from a name of the form `<fttp|gfast>_<geotype>_<band>`.
    ///
    /// The geotype label may itself contain underscores.
    pub fn parse(year: u32, name: &str) -> Result<Self> {
        let (technology, rest) = name
            .split_once('_')
            .with_context(|| format!("Invalid decision name: {name}"))?;
        let (geotype, band) = rest
            .rsplit_once('_')
            .with_context(|| format!("Invalid decision name: {name}"))?;

        let technology = match technology {
            "fttp" => AccessTechnology::Fttp,
            "gfast" => AccessTechnology::GFast,
            _ => bail!("Unknown technology in decision {name}: expected fttp or gfast"),
        };
        ensure!(!geotype.is_empty(), "Missing geotype in decision {name}");
        let band: usize = band
            .parse()
            .ok()
            .filter(|band| (1..=BAND_COUNT).contains(band))
            .with_context(|| {
                format!("Band in decision {name} must be between 1 and {BAND_COUNT}")
            })?;

        Ok(Self {
            year,
            technology,
            geotype: geotype.to_string(),
            band,
        })
    }
}

/// Apply the decisions scheduled for `year` to every exchange of the matching geotype.
///
/// Returns the number of bands upgraded.
pub fn apply_band_decisions(
    exchanges: &mut [ExchangeBands],
    decisions: &[BandDecision],
    year: u32,
    speeds: &SpeedParameters,
) -> Result<usize> {
    let mut upgraded = 0;
    for decision in decisions.iter().filter(|decision| decision.year == year) {
        for exchange in exchanges
            .iter_mut()
            .filter(|exchange| exchange.geotype == decision.geotype)
        {
            exchange.upgrade(decision.band, decision.technology, speeds)?;
            upgraded += 1;
        }
    }

    Ok(upgraded)
}
