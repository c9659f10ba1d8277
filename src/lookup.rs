//! Precomputed lookup tables: capacity/spectral efficiency curves and clutter geotypes.
//!
//! Capacity curves map a site density to the capacity offered by one carrier in a given clutter
//! environment. Values between breakpoints are linearly interpolated, values below the lowest
//! breakpoint are interpolated from the origin and values above the highest are clamped.
use crate::asset::{Bandwidth, Frequency};
use crate::error::FailureKind;
use crate::units::{PopulationDensity, SiteDensity, TrafficDensity};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::{Serialize, Serializer};
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;

/// The clutter environment used to key capacity curves
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumIter,
    derive_more::Display,
    DeserializeLabeledStringEnum,
)]
pub enum Environment {
    /// Dense urban clutter
    #[string = "urban"]
    #[display("urban")]
    Urban,
    /// Suburban clutter
    #[string = "suburban"]
    #[display("suburban")]
    Suburban,
    /// Rural clutter
    #[string = "rural"]
    #[display("rural")]
    Rural,
    /// The curve used for small cells, independent of clutter
    #[string = "small_cells"]
    #[display("small_cells")]
    SmallCells,
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identifies a capacity curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapacityKey {
    /// Clutter environment
    pub environment: Environment,
    /// Carrier frequency
    pub frequency: Frequency,
    /// Channel bandwidth
    pub bandwidth: Bandwidth,
}

impl std::fmt::Display for CapacityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {} MHz, {})",
            self.environment, self.frequency, self.bandwidth
        )
    }
}

/// A breakpoint on a capacity curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityPoint {
    /// Sites per km²
    pub site_density: SiteDensity,
    /// Capacity offered at this site density
    pub capacity: TrafficDensity,
    /// Spectral efficiency at this site density, in bps/Hz
    pub spectral_efficiency: f64,
}

/// A piecewise-linear curve of capacity against site density
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityCurve(Vec<CapacityPoint>);

impl CapacityCurve {
    /// Create a new curve from breakpoints given in any order.
    ///
    /// There must be at least one breakpoint and site densities must be unique and non-negative.
    pub fn new(mut points: Vec<CapacityPoint>) -> Result<Self> {
        ensure!(!points.is_empty(), "Capacity curve has no breakpoints");
        ensure!(
            points
                .iter()
                .all(|p| p.site_density.is_finite() && p.site_density.value() >= 0.0),
            "Site densities must be finite and non-negative"
        );
        ensure!(
            points.iter().all(|p| p.capacity.is_finite()
                && p.capacity.value() >= 0.0
                && p.spectral_efficiency.is_finite()),
            "Capacities must be finite and non-negative"
        );

        points.sort_by(|a, b| a.site_density.total_cmp(&b.site_density));
        ensure!(
            points
                .iter()
                .tuple_windows()
                .all(|(a, b)| a.site_density < b.site_density),
            "Site densities must be unique"
        );

        Ok(Self(points))
    }

    /// The breakpoints of the curve, sorted by site density
    pub fn points(&self) -> &[CapacityPoint] {
        &self.0
    }

    /// The capacity at the given site density
    pub fn capacity(&self, site_density: SiteDensity) -> TrafficDensity {
        TrafficDensity(self.interpolate(site_density, |p| p.capacity.value()))
    }

    /// The spectral efficiency at the given site density
    pub fn spectral_efficiency(&self, site_density: SiteDensity) -> f64 {
        self.interpolate(site_density, |p| p.spectral_efficiency)
    }

    fn interpolate<F>(&self, site_density: SiteDensity, value_of: F) -> f64
    where
        F: Fn(&CapacityPoint) -> f64,
    {
        let density = site_density.value();
        if density <= 0.0 {
            return 0.0;
        }

        // NB: the curve is guaranteed to be non-empty
        let first = &self.0[0];
        if density < first.site_density.value() {
            return interpolate(
                (0.0, 0.0),
                (first.site_density.value(), value_of(first)),
                density,
            );
        }

        for (lower, upper) in self.0.iter().tuple_windows() {
            if lower.site_density.value() <= density && density < upper.site_density.value() {
                return interpolate(
                    (lower.site_density.value(), value_of(lower)),
                    (upper.site_density.value(), value_of(upper)),
                    density,
                );
            }
        }

        self.0.last().map_or(0.0, value_of)
    }
}

/// Linear interpolation between two points
fn interpolate((x0, y0): (f64, f64), (x1, y1): (f64, f64), x: f64) -> f64 {
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

impl SiteDensity {
    fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Capacity curves keyed by environment, frequency and bandwidth
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityLookup(HashMap<CapacityKey, CapacityCurve>);

impl CapacityLookup {
    /// Create a new lookup from curves
    pub fn new(curves: HashMap<CapacityKey, CapacityCurve>) -> Self {
        Self(curves)
    }

    /// Get the curve for a key.
    ///
    /// A missing curve is a [`FailureKind::LookupMiss`].
    pub fn curve(&self, key: &CapacityKey) -> Result<&CapacityCurve> {
        self.0
            .get(key)
            .with_context(|| format!("No capacity curve found for {key}"))
            .context(FailureKind::LookupMiss)
    }

    /// Whether there is a curve for the given key
    pub fn contains(&self, key: &CapacityKey) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over the keys of all curves
    pub fn keys(&self) -> impl Iterator<Item = &CapacityKey> {
        self.0.keys()
    }
}

/// A threshold in the clutter geotype table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeotypeThreshold {
    /// The population density from which this geotype applies
    pub population_density: PopulationDensity,
    /// The geotype
    pub geotype: Environment,
}

/// Population density thresholds mapping to clutter geotypes, sorted by ascending density
#[derive(Debug, Clone, PartialEq)]
pub struct GeotypeTable(Vec<GeotypeThreshold>);

impl GeotypeTable {
    /// Create a new table from thresholds in any order.
    ///
    /// The table must be non-empty, thresholds must be unique and the small-cell environment
    /// cannot be used as a geotype.
    pub fn new(mut thresholds: Vec<GeotypeThreshold>) -> Result<Self> {
        ensure!(!thresholds.is_empty(), "Geotype table is empty");
        ensure!(
            thresholds
                .iter()
                .all(|t| t.population_density.is_finite()),
            "Population density thresholds must be finite"
        );
        ensure!(
            thresholds
                .iter()
                .all(|t| t.geotype != Environment::SmallCells),
            "{} is not a valid clutter geotype",
            Environment::SmallCells
        );

        thresholds.sort_by(|a, b| {
            a.population_density
                .value()
                .total_cmp(&b.population_density.value())
        });
        ensure!(
            thresholds
                .iter()
                .tuple_windows()
                .all(|(a, b)| a.population_density < b.population_density),
            "Population density thresholds must be unique"
        );

        Ok(Self(thresholds))
    }

    /// The geotypes present in the table, in ascending order of density
    pub fn geotypes(&self) -> impl Iterator<Item = Environment> + '_ {
        self.0.iter().map(|t| t.geotype).unique()
    }
}

/// Classify a population density into a clutter geotype.
///
/// The geotype is that of the greatest threshold not exceeding `population_density`. Densities
/// below the lowest threshold take the lowest geotype; densities above the top threshold take the
/// top geotype.
pub fn clutter_geotype_of(
    population_density: PopulationDensity,
    table: &GeotypeTable,
) -> Environment {
    table
        .0
        .iter()
        .rev()
        .find(|t| t.population_density <= population_density)
        .unwrap_or(&table.0[0])
        .geotype
}

/// The lookup tables shared by every sector of a mobile model
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTables {
    /// Capacity curves
    pub capacity: CapacityLookup,
    /// Clutter geotype thresholds
    pub geotypes: GeotypeTable,
}

impl LookupTables {
    /// Classify a population density into a clutter geotype
    pub fn clutter_geotype_of(&self, population_density: PopulationDensity) -> Environment {
        clutter_geotype_of(population_density, &self.geotypes)
    }

    /// The capacity offered by a carrier at the given site density
    pub fn capacity_of(
        &self,
        environment: Environment,
        frequency: Frequency,
        bandwidth: Bandwidth,
        site_density: SiteDensity,
    ) -> Result<TrafficDensity> {
        let key = CapacityKey {
            environment,
            frequency,
            bandwidth,
        };
        Ok(self.capacity.curve(&key)?.capacity(site_density))
    }

    /// The spectral efficiency of a carrier at the given site density
    pub fn spectral_efficiency_of(
        &self,
        environment: Environment,
        frequency: Frequency,
        bandwidth: Bandwidth,
        site_density: SiteDensity,
    ) -> Result<f64> {
        let key = CapacityKey {
            environment,
            frequency,
            bandwidth,
        };
        Ok(self.capacity.curve(&key)?.spectral_efficiency(site_density))
    }

    /// Check that a curve exists for the carrier in every environment it could be evaluated in.
    ///
    /// Small-cell carriers are only checked against the small-cell environment; macrocell carriers
    /// are checked against every geotype of the geotype table.
    pub fn check_carrier(
        &self,
        frequency: Frequency,
        bandwidth: Bandwidth,
        small_cell: bool,
    ) -> Result<()> {
        let environments = if small_cell {
            vec![Environment::SmallCells]
        } else {
            self.geotypes.geotypes().collect()
        };

        for environment in environments {
            self.capacity.curve(&CapacityKey {
                environment,
                frequency,
                bandwidth,
            })?;
        }

        Ok(())
    }
}
