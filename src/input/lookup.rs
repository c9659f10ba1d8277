//! Code for reading the capacity and clutter geotype lookup tables.
use super::*;
use crate::asset::{Bandwidth, Frequency};
use crate::lookup::{
    CapacityCurve, CapacityKey, CapacityLookup, CapacityPoint, Environment, GeotypeTable,
    GeotypeThreshold, LookupTables,
};
use crate::units::{PopulationDensity, SiteDensity, TrafficDensity};
use serde::Deserialize;
use std::collections::HashMap;

const CAPACITY_LOOKUP_FILE_NAME: &str = "capacity_lookup.csv";
const GEOTYPES_FILE_NAME: &str = "clutter_geotypes.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct CapacityRaw {
    environment: Environment,
    #[serde(rename = "frequency_GHz")]
    frequency_ghz: f64,
    #[serde(rename = "bandwidth_MHz")]
    bandwidth_mhz: Bandwidth,
    sites_per_km2: f64,
    capacity_mbps_km2: f64,
    spectral_efficiency_bps_hz: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct GeotypeRaw {
    population_density_upper_bound: f64,
    geotype: Environment,
}

/// Read the capacity and geotype lookup tables from the model directory
pub fn read_lookup_tables(model_dir: &Path) -> Result<LookupTables> {
    Ok(LookupTables {
        capacity: read_capacity_lookup(model_dir)?,
        geotypes: read_geotype_table(model_dir)?,
    })
}

fn read_capacity_lookup(model_dir: &Path) -> Result<CapacityLookup> {
    let file_path = model_dir.join(CAPACITY_LOOKUP_FILE_NAME);
    let rows = read_csv(&file_path)?;
    read_capacity_lookup_from_iter(rows)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&file_path))
}

fn read_capacity_lookup_from_iter<I>(iter: I) -> Result<CapacityLookup>
where
    I: Iterator<Item = CapacityRaw>,
{
    let grouped = iter
        .map(|row| -> Result<_> {
            let key = CapacityKey {
                environment: row.environment,
                frequency: Frequency::from_ghz(row.frequency_ghz)?,
                bandwidth: row.bandwidth_mhz,
            };
            let point = CapacityPoint {
                site_density: SiteDensity(row.sites_per_km2),
                capacity: TrafficDensity(row.capacity_mbps_km2),
                spectral_efficiency: row.spectral_efficiency_bps_hz,
            };
            Ok((key, point))
        })
        .process_results(|iter| iter.into_group_map())?;

    let curves: HashMap<_, _> = grouped
        .into_iter()
        .map(|(key, points)| -> Result<_> {
            let curve = CapacityCurve::new(points)
                .with_context(|| format!("Invalid capacity curve for {key}"))?;
            Ok((key, curve))
        })
        .try_collect()?;

    Ok(CapacityLookup::new(curves))
}

fn read_geotype_table(model_dir: &Path) -> Result<GeotypeTable> {
    let file_path = model_dir.join(GEOTYPES_FILE_NAME);
    let thresholds = read_csv::<GeotypeRaw>(&file_path)?
        .map(|row| GeotypeThreshold {
            population_density: PopulationDensity(row.population_density_upper_bound),
            geotype: row.geotype,
        })
        .collect();

    GeotypeTable::new(thresholds)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_lookups(dir: &Path, capacity: &str) {
        let mut file = File::create(dir.join(CAPACITY_LOOKUP_FILE_NAME)).unwrap();
        writeln!(
            file,
            "environment,frequency_GHz,bandwidth_MHz,sites_per_km2,capacity_mbps_km2,\
             spectral_efficiency_bps_hz\n{capacity}"
        )
        .unwrap();
        let mut file = File::create(dir.join(GEOTYPES_FILE_NAME)).unwrap();
        writeln!(
            file,
            "population_density_upper_bound,geotype\n7959,urban\n782,suburban\n0,rural"
        )
        .unwrap();
    }

    #[test]
    fn test_read_lookup_tables() {
        let dir = tempdir().unwrap();
        write_lookups(
            dir.path(),
            "urban,0.8,10,1,2,1.2\nurban,0.8,10,0,1,0.8\nsmall_cells,3.7,25,4,20,3.1",
        );
        let lookups = read_lookup_tables(dir.path()).unwrap();

        // Points are sorted on load
        let value = lookups
            .capacity_of(
                Environment::Urban,
                Frequency(800),
                Bandwidth(10),
                SiteDensity(0.5),
            )
            .unwrap();
        assert_eq!(value, TrafficDensity(1.5));
        assert!(lookups.capacity.contains(&CapacityKey {
            environment: Environment::SmallCells,
            frequency: Frequency(3700),
            bandwidth: Bandwidth(25),
        }));

        assert_eq!(
            lookups.clutter_geotype_of(PopulationDensity(1000.0)),
            Environment::Suburban
        );
    }

    #[test]
    fn test_duplicate_breakpoint() {
        let dir = tempdir().unwrap();
        write_lookups(dir.path(), "urban,0.8,10,1,2,1.2\nurban,0.8,10,1,3,0.8");
        let err = read_lookup_tables(dir.path()).unwrap_err();
        assert_eq!(err.downcast_ref::<FailureKind>(), Some(&FailureKind::Schema));
    }

    #[test]
    fn test_unknown_environment() {
        let dir = tempdir().unwrap();
        write_lookups(dir.path(), "jungle,0.8,10,1,2,1.2");
        let err = read_lookup_tables(dir.path()).unwrap_err();
        assert_eq!(err.downcast_ref::<FailureKind>(), Some(&FailureKind::Schema));
    }
}
