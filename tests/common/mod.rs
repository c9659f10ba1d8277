//! Common code for the integration tests.
use float_cmp::approx_eq;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, read_dir};
use std::path::{Path, PathBuf};

// Not every test file uses every function below, so the warnings about unused code are suppressed
// manually

/// Get the path to a bundled demo model
#[allow(dead_code)]
pub fn get_model_dir(name: &str) -> PathBuf {
    PathBuf::from("demos").join(name)
}

/// Silence logging for the test process
#[allow(dead_code)]
pub fn quiet_logs() {
    unsafe { std::env::set_var("DCSIM_LOG_LEVEL", "off") };
}

/// Find the single output file whose name starts with `prefix`
#[allow(dead_code)]
pub fn find_output(output_dir: &Path, prefix: &str) -> PathBuf {
    let matches = read_dir(output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".csv"))
        })
        .collect_vec();
    assert_eq!(
        matches.len(),
        1,
        "Expected one output file starting with {prefix}, found {matches:?}"
    );
    matches.into_iter().next().unwrap()
}

/// The names of the CSV files in an output folder, sorted
#[allow(dead_code)]
pub fn csv_file_names(output_dir: &Path) -> Vec<String> {
    read_dir(output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".csv"))
        .sorted()
        .collect()
}

/// Check that two output folders contain byte-identical CSV files
#[allow(dead_code)]
pub fn assert_same_csv_outputs(dir1: &Path, dir2: &Path) {
    let names = csv_file_names(dir1);
    assert!(!names.is_empty());
    assert_eq!(names, csv_file_names(dir2));
    for name in names {
        let contents1 = fs::read(dir1.join(&name)).unwrap();
        let contents2 = fs::read(dir2.join(&name)).unwrap();
        assert!(contents1 == contents2, "Outputs differ for {name}");
    }
}

/// Total of the `cost` column of a spend file for each year, unspent budget included
#[allow(dead_code)]
pub fn spend_by_year(path: &Path) -> BTreeMap<u32, f64> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let column = |name| headers.iter().position(|h| h == name).unwrap();
    let (year_idx, cost_idx) = (column("year"), column("cost"));

    let mut totals = BTreeMap::new();
    for record in reader.records() {
        let record = record.unwrap();
        let year: u32 = record[year_idx].parse().unwrap();
        let cost: f64 = record[cost_idx].parse().unwrap();
        *totals.entry(year).or_default() += cost;
    }
    totals
}

/// Check that the spend of every year adds up to the annual budget
#[allow(dead_code)]
pub fn assert_budget_identity(path: &Path, years: &[u32], annual_budget: f64) {
    let totals = spend_by_year(path);
    assert_eq!(totals.keys().copied().collect_vec(), years);
    for (year, total) in totals {
        assert!(
            approx_eq!(f64, total, annual_budget, epsilon = 1e-6),
            "Spend in {year} adds up to {total} rather than {annual_budget}"
        );
    }
}

/// Read every record of a CSV file, keyed by column name
#[allow(dead_code)]
pub fn csv_records(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect()
        })
        .collect()
}
