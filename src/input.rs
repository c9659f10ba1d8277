//! Common routines for handling input data.
use crate::error::FailureKind;
use crate::id::{HasID, IDLike};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::borrow::Borrow;
use std::fs;
use std::path::Path;

pub mod area;
pub mod asset;
pub mod bands;
pub mod demographics;
pub mod lookup;
pub mod plant;
pub mod scenario;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        return Err(anyhow::anyhow!("CSV file cannot be empty"))
            .context(FailureKind::Schema)
            .with_context(|| input_err_msg(file_path));
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// Unlike [`read_csv`], an empty file is permitted.
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .context(FailureKind::Configuration)
        .with_context(|| input_err_msg(file_path))?;

    let vec = reader
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path)
        .context(FailureKind::Configuration)
        .with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str)
        .context(FailureKind::Configuration)
        .with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value)
}

/// Read an optional 0/1 flag, treating a blank field as `false`
pub fn deserialise_flag<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<u8> = Deserialize::deserialize(deserialiser)?;
    match value {
        None | Some(0) => Ok(false),
        Some(1) => Ok(true),
        Some(other) => Err(serde::de::Error::custom(format!(
            "Flag must be 0 or 1, found {other}"
        ))),
    }
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check whether a slice is sorted in strictly ascending order
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.iter().tuple_windows().all(|(a, b)| a < b)
}

/// Read a CSV file of items with IDs, returning them keyed by ID in file order.
///
/// Duplicate IDs and empty IDs are rejected.
pub fn read_csv_id_file<T, ID>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
    ID: IDLike,
{
    let records = read_csv::<T>(file_path)?;
    fill_id_map(records)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(file_path))
}

/// Collect items into a map keyed by their IDs, rejecting empty and duplicate IDs
fn fill_id_map<T, ID, I>(iter: I) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID>,
    ID: IDLike,
    I: Iterator<Item = T>,
{
    let mut map = IndexMap::new();
    for record in iter {
        let id = record.get_id().clone();
        let id_str: &str = id.borrow();
        ensure!(!id_str.trim().is_empty(), "IDs cannot be empty");
        if map.insert(id.clone(), record).is_some() {
            bail!("Duplicate ID found: {id}");
        }
    }

    Ok(map)
}
