//! Code for reading the willingness-to-pay score tables.
use super::*;
use crate::demand::willingness::{ScoreTable, WtpScores};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct ScoreRaw {
    category: String,
    score: i32,
}

/// The name of the file holding the scores for one demographic attribute
fn score_file_name(attribute: &str) -> String {
    format!("wtp_{attribute}.csv")
}

/// Read the score tables for age, gender, nation and socio-economic status.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_wtp_scores(model_dir: &Path) -> Result<WtpScores> {
    Ok(WtpScores {
        age: read_score_table(model_dir, "age")?,
        gender: read_score_table(model_dir, "gender")?,
        nation: read_score_table(model_dir, "nation")?,
        ses: read_score_table(model_dir, "ses")?,
    })
}

fn read_score_table(model_dir: &Path, attribute: &str) -> Result<ScoreTable> {
    let file_path = model_dir.join(score_file_name(attribute));
    let rows = read_csv(&file_path)?;
    read_score_table_from_iter(rows)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&file_path))
}

fn read_score_table_from_iter<I>(iter: I) -> Result<ScoreTable>
where
    I: Iterator<Item = ScoreRaw>,
{
    let mut table = ScoreTable::new();
    for row in iter {
        ensure!(!row.category.is_empty(), "Categories cannot be empty");
        if table.insert(row.category.clone(), row.score).is_some() {
            bail!("Duplicate category found: {}", row.category);
        }
    }

    Ok(table)
}
