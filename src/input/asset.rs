//! Code for reading the initial mobile system from a CSV file.
use super::*;
use crate::area::SectorID;
use crate::asset::{AssetType, Bandwidth, Frequency, MobileAsset, SiteID, Technology};
use crate::units::Money;
use serde::Deserialize;

const INITIAL_SYSTEM_FILE_NAME: &str = "initial_system.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct MobileAssetRaw {
    pcd_sector: SectorID,
    site_ngr: SiteID,
    build_date: Option<u32>,
    #[serde(rename = "type")]
    asset_type: AssetType,
    technology: Technology,
    frequency: u32,
    bandwidth: Bandwidth,
    network: Option<String>,
}

/// Read the initial mobile system from the model directory.
///
/// Sector IDs are checked when the assets are attached to the network. Initial assets carry no
/// capital or operating cost.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_initial_system(model_dir: &Path) -> Result<Vec<MobileAsset>> {
    let file_path = model_dir.join(INITIAL_SYSTEM_FILE_NAME);
    let assets_csv = read_csv_optional(&file_path)?;
    read_initial_system_from_iter(assets_csv)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&file_path))
}

fn read_initial_system_from_iter<I>(iter: I) -> Result<Vec<MobileAsset>>
where
    I: Iterator<Item = MobileAssetRaw>,
{
    iter.map(|asset| -> Result<_> {
        ensure!(
            !asset.site_ngr.0.trim().is_empty(),
            "Empty site_ngr for asset in sector {}",
            asset.pcd_sector
        );
        ensure!(
            asset.frequency > 0,
            "Frequency of asset at site {} must be greater than zero",
            asset.site_ngr
        );

        Ok(MobileAsset {
            pcd_sector: asset.pcd_sector,
            site_ngr: asset.site_ngr,
            asset_type: asset.asset_type,
            technology: asset.technology,
            frequency: Frequency(asset.frequency),
            bandwidth: asset.bandwidth,
            build_date: asset.build_date,
            network: asset.network.filter(|network| !network.is_empty()),
            capex: Money(0.0),
            opex: Money(0.0),
        })
    })
    .try_collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, contents: &str) {
        let mut file = File::create(dir.join(INITIAL_SYSTEM_FILE_NAME)).unwrap();
        writeln!(
            file,
            "pcd_sector,site_ngr,build_date,type,technology,frequency,bandwidth,network\n{contents}"
        )
        .unwrap();
    }

    #[test]
    fn test_read_initial_system() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "CB1 1,TL4458,2015,macrocell_site,LTE,800,2x10MHz,A\n\
             CB1 1,TL4458,,macrocell_site,4G,2600,2x10MHz,\n\
             CB1 2,small_cell_sites,2019,small_cell,5G,3700,2x25MHz,B",
        );
        let assets = read_initial_system(dir.path()).unwrap();
        assert_eq!(assets.len(), 3);
        assert_eq!(assets[0].build_date, Some(2015));
        assert_eq!(assets[0].network.as_deref(), Some("A"));
        assert_eq!(assets[1].technology, Technology::Lte);
        assert_eq!(assets[1].build_date, None);
        assert_eq!(assets[1].network, None);
        assert_eq!(assets[2].asset_type, AssetType::SmallCell);
        assert_eq!(assets[2].bandwidth, Bandwidth(25));
        assert_eq!(assets[2].frequency, Frequency(3700));
    }

    #[test]
    fn test_empty_initial_system() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "");
        assert!(read_initial_system(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_technology() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "CB1 1,TL4458,2015,macrocell_site,6G,800,2x10MHz,A");
        let err = read_initial_system(dir.path()).unwrap_err();
        assert_eq!(err.downcast_ref::<FailureKind>(), Some(&FailureKind::Schema));
    }
}
