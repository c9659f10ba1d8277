//! Code for reading LADs and postcode sectors.
use super::*;
use crate::area::{Lad, LADID, MobileNetwork, PostcodeSector, SectorID};
use crate::asset::MobileAsset;
use crate::id::{IDCollection, define_id_getter};
use crate::lookup::Environment;
use crate::units::Area;
use serde::Deserialize;

const LADS_FILE_NAME: &str = "lads.csv";
const SECTORS_FILE_NAME: &str = "postcode_sectors.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct PostcodeSectorRaw {
    id: SectorID,
    lad_id: String,
    name: String,
    area_km2: f64,
}
define_id_getter! {PostcodeSectorRaw, SectorID}

/// Read the LADs and their postcode sectors, attaching the given assets to their sectors.
///
/// Sectors start with no population; it is filled in from the population scenario each year.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `assets` - The initial assets, which must all belong to known sectors
pub fn read_mobile_network(model_dir: &Path, assets: Vec<MobileAsset>) -> Result<MobileNetwork> {
    let lads_path = model_dir.join(LADS_FILE_NAME);
    let mut lads: IndexMap<LADID, Lad> = read_csv_id_file(&lads_path)?;

    let sectors_path = model_dir.join(SECTORS_FILE_NAME);
    let sectors = read_csv_id_file(&sectors_path)?;
    let mut sectors = read_sectors_from_map(sectors, &lads)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&sectors_path))?;

    attach_assets(&mut sectors, assets)?;

    for sector in sectors.into_values() {
        // The LAD ID was validated above
        if let Some(lad) = lads.get_mut(&sector.lad_id) {
            lad.sectors.insert(sector.id.clone(), sector);
        }
    }

    Ok(MobileNetwork::new(lads))
}

fn read_sectors_from_map(
    raw: IndexMap<SectorID, PostcodeSectorRaw>,
    lads: &IndexMap<LADID, Lad>,
) -> Result<IndexMap<SectorID, PostcodeSector>> {
    raw.into_iter()
        .map(|(id, sector)| -> Result<_> {
            let lad_id = lads.get_id(&sector.lad_id)?;
            ensure!(
                sector.area_km2.is_finite() && sector.area_km2 > 0.0,
                "Area of sector {id} must be a finite number greater than zero"
            );

            let sector = PostcodeSector {
                id: id.clone(),
                lad_id,
                name: sector.name,
                area: Area(sector.area_km2),
                population: 0,
                user_throughput: 0.0,
                clutter_geotype: Environment::Rural,
                assets: Vec::new(),
            };
            Ok((id, sector))
        })
        .try_collect()
}

/// Move each asset into the sector it belongs to
fn attach_assets(
    sectors: &mut IndexMap<SectorID, PostcodeSector>,
    assets: Vec<MobileAsset>,
) -> Result<()> {
    for asset in assets {
        let sector = sectors
            .get_mut(&asset.pcd_sector)
            .with_context(|| {
                format!(
                    "Asset at site {} refers to unknown postcode sector {}",
                    asset.site_ngr, asset.pcd_sector
                )
            })
            .context(FailureKind::Schema)?;
        sector.assets.push(asset);
    }

    Ok(())
}
