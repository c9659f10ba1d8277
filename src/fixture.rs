//! Fixtures for tests

use crate::area::{Lad, MobileNetwork, PostcodeSector, SectorID};
use crate::asset::{AssetType, Bandwidth, Frequency, MobileAsset, Technology};
use crate::demand::willingness::{Demographics, WtpScores};
use crate::fixed::bands::{Band, ExchangeBands};
use crate::fixed::{
    AccessTechnologies, AccessTechnology, Cabinet, DistributionPoint, Exchange, FixedNetwork,
    Premise,
};
use crate::lookup::{
    CapacityCurve, CapacityKey, CapacityLookup, CapacityPoint, Environment, GeotypeTable,
    GeotypeThreshold, LookupTables,
};
use crate::model::fixed::{CostParameters, SpeedParameters};
use crate::model::{FixedParameters, MobileParameters};
use crate::units::{Area, Length, Money, PopulationDensity, SiteDensity, Speed, TrafficDensity};
use indexmap::{IndexMap, indexmap};
use itertools::Itertools;
use map_macro::hash_map;
use rstest::fixture;
use std::collections::HashMap;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A capacity curve through the given (site density, capacity) breakpoints
fn curve(points: &[(f64, f64)]) -> CapacityCurve {
    CapacityCurve::new(
        points
            .iter()
            .map(|&(site_density, capacity)| CapacityPoint {
                site_density: SiteDensity(site_density),
                capacity: TrafficDensity(capacity),
                spectral_efficiency: capacity / 10.0,
            })
            .collect(),
    )
    .unwrap()
}

#[fixture]
pub fn lookup_tables() -> LookupTables {
    let macro_curves = [
        (800, 10, [(0.0, 1.0), (1.0, 2.0)]),
        (2600, 10, [(0.0, 3.0), (3.0, 5.0)]),
        (700, 10, [(0.0, 1.0), (1.0, 2.0)]),
        (3500, 40, [(0.0, 4.0), (1.0, 8.0)]),
    ];
    let mut curves = HashMap::new();
    for environment in [Environment::Urban, Environment::Suburban, Environment::Rural] {
        for (frequency, bandwidth, points) in &macro_curves {
            let key = CapacityKey {
                environment,
                frequency: Frequency(*frequency),
                bandwidth: Bandwidth(*bandwidth),
            };
            curves.insert(key, curve(points));
        }
    }
    curves.insert(
        CapacityKey {
            environment: Environment::SmallCells,
            frequency: Frequency(3700),
            bandwidth: Bandwidth(25),
        },
        curve(&[(1.0, 10.0), (4.0, 20.0), (8.0, 20.0)]),
    );

    let geotypes = [
        (0.0, Environment::Rural),
        (782.0, Environment::Suburban),
        (7959.0, Environment::Urban),
    ]
    .into_iter()
    .map(|(population_density, geotype)| GeotypeThreshold {
        population_density: PopulationDensity(population_density),
        geotype,
    })
    .collect();

    LookupTables {
        capacity: CapacityLookup::new(curves),
        geotypes: GeotypeTable::new(geotypes).unwrap(),
    }
}

#[fixture]
pub fn sector() -> PostcodeSector {
    PostcodeSector {
        id: "CB1 1".into(),
        lad_id: "E07000008".into(),
        name: "Cambridge central".into(),
        area: Area(2.0),
        population: 500,
        user_throughput: 10.0,
        clutter_geotype: Environment::Urban,
        assets: Vec::new(),
    }
}

#[fixture]
pub fn mobile_parameters() -> MobileParameters {
    toml::from_str("").unwrap()
}

/// A macrocell carrier on the given mast
pub fn mobile_asset(
    pcd_sector: &SectorID,
    site_ngr: &str,
    technology: Technology,
    frequency: u32,
    bandwidth: u32,
) -> MobileAsset {
    MobileAsset {
        pcd_sector: pcd_sector.clone(),
        site_ngr: site_ngr.into(),
        asset_type: AssetType::MacrocellSite,
        technology,
        frequency: Frequency(frequency),
        bandwidth: Bandwidth(bandwidth),
        build_date: None,
        network: None,
        capex: Money(0.0),
        opex: Money(0.0),
    }
}

/// A network with the given sectors grouped into LADs by their `lad_id`
pub fn mobile_network(sectors: Vec<PostcodeSector>) -> MobileNetwork {
    let mut lads: IndexMap<_, Lad> = IndexMap::new();
    for sector in sectors {
        let lad = lads.entry(sector.lad_id.clone()).or_insert_with(|| Lad {
            id: sector.lad_id.clone(),
            name: format!("LAD {}", sector.lad_id),
            sectors: IndexMap::new(),
        });
        lad.sectors.insert(sector.id.clone(), sector);
    }

    MobileNetwork::new(lads)
}

/// Demographics for which every category has a score in [`wtp_scores`]
fn scoring_demographics() -> Demographics {
    Demographics {
        age: Some("25-34".into()),
        gender: Some("female".into()),
        nation: Some("england".into()),
        ses: Some("AB".into()),
    }
}

fn flags(technologies: &[AccessTechnology]) -> AccessTechnologies {
    let mut flags = AccessTechnologies::default();
    for technology in technologies {
        flags.set(*technology);
    }
    flags
}

fn premise(
    id: &str,
    link_length: f64,
    technology: AccessTechnology,
    household_id: Option<&str>,
    demographics: Demographics,
    wta: Option<f64>,
    occupants: u32,
) -> Premise {
    Premise {
        id: id.into(),
        link_length: Length(link_length),
        technologies: flags(&[technology]),
        occupants,
        household_id: household_id.map(Into::into),
        demographics,
        wta,
        wtp: None,
    }
}

fn distribution(id: &str, link_length: f64, premises: Vec<Premise>) -> DistributionPoint {
    DistributionPoint {
        id: id.into(),
        link_length: Length(link_length),
        technologies: AccessTechnologies::default(),
        premises: premises
            .into_iter()
            .map(|premise| (premise.id.clone(), premise))
            .collect(),
    }
}

fn cabinet(id: &str, distributions: Vec<DistributionPoint>) -> Cabinet {
    Cabinet {
        id: id.into(),
        link_length: Length(1500.0),
        technologies: AccessTechnologies::default(),
        distributions: distributions
            .into_iter()
            .map(|dp| (dp.id.clone(), dp))
            .collect(),
    }
}

/// One exchange with two cabinets, each with one distribution point serving two premises.
///
/// p1 is on FTTC and p3 on FTTP; p2 and p4 have ADSL only. p3 has no socio-economic status so
/// cannot be scored and p4 belongs to no household.
#[fixture]
pub fn fixed_network() -> FixedNetwork {
    let ses_unknown = Demographics {
        ses: None,
        ..scoring_demographics()
    };
    let cab1 = cabinet(
        "cab1",
        vec![distribution(
            "dp1",
            200.0,
            vec![
                premise(
                    "p1",
                    300.0,
                    AccessTechnology::Fttc,
                    Some("h1"),
                    scoring_demographics(),
                    Some(10.0),
                    2,
                ),
                premise(
                    "p2",
                    100.0,
                    AccessTechnology::Adsl,
                    Some("h1"),
                    scoring_demographics(),
                    Some(20.0),
                    3,
                ),
            ],
        )],
    );
    let cab2 = cabinet(
        "cab2",
        vec![distribution(
            "dp2",
            500.0,
            vec![
                premise(
                    "p3",
                    100.0,
                    AccessTechnology::Fttp,
                    Some("h2"),
                    ses_unknown,
                    None,
                    1,
                ),
                premise(
                    "p4",
                    2000.0,
                    AccessTechnology::Adsl,
                    None,
                    scoring_demographics(),
                    None,
                    3,
                ),
            ],
        )],
    );

    let exchange = Exchange {
        id: "ex1".into(),
        name: "Cambridge".into(),
        lad_id: "E07000008".into(),
        geotype: ">20k lines".into(),
        cabinets: [cab1, cab2]
            .into_iter()
            .map(|cabinet| (cabinet.id.clone(), cabinet))
            .collect(),
    };

    FixedNetwork::new(indexmap! {exchange.id.clone() => exchange})
}

#[fixture]
pub fn wtp_scores() -> WtpScores {
    WtpScores {
        age: hash_map! {"25-34".into() => 4},
        gender: hash_map! {"female".into() => 1, "male".into() => 1},
        nation: hash_map! {"england".into() => 2},
        ses: hash_map! {"AB".into() => 3},
    }
}

#[fixture]
pub fn speed_parameters() -> SpeedParameters {
    SpeedParameters::default()
}

#[fixture]
pub fn cost_parameters() -> CostParameters {
    CostParameters::default()
}

#[fixture]
pub fn fixed_parameters() -> FixedParameters {
    toml::from_str("").unwrap()
}

#[fixture]
pub fn exchange_bands() -> ExchangeBands {
    let bands = [100, 200, 300]
        .into_iter()
        .map(|premises| Band {
            premises,
            speed: Speed(50.0),
            technology: AccessTechnology::Adsl,
        })
        .collect_vec();

    ExchangeBands {
        code: "EACAM".into(),
        geotype: ">20k lines".into(),
        oslaua: "E07000008".into(),
        oscty: "E10000003".into(),
        gor: "E12000006".into(),
        bands: [bands[0], bands[1], bands[2]],
    }
}
