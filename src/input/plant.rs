//! Code for reading the fixed access plant: exchanges, cabinets, distribution points and premises.
use super::*;
use crate::area::LADID;
use crate::demand::willingness::Demographics;
use crate::fixed::{
    AccessTechnologies, Cabinet, CabinetID, DistributionID, DistributionPoint, Exchange,
    ExchangeID, FixedNetwork, HouseholdID, Premise, PremiseID,
};
use crate::id::{IDCollection, define_id_getter};
use crate::units::Length;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;

const EXCHANGES_FILE_NAME: &str = "exchanges.csv";
const CABINETS_FILE_NAME: &str = "cabinets.csv";
const DISTRIBUTIONS_FILE_NAME: &str = "distributions.csv";
const PREMISES_FILE_NAME: &str = "premises.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct ExchangeRaw {
    id: ExchangeID,
    name: String,
    lad_id: LADID,
    geotype: String,
}
define_id_getter! {ExchangeRaw, ExchangeID}

#[derive(Debug, Deserialize, PartialEq)]
struct CabinetRaw {
    id: CabinetID,
    exchange_id: String,
    link_length: f64,
    #[serde(deserialize_with = "deserialise_flag")]
    fttp: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    gfast: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    fttc: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    docsis3: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    adsl: bool,
}
define_id_getter! {CabinetRaw, CabinetID}

#[derive(Debug, Deserialize, PartialEq)]
struct DistributionRaw {
    id: DistributionID,
    cabinet_id: String,
    link_length: f64,
    #[serde(deserialize_with = "deserialise_flag")]
    fttp: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    gfast: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    fttc: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    docsis3: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    adsl: bool,
}
define_id_getter! {DistributionRaw, DistributionID}

#[derive(Debug, Deserialize, PartialEq)]
struct PremiseRaw {
    id: PremiseID,
    distribution_id: String,
    link_length: f64,
    #[serde(deserialize_with = "deserialise_flag")]
    fttp: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    gfast: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    fttc: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    docsis3: bool,
    #[serde(deserialize_with = "deserialise_flag")]
    adsl: bool,
    occupants: u32,
    household_id: Option<HouseholdID>,
    age: Option<String>,
    gender: Option<String>,
    nation: Option<String>,
    ses: Option<String>,
    wta: Option<f64>,
}
define_id_getter! {PremiseRaw, PremiseID}

/// Collect the technology flag columns of a raw plant record
macro_rules! define_flags_getter {
    ($t:ty) => {
        impl $t {
            fn technologies(&self) -> AccessTechnologies {
                AccessTechnologies {
                    fttp: self.fttp,
                    gfast: self.gfast,
                    fttc: self.fttc,
                    docsis3: self.docsis3,
                    adsl: self.adsl,
                }
            }
        }
    };
}
define_flags_getter!(CabinetRaw);
define_flags_getter!(DistributionRaw);
define_flags_getter!(PremiseRaw);

/// Check that a link length is finite and non-negative
fn check_link_length(length: f64, id: &impl Display) -> Result<Length> {
    ensure!(
        length.is_finite() && length >= 0.0,
        "Link length of {id} must be a finite number greater than or equal to zero"
    );

    Ok(Length(length))
}

/// Find the parent of a plant node, or fail if it is unknown
fn get_parent<ID: IDLike, V>(
    parents: &IndexMap<ID, V>,
    parent_id: &str,
    child_id: &impl Display,
) -> Result<ID> {
    parents
        .get_id(parent_id)
        .with_context(|| format!("{child_id} refers to unknown parent {parent_id}"))
}

/// Read the fixed access plant from the model directory.
///
/// Every cabinet, distribution point and premise must refer to a known parent.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_fixed_network(model_dir: &Path) -> Result<FixedNetwork> {
    let exchanges_path = model_dir.join(EXCHANGES_FILE_NAME);
    let exchanges: IndexMap<ExchangeID, ExchangeRaw> = read_csv_id_file(&exchanges_path)?;
    let cabinets_path = model_dir.join(CABINETS_FILE_NAME);
    let cabinets: IndexMap<CabinetID, CabinetRaw> = read_csv_id_file(&cabinets_path)?;
    let distributions_path = model_dir.join(DISTRIBUTIONS_FILE_NAME);
    let distributions: IndexMap<DistributionID, DistributionRaw> =
        read_csv_id_file(&distributions_path)?;
    let premises_path = model_dir.join(PREMISES_FILE_NAME);
    let premises: IndexMap<PremiseID, PremiseRaw> = read_csv_id_file(&premises_path)?;

    let premises_by_dp = group_premises(premises, &distributions)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&premises_path))?;
    let dps_by_cabinet = group_distributions(distributions, &cabinets, premises_by_dp)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&distributions_path))?;
    let cabinets_by_exchange = group_cabinets(cabinets, &exchanges, dps_by_cabinet)
        .context(FailureKind::Schema)
        .with_context(|| input_err_msg(&cabinets_path))?;

    Ok(build_network(exchanges, cabinets_by_exchange))
}

fn group_premises(
    premises: IndexMap<PremiseID, PremiseRaw>,
    distributions: &IndexMap<DistributionID, DistributionRaw>,
) -> Result<HashMap<DistributionID, IndexMap<PremiseID, Premise>>> {
    let mut grouped: HashMap<DistributionID, IndexMap<PremiseID, Premise>> = HashMap::new();
    for (id, raw) in premises {
        let dp_id = get_parent(distributions, &raw.distribution_id, &id)?;
        let premise = Premise {
            link_length: check_link_length(raw.link_length, &id)?,
            technologies: raw.technologies(),
            occupants: raw.occupants,
            household_id: raw.household_id,
            demographics: Demographics {
                age: raw.age,
                gender: raw.gender,
                nation: raw.nation,
                ses: raw.ses,
            },
            wta: raw.wta,
            wtp: None,
            id: id.clone(),
        };
        grouped.entry(dp_id).or_default().insert(id, premise);
    }

    Ok(grouped)
}

fn group_distributions(
    distributions: IndexMap<DistributionID, DistributionRaw>,
    cabinets: &IndexMap<CabinetID, CabinetRaw>,
    mut premises_by_dp: HashMap<DistributionID, IndexMap<PremiseID, Premise>>,
) -> Result<HashMap<CabinetID, IndexMap<DistributionID, DistributionPoint>>> {
    let mut grouped: HashMap<CabinetID, IndexMap<DistributionID, DistributionPoint>> =
        HashMap::new();
    for (id, raw) in distributions {
        let cabinet_id = get_parent(cabinets, &raw.cabinet_id, &id)?;
        let dp = DistributionPoint {
            link_length: check_link_length(raw.link_length, &id)?,
            technologies: raw.technologies(),
            premises: premises_by_dp.remove(&id).unwrap_or_default(),
            id: id.clone(),
        };
        grouped.entry(cabinet_id).or_default().insert(id, dp);
    }

    Ok(grouped)
}

fn group_cabinets(
    cabinets: IndexMap<CabinetID, CabinetRaw>,
    exchanges: &IndexMap<ExchangeID, ExchangeRaw>,
    mut dps_by_cabinet: HashMap<CabinetID, IndexMap<DistributionID, DistributionPoint>>,
) -> Result<HashMap<ExchangeID, IndexMap<CabinetID, Cabinet>>> {
    let mut grouped: HashMap<ExchangeID, IndexMap<CabinetID, Cabinet>> = HashMap::new();
    for (id, raw) in cabinets {
        let exchange_id = get_parent(exchanges, &raw.exchange_id, &id)?;
        let cabinet = Cabinet {
            link_length: check_link_length(raw.link_length, &id)?,
            technologies: raw.technologies(),
            distributions: dps_by_cabinet.remove(&id).unwrap_or_default(),
            id: id.clone(),
        };
        grouped.entry(exchange_id).or_default().insert(id, cabinet);
    }

    Ok(grouped)
}

fn build_network(
    exchanges: IndexMap<ExchangeID, ExchangeRaw>,
    mut cabinets_by_exchange: HashMap<ExchangeID, IndexMap<CabinetID, Cabinet>>,
) -> FixedNetwork {
    let exchanges = exchanges
        .into_iter()
        .map(|(id, raw)| {
            let exchange = Exchange {
                cabinets: cabinets_by_exchange.remove(&id).unwrap_or_default(),
                id: id.clone(),
                name: raw.name,
                lad_id: raw.lad_id,
                geotype: raw.geotype,
            };
            (id, exchange)
        })
        .collect();

    FixedNetwork::new(exchanges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::AccessTechnology;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const FLAGS: &str = "fttp,gfast,fttc,docsis3,adsl";

    fn write_plant(dir: &Path, premises: &str) {
        let mut file = File::create(dir.join(EXCHANGES_FILE_NAME)).unwrap();
        writeln!(file, "id,name,lad_id,geotype\nex1,Cambridge,E07000008,>20k lines").unwrap();
        let mut file = File::create(dir.join(CABINETS_FILE_NAME)).unwrap();
        writeln!(file, "id,exchange_id,link_length,{FLAGS}\ncab1,ex1,1500,0,0,1,0,1").unwrap();
        let mut file = File::create(dir.join(DISTRIBUTIONS_FILE_NAME)).unwrap();
        writeln!(file, "id,cabinet_id,link_length,{FLAGS}\ndp1,cab1,200,0,0,0,0,1").unwrap();
        let mut file = File::create(dir.join(PREMISES_FILE_NAME)).unwrap();
        writeln!(
            file,
            "id,distribution_id,link_length,{FLAGS},occupants,household_id,age,gender,nation,\
             ses,wta\n{premises}"
        )
        .unwrap();
    }

    #[test]
    fn test_read_fixed_network() {
        let dir = tempdir().unwrap();
        write_plant(
            dir.path(),
            "p1,dp1,300,0,0,1,,1,2,h1,25-34,female,england,AB,10.5\n\
             p2,dp1,100,,,,,1,3,,,,,,",
        );
        let network = read_fixed_network(dir.path()).unwrap();

        let exchange = network.exchange(&"ex1".into()).unwrap();
        assert_eq!(exchange.geotype, ">20k lines");
        assert_eq!(exchange.premise_count(), 2);
        assert_eq!(exchange.occupants(), 5);

        let (dp, cabinet, _) = network.distribution(&"dp1".into()).unwrap();
        assert_eq!(cabinet.link_length, Length(1500.0));
        assert!(cabinet.technologies.fttc);
        let p1 = &dp.premises[&PremiseID::from("p1")];
        assert_eq!(p1.technologies.best(), AccessTechnology::Fttc);
        assert_eq!(p1.household_id, Some("h1".into()));
        assert_eq!(p1.demographics.ses.as_deref(), Some("AB"));
        assert_eq!(p1.wta, Some(10.5));
        let p2 = &dp.premises[&PremiseID::from("p2")];
        assert_eq!(p2.technologies.best(), AccessTechnology::Adsl);
        assert_eq!(p2.household_id, None);
        assert_eq!(p2.demographics, Demographics::default());
    }

    #[test]
    fn test_orphan_premise() {
        let dir = tempdir().unwrap();
        write_plant(dir.path(), "p1,dp9,300,0,0,1,0,1,2,,,,,,");
        let err = read_fixed_network(dir.path()).unwrap_err();
        assert_eq!(err.downcast_ref::<FailureKind>(), Some(&FailureKind::Schema));
        assert!(
            err.chain()
                .any(|cause| cause.to_string() == "p1 refers to unknown parent dp9")
        );
    }

    #[test]
    fn test_negative_link_length() {
        let dir = tempdir().unwrap();
        write_plant(dir.path(), "p1,dp1,-3,0,0,1,0,1,2,,,,,,");
        assert!(read_fixed_network(dir.path()).is_err());
    }
}
