//! The mobile intervention planner.
//!
//! Sectors are visited in descending population density. Each sector is improved towards a
//! target capacity by walking the admissible intervention kinds in a fixed priority order:
//! LTE upgrades, then 700 MHz carriers, then 3.5 GHz carriers, then small cells one at a time.
//! A first pass targets the service obligation (if any) and a second pass targets demand. The
//! year ends after the first asset which takes the budget below zero.
use super::Budget;
use crate::area::{LADID, MobileNetwork, PostcodeSector, SectorID};
use crate::asset::{MobileAsset, SiteID};
use crate::demand::sector_demand;
use crate::intervention::{Intervention, InterventionKind};
use crate::lookup::LookupTables;
use crate::model::MobileParameters;
use crate::strategy::MobileStrategy;
use crate::units::{Money, TrafficDensity};
use anyhow::Result;
use log::debug;

/// The mast interventions, in priority order
const MAST_INTERVENTIONS: [InterventionKind; 3] = [
    InterventionKind::UpgradeToLte,
    InterventionKind::Carrier700,
    InterventionKind::Carrier3500,
];

/// One line of the spend log
#[derive(Debug, Clone, PartialEq)]
pub struct MobileSpend {
    /// The sector the asset was built in
    pub pcd_sector: SectorID,
    /// The LAD containing the sector
    pub lad_id: LADID,
    /// The intervention the asset belongs to
    pub item: InterventionKind,
    /// Capital cost of the asset
    pub cost: Money,
}

/// The outcome of planning one year
#[derive(Debug, Clone, PartialEq)]
pub struct MobilePlan {
    /// Assets built, in build order
    pub built: Vec<MobileAsset>,
    /// Spend log, one entry per asset built
    pub spend: Vec<MobileSpend>,
    /// The budget after planning
    pub budget: Budget,
}

/// Whether to stop walking after an action
enum Walk {
    Continue,
    Stop,
}

/// Plans the interventions built in each year
pub struct MobilePlanner<'a> {
    /// Lookup tables for evaluating capacity
    pub lookups: &'a LookupTables,
    /// Model parameters
    pub parameters: &'a MobileParameters,
    /// The strategy deciding which interventions are admissible
    pub strategy: MobileStrategy,
    /// Capacity floor targeted by the first pass (zero disables it)
    pub service_obligation: TrafficDensity,
}

impl MobilePlanner<'_> {
    /// Plan and build the interventions for one year.
    ///
    /// Built assets are appended to their sectors as they are paid for, so every later decision
    /// sees the updated network.
    pub fn plan_year(
        &self,
        network: &mut MobileNetwork,
        year: u32,
        annual_budget: Money,
    ) -> Result<MobilePlan> {
        let mut plan = MobilePlan {
            built: Vec::new(),
            spend: Vec::new(),
            budget: Budget::new(annual_budget),
        };
        if self.strategy.admissible_kinds().is_empty() {
            return Ok(plan);
        }

        let order = network.sector_ids_by_density();
        if self.service_obligation > TrafficDensity(0.0) {
            debug!("Planning for service obligation of {}", self.service_obligation);
            for sector_id in &order {
                let Some(sector) = network.sector_mut(sector_id) else {
                    continue;
                };
                if let Walk::Stop =
                    self.improve_sector(sector, self.service_obligation, year, &mut plan)?
                {
                    return Ok(plan);
                }
            }
        }

        debug!("Planning to meet demand");
        for sector_id in &order {
            let Some(sector) = network.sector_mut(sector_id) else {
                continue;
            };
            let demand = sector_demand(sector, self.parameters);
            if let Walk::Stop = self.improve_sector(sector, demand, year, &mut plan)? {
                break;
            }
        }

        Ok(plan)
    }

    /// Whether the given kind may be built in `year`
    fn is_available(&self, kind: InterventionKind, year: u32) -> bool {
        self.strategy.admits(kind)
            && (kind.added_frequency().is_none() || year >= self.parameters.spectrum_release_year)
    }

    /// Build interventions in a sector until its capacity meets `target`.
    ///
    /// A mast intervention is applied to every eligible mast of the sector before capacity is
    /// compared with the target again. Small cells are added one at a time.
    fn improve_sector(
        &self,
        sector: &mut PostcodeSector,
        target: TrafficDensity,
        year: u32,
        plan: &mut MobilePlan,
    ) -> Result<Walk> {
        if sector.population == 0 {
            return Ok(Walk::Continue);
        }

        for kind in MAST_INTERVENTIONS {
            if !self.is_available(kind, year) {
                continue;
            }

            if sector.capacity(self.lookups)? >= target {
                return Ok(Walk::Continue);
            }

            let masts: Vec<SiteID> = sector.masts().into_keys().cloned().collect();
            for site_ngr in masts {
                if !kind.applies_to_mast(sector, &site_ngr) {
                    continue;
                }

                let intervention =
                    Intervention::new(kind, &sector.id, &site_ngr, year, self.parameters);
                if let Walk::Stop = build(sector, intervention, plan) {
                    return Ok(Walk::Stop);
                }
            }
        }

        if self.is_available(InterventionKind::SmallCell, year) {
            while sector.capacity(self.lookups)? < target
                && sector.small_cell_would_add_capacity(self.lookups)?
            {
                let intervention = Intervention::small_cell(&sector.id, year, self.parameters);
                if let Walk::Stop = build(sector, intervention, plan) {
                    return Ok(Walk::Stop);
                }
            }
        }

        Ok(Walk::Continue)
    }
}

/// Pay for and append each asset of an intervention in turn.
///
/// An asset is built even if it takes the budget below zero, but nothing is built after it. The
/// assets of the intervention built so far are kept.
fn build(sector: &mut PostcodeSector, intervention: Intervention, plan: &mut MobilePlan) -> Walk {
    for asset in intervention.assets {
        if plan.budget.is_exhausted() {
            return Walk::Stop;
        }

        let within_budget = plan.budget.commit(asset.capex);
        plan.spend.push(MobileSpend {
            pcd_sector: sector.id.clone(),
            lad_id: sector.lad_id.clone(),
            item: intervention.kind,
            cost: asset.capex,
        });
        plan.built.push(asset.clone());
        sector.assets.push(asset);
        if !within_budget {
            return Walk::Stop;
        }
    }

    Walk::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Frequency, Technology};
    use crate::fixture::{lookup_tables, mobile_asset, mobile_network, mobile_parameters, sector};
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;

    fn planner<'a>(
        lookups: &'a LookupTables,
        parameters: &'a MobileParameters,
        strategy: MobileStrategy,
        service_obligation: f64,
    ) -> MobilePlanner<'a> {
        MobilePlanner {
            lookups,
            parameters,
            strategy,
            service_obligation: TrafficDensity(service_obligation),
        }
    }

    /// A sector with a single legacy mast
    fn legacy_sector(mut sector: PostcodeSector, id: &str, population: u64) -> PostcodeSector {
        sector.id = id.into();
        sector.population = population;
        sector.user_throughput = 50.0;
        sector.assets = vec![mobile_asset(&sector.id, "mast1", Technology::Umts, 2100, 10)];
        sector
    }

    #[rstest]
    fn test_priority_order(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut network = mobile_network(vec![legacy_sector(sector, "CB1 1", 50_000)]);
        let planner = planner(
            &lookup_tables,
            &mobile_parameters,
            MobileStrategy::SmallCellAndSpectrum,
            0.0,
        );
        let plan = planner.plan_year(&mut network, 2020, Money(6e8)).unwrap();

        // Small cells are added until the small-cell curve clamps at 4 sites/km² (8 cells)
        let items = plan.spend.iter().map(|spend| spend.item).collect_vec();
        let mut expected = vec![
            InterventionKind::UpgradeToLte,
            InterventionKind::UpgradeToLte,
            InterventionKind::Carrier700,
            InterventionKind::Carrier3500,
        ];
        expected.extend([InterventionKind::SmallCell; 8]);
        assert_eq!(items, expected);
        assert_eq!(plan.built.len(), 12);

        let sector = network.sector(&"CB1 1".into()).unwrap();
        assert_eq!(sector.small_cell_count(), 8);
        assert_eq!(sector.assets.len(), 13);

        let spent: Money = plan.spend.iter().map(|spend| spend.cost).sum();
        assert_approx_eq!(Money, spent, Money(142_446.0 + 2.0 * 50_917.0 + 8.0 * 40_220.0));
        assert_approx_eq!(Money, spent + plan.budget.remaining(), Money(6e8));
    }

    #[rstest]
    fn test_spectrum_not_released(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut network = mobile_network(vec![legacy_sector(sector, "CB1 1", 50_000)]);
        let planner = planner(&lookup_tables, &mobile_parameters, MobileStrategy::Macrocell, 0.0);
        let plan = planner.plan_year(&mut network, 2019, Money(6e8)).unwrap();
        assert!(
            plan.spend
                .iter()
                .all(|spend| spend.item == InterventionKind::UpgradeToLte)
        );
        assert_eq!(plan.built.len(), 2);
    }

    #[rstest]
    fn test_partial_bundle_kept(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut network = mobile_network(vec![legacy_sector(sector, "CB1 1", 50_000)]);
        let planner = planner(&lookup_tables, &mobile_parameters, MobileStrategy::Macrocell, 0.0);
        let plan = planner
            .plan_year(&mut network, 2020, Money(100_000.0))
            .unwrap();

        // The second LTE carrier overruns the budget but is still built, and nothing follows it
        assert_eq!(plan.built.len(), 2);
        assert!(plan.budget.is_exhausted());
        assert_approx_eq!(Money, plan.budget.remaining(), Money(100_000.0 - 142_446.0));
        let sector = network.sector(&"CB1 1".into()).unwrap();
        assert_eq!(sector.assets.len(), 3);
    }

    #[rstest]
    fn test_overrun_stops_the_year(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut network = mobile_network(vec![
            legacy_sector(sector.clone(), "A", 40_000),
            legacy_sector(sector, "B", 50_000),
        ]);
        let planner = planner(&lookup_tables, &mobile_parameters, MobileStrategy::Macrocell, 0.0);
        let plan = planner
            .plan_year(&mut network, 2020, Money(150_000.0))
            .unwrap();

        // The 700 MHz carrier on B overruns; A, next in line, gets nothing
        let items = plan.spend.iter().map(|spend| spend.item).collect_vec();
        assert_eq!(
            items,
            [
                InterventionKind::UpgradeToLte,
                InterventionKind::UpgradeToLte,
                InterventionKind::Carrier700
            ]
        );
        assert!(plan.spend.iter().all(|spend| spend.pcd_sector == "B".into()));
        assert_approx_eq!(
            Money,
            plan.budget.remaining(),
            Money(150_000.0 - 142_446.0 - 50_917.0)
        );
        assert_eq!(network.sector(&"A".into()).unwrap().assets.len(), 1);
    }

    #[rstest]
    fn test_upgrade_applies_to_every_mast(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut sector = legacy_sector(sector, "CB1 1", 10);
        sector
            .assets
            .push(mobile_asset(&sector.id, "mast2", Technology::Umts, 2100, 10));
        let mut network = mobile_network(vec![sector]);
        let planner = planner(&lookup_tables, &mobile_parameters, MobileStrategy::Macrocell, 0.0);
        let plan = planner.plan_year(&mut network, 2019, Money(6e8)).unwrap();

        // One upgrade already meets the tiny demand, yet both masts are upgraded
        assert_eq!(plan.built.len(), 4);
        let sector = network.sector(&"CB1 1".into()).unwrap();
        for site_ngr in ["mast1", "mast2"] {
            let site_ngr: SiteID = site_ngr.into();
            assert!(sector.is_lte_mast(&site_ngr));
            assert!(sector.mast_has_frequency(&site_ngr, Frequency(800)));
            assert!(sector.mast_has_frequency(&site_ngr, Frequency(2600)));
        }
    }

    #[rstest]
    fn test_densest_sector_first(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut network = mobile_network(vec![
            legacy_sector(sector.clone(), "A", 1000),
            legacy_sector(sector, "B", 50_000),
        ]);
        let planner = planner(&lookup_tables, &mobile_parameters, MobileStrategy::Macrocell, 0.0);
        let plan = planner
            .plan_year(&mut network, 2020, Money(142_446.0))
            .unwrap();

        // The budget is used up exactly by B's upgrade, so B's 700 MHz carrier still goes ahead
        assert!(plan.spend.iter().all(|spend| spend.pcd_sector == "B".into()));
        assert_eq!(plan.built.len(), 3);
        assert_eq!(plan.budget.remaining(), Money(-50_917.0));
    }

    #[rstest]
    fn test_zero_population_skipped(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut network = mobile_network(vec![legacy_sector(sector, "CB1 1", 0)]);
        let planner = planner(
            &lookup_tables,
            &mobile_parameters,
            MobileStrategy::SmallCellAndSpectrum,
            10.0,
        );
        let plan = planner.plan_year(&mut network, 2020, Money(6e8)).unwrap();
        assert!(plan.built.is_empty());
    }

    #[rstest]
    #[case(0.0, 2)]
    #[case(5.0, 3)]
    fn test_service_obligation_pass(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
        #[case] obligation: f64,
        #[case] expected_assets: usize,
    ) {
        // Demand is tiny, so only the obligation pass builds beyond the LTE upgrade:
        // 800 + 2600 give 1.5 + 10/3 < 5, and 700 adds another 1.5
        let mut network = mobile_network(vec![legacy_sector(sector, "CB1 1", 10)]);
        let planner = planner(
            &lookup_tables,
            &mobile_parameters,
            MobileStrategy::Macrocell,
            obligation,
        );
        let plan = planner.plan_year(&mut network, 2020, Money(6e8)).unwrap();
        assert_eq!(plan.built.len(), expected_assets);
    }

    #[rstest]
    fn test_minimal_builds_nothing(
        lookup_tables: LookupTables,
        mobile_parameters: MobileParameters,
        sector: PostcodeSector,
    ) {
        let mut network = mobile_network(vec![legacy_sector(sector, "CB1 1", 50_000)]);
        let planner = planner(&lookup_tables, &mobile_parameters, MobileStrategy::Minimal, 5.0);
        let plan = planner.plan_year(&mut network, 2020, Money(6e8)).unwrap();
        assert!(plan.built.is_empty());
        assert_eq!(plan.budget.remaining(), Money(6e8));
    }
}
