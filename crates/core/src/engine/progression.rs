//! Next-hull recommendation across ship tiers.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::{
    catalog::SdeSnapshot,
    error::EngineResult,
    models::{ProgressionSuggestion, Ship, ShipTier, SkillRequirement, TrainedSkills},
};

use super::{
    gap::{compute_plan, remaining_levels},
    resolver::resolve_ship,
};

/// Pick the cheapest hull in the lowest tier above what the character flies.
///
/// Candidates are ships outside `eligible` whose tier is strictly above the
/// highest eligible tier (any tier when nothing eligible classifies). Within
/// the lowest candidate tier the hull with the fewest remaining skill levels
/// wins, ties going to the lowest ship id. Unclassified hulls are ignored.
pub fn next_ship(
    catalog: &SdeSnapshot,
    trained: &TrainedSkills,
    eligible: &[Ship],
    all_ships: &[Ship],
) -> EngineResult<Option<ProgressionSuggestion>> {
    let eligible_ids: HashSet<i64> = eligible.iter().map(|ship| ship.ship_id).collect();
    let current_tier = eligible
        .iter()
        .filter_map(|ship| catalog.classify(ship))
        .max();

    let mut tiers: BTreeMap<ShipTier, BTreeMap<i64, &Ship>> = BTreeMap::new();
    for ship in all_ships {
        if eligible_ids.contains(&ship.ship_id) {
            continue;
        }
        let Some(tier) = catalog.classify(ship) else {
            continue;
        };
        if current_tier.map_or(true, |current| tier > current) {
            tiers.entry(tier).or_default().entry(ship.ship_id).or_insert(ship);
        }
    }

    let Some((tier, candidates)) = tiers.into_iter().next() else {
        debug!(?current_tier, "no progression candidates above current tier");
        return Ok(None);
    };

    let mut best: Option<(u32, i64, ProgressionSuggestion)> = None;
    for (ship_id, ship) in candidates {
        let requirements = resolve_ship(catalog, ship_id)?;
        let plan = compute_plan(&requirements, trained);
        let cost = remaining_levels(&plan);
        debug!(ship = %ship.ship_name, %tier, cost, "ranked progression candidate");

        let better = match &best {
            Some((best_cost, best_id, _)) => (cost, ship_id) < (*best_cost, *best_id),
            None => true,
        };
        if better {
            let suggestion = ProgressionSuggestion {
                tier,
                ship: ship.clone(),
                required_skills: plan
                    .iter()
                    .map(|entry| SkillRequirement {
                        skill_id: entry.skill_id,
                        skill_name: entry.skill_name.clone(),
                        required_level: entry.required_level,
                    })
                    .collect(),
                remaining_levels: cost,
            };
            best = Some((cost, ship_id, suggestion));
        }
    }

    Ok(best.map(|(_, _, suggestion)| suggestion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::fixtures::{self, CatalogBuilder},
        error::EngineError,
    };

    fn ships(catalog: &SdeSnapshot) -> Vec<Ship> {
        catalog.ships().map(|ship| ship.to_ship()).collect()
    }

    #[test]
    fn nothing_left_when_everything_is_eligible() {
        let catalog = fixtures::sample_catalog();
        let all = ships(&catalog);
        let result = next_ship(&catalog, &TrainedSkills::default(), &all, &all).expect("ranks");
        assert_eq!(result, None);
    }

    #[test]
    fn suggests_next_tier_above_current() {
        let catalog = fixtures::sample_catalog();
        let all = ships(&catalog);
        let eligible = vec![fixtures::ship(&catalog, fixtures::RIFTER)];
        let trained = TrainedSkills::from_skills(&fixtures::trained(&[
            (fixtures::SPACESHIP_COMMAND, 3),
            (fixtures::MINMATAR_FRIGATE, 2),
        ]))
        .expect("valid skills");

        let suggestion = next_ship(&catalog, &trained, &eligible, &all)
            .expect("ranks")
            .expect("a destroyer should be suggested");
        assert_eq!(suggestion.tier, ShipTier::Destroyer);
        assert_eq!(suggestion.ship.ship_id, fixtures::THRASHER);
        // Minmatar Frigate 2 -> 3 and Minmatar Destroyer 0 -> 1.
        assert_eq!(suggestion.remaining_levels, 2);
        assert_eq!(
            suggestion
                .required_skills
                .iter()
                .map(|r| (r.skill_id, r.required_level))
                .collect::<Vec<_>>(),
            vec![
                (fixtures::SPACESHIP_COMMAND, 1),
                (fixtures::MINMATAR_DESTROYER, 1),
                (fixtures::MINMATAR_FRIGATE, 3),
            ]
        );
    }

    #[test]
    fn starts_at_lowest_tier_without_eligible_ships() {
        let catalog = fixtures::sample_catalog();
        let all = ships(&catalog);
        let suggestion = next_ship(&catalog, &TrainedSkills::default(), &[], &all)
            .expect("ranks")
            .expect("a frigate should be suggested");
        assert_eq!(suggestion.tier, ShipTier::Frigate);
        // Slasher and Rifter cost the same; the lower id wins.
        assert_eq!(suggestion.ship.ship_id, fixtures::SLASHER);
    }

    #[test]
    fn ranks_by_total_levels_not_skill_count() {
        let catalog = CatalogBuilder::new("v1")
            .skill(1, "Frigate Basics", 1, &[])
            .skill(2, "Heavy Hulls", 1, &[])
            .skill(3, "Light Hulls", 1, &[])
            .skill(4, "Light Weapons", 1, &[])
            .ship(100, "Starter Frigate", Some("Frigate"), &[(1, 1)])
            .ship(200, "Brick Cruiser", Some("Cruiser"), &[(2, 5)])
            .ship(300, "Nimble Cruiser", Some("Cruiser"), &[(3, 1), (4, 1)])
            .build();
        let all = ships(&catalog);
        let eligible = vec![fixtures::ship(&catalog, 100)];
        let trained = TrainedSkills::from_skills(&fixtures::trained(&[(1, 1), (2, 1)]))
            .expect("valid skills");

        let suggestion = next_ship(&catalog, &trained, &eligible, &all)
            .expect("ranks")
            .expect("a cruiser should be suggested");
        assert_eq!(suggestion.ship.ship_id, 300);
        assert_eq!(suggestion.remaining_levels, 2);
    }

    #[test]
    fn top_tier_characters_get_nothing() {
        let catalog = CatalogBuilder::new("v1")
            .skill(1, "Battleship Skill", 1, &[])
            .ship(1, "Old Battleship", Some("Battleship"), &[(1, 1)])
            .ship(2, "New Battleship", Some("Battleship"), &[(1, 5)])
            .ship(3, "Small Frigate", Some("Frigate"), &[(1, 1)])
            .build();
        let all = ships(&catalog);
        let eligible = vec![fixtures::ship(&catalog, 1)];
        let result = next_ship(&catalog, &TrainedSkills::default(), &eligible, &all).expect("ranks");
        assert_eq!(result, None);
    }

    #[test]
    fn candidate_missing_from_catalog_aborts() {
        let catalog = fixtures::sample_catalog();
        let all = vec![Ship {
            ship_id: 999,
            ship_name: "Phantom Frigate".to_string(),
        }];
        let err = next_ship(&catalog, &TrainedSkills::default(), &[], &all).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { id: 999, .. }));
    }
}
