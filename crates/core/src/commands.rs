//! Caller-facing command boundary.
//!
//! Each command is request-scoped: it takes the snapshot that is current when
//! it starts, runs the pure engine against it, and reports failures as a
//! message string for display.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, info, warn};

use crate::{
    catalog::{CatalogStore, SdeSnapshot},
    config::AppConfig,
    engine::{self, TrainingEstimate},
    eula::EulaStore,
    export::export_evemon,
    models::{
        FitValidation, FitVariant, PlanRow, ProgressionRow, Ship, Skill, SkillPlanEntry,
    },
    sde::SdeSync,
};

/// Message returned by computation commands until the EULA is accepted.
pub const EULA_REQUIRED: &str = "EULA has not been accepted";

/// Entry point for every front-end operation.
pub struct SkillPlanner {
    store: CatalogStore,
    eula: EulaStore,
    sync: Option<SdeSync>,
    skill_points_per_minute: f64,
    auto_updated: AtomicBool,
}

impl SkillPlanner {
    /// Planner over `store` without a refresh source.
    pub fn new(store: CatalogStore, eula: EulaStore) -> Self {
        Self {
            store,
            eula,
            sync: None,
            skill_points_per_minute: AppConfig::default().skill_points_per_minute,
            auto_updated: AtomicBool::new(false),
        }
    }

    /// Attach the collaborator used by [`SkillPlanner::refresh_sde`].
    pub fn with_sync(mut self, sync: SdeSync) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Override the skill points gained per minute.
    pub fn with_training_rate(mut self, skill_points_per_minute: f64) -> Self {
        self.skill_points_per_minute = skill_points_per_minute;
        self
    }

    /// Wire the planner, its stores and the refresh collaborator from config.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = CatalogStore::new();
        let sync = SdeSync::new(config.clone(), store.clone());
        Self::new(store, EulaStore::new(&config.data_dir))
            .with_sync(sync)
            .with_training_rate(config.skill_points_per_minute)
    }

    /// Shared snapshot holder.
    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Refresh collaborator, when configured.
    pub fn sync(&self) -> Option<&SdeSync> {
        self.sync.as_ref()
    }

    /// Version of the active snapshot.
    pub fn snapshot_version(&self) -> Option<String> {
        self.store.version()
    }

    fn ensure_eula(&self) -> Result<(), String> {
        match self.eula.accepted() {
            Ok(true) => Ok(()),
            Ok(false) => Err(EULA_REQUIRED.to_string()),
            Err(err) => Err(format!("{err:#}")),
        }
    }

    fn snapshot(&self) -> Result<Arc<SdeSnapshot>, String> {
        self.ensure_eula()?;
        self.store.current().map_err(|err| err.to_string())
    }

    /// Ordered plan rows `(skill_id, skill_name, required_level, current_level)`.
    pub fn get_skill_plan_for_fit(
        &self,
        fit: &FitVariant,
        user_skills: &[Skill],
    ) -> Result<Vec<PlanRow>, String> {
        let catalog = self.snapshot()?;
        info!(fit = %fit.fit_name, "computing skill plan");
        let plan = engine::plan_for_fit(&catalog, fit, user_skills).map_err(|err| err.to_string())?;
        debug!(
            entries = plan.len(),
            missing = plan.iter().filter(|entry| !entry.is_complete()).count(),
            "skill plan ready"
        );
        Ok(plan.iter().map(SkillPlanEntry::to_row).collect())
    }

    /// Next-tier suggestion as `(tier, ship, required_skills)`.
    pub fn get_next_ship_progression(
        &self,
        user_skills: &[Skill],
        eligible_ships: &[Ship],
        all_ships: &[Ship],
    ) -> Result<Option<ProgressionRow>, String> {
        let catalog = self.snapshot()?;
        let suggestion =
            engine::next_ship_progression(&catalog, user_skills, eligible_ships, all_ships)
                .map_err(|err| err.to_string())?;
        match &suggestion {
            Some(suggestion) => info!(
                tier = %suggestion.tier,
                ship = %suggestion.ship.ship_name,
                remaining = suggestion.remaining_levels,
                "suggested next ship"
            ),
            None => info!("no further ship progression"),
        }
        Ok(suggestion.map(|suggestion| suggestion.to_row()))
    }

    /// EVEMon text for plan rows, kept in the order given.
    pub fn export_skill_plan_evemon(&self, plan: &[PlanRow]) -> Result<String, String> {
        self.ensure_eula()?;
        let entries = rows_to_entries(plan)?;
        info!(skills = entries.len(), "exporting skill plan");
        export_evemon(&entries).map_err(|err| err.to_string())
    }

    /// Remaining skill points and durations for plan rows.
    pub fn estimate_training_times(&self, plan: &[PlanRow]) -> Result<TrainingEstimate, String> {
        let catalog = self.snapshot()?;
        let entries = rows_to_entries(plan)?;
        engine::estimate(&entries, &catalog, self.skill_points_per_minute)
            .map_err(|err| err.to_string())
    }

    /// Formatted remaining time per skill id, e.g. `(3300, "9m")`.
    pub fn get_training_times(&self, plan: &[PlanRow]) -> Result<Vec<(i64, String)>, String> {
        Ok(self.estimate_training_times(plan)?.formatted_times())
    }

    /// Skill-side validation of a fit.
    pub fn validate_fit(
        &self,
        fit: &FitVariant,
        user_skills: &[Skill],
    ) -> Result<FitValidation, String> {
        let catalog = self.snapshot()?;
        engine::validate_fit(&catalog, fit, user_skills).map_err(|err| err.to_string())
    }

    /// Ships the character can fly today.
    pub fn get_eligible_ships(&self, user_skills: &[Skill]) -> Result<Vec<Ship>, String> {
        let catalog = self.snapshot()?;
        engine::eligible_ships(&catalog, user_skills).map_err(|err| err.to_string())
    }

    /// Every ship in the active snapshot.
    pub fn all_ships(&self) -> Result<Vec<Ship>, String> {
        let catalog = self.snapshot()?;
        Ok(catalog.ships().map(|ship| ship.to_ship()).collect())
    }

    /// Fetch the configured source; `Ok(true)` when a new snapshot was activated.
    pub async fn refresh_sde(&self) -> Result<bool, String> {
        let sync = self
            .sync
            .as_ref()
            .ok_or_else(|| "SDE refresh is not configured".to_string())?;
        sync.refresh().await.map_err(|err| {
            warn!("SDE refresh failed: {err:#}");
            format!("{err:#}")
        })
    }

    /// Whether a refresh was started automatically at startup.
    pub fn sde_auto_update_occurred(&self) -> bool {
        self.auto_updated.load(Ordering::SeqCst)
    }

    /// Record that startup triggered an automatic refresh.
    pub fn mark_auto_update(&self) {
        self.auto_updated.store(true, Ordering::SeqCst);
    }

    /// Whether the EULA was accepted. An unreadable record counts as not accepted.
    pub fn get_eula_accepted(&self) -> bool {
        self.eula.accepted().unwrap_or_else(|err| {
            warn!("failed to read EULA state: {err:#}");
            false
        })
    }

    /// Persist the EULA decision.
    pub fn set_eula_accepted(&self, accepted: bool) -> Result<(), String> {
        self.eula
            .set_accepted(accepted)
            .map_err(|err| format!("{err:#}"))
    }
}

fn rows_to_entries(plan: &[PlanRow]) -> Result<Vec<SkillPlanEntry>, String> {
    plan.iter()
        .cloned()
        .map(SkillPlanEntry::from_row)
        .collect::<Result<_, _>>()
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use tempfile::{tempdir, TempDir};

    fn planner(accepted: bool) -> (TempDir, SkillPlanner) {
        let dir = tempdir().expect("tempdir");
        let eula = EulaStore::new(dir.path());
        eula.set_accepted(accepted).expect("eula");
        let planner = SkillPlanner::new(
            CatalogStore::with_snapshot(fixtures::sample_catalog()),
            eula,
        );
        (dir, planner)
    }

    #[test]
    fn plan_rows_use_wire_shape() {
        let (_dir, planner) = planner(true);
        let fit = fixtures::fit(&fixtures::sample_catalog(), fixtures::RIFTER, &[]);
        let skills = fixtures::trained(&[(fixtures::SPACESHIP_COMMAND, 3)]);

        let rows = planner.get_skill_plan_for_fit(&fit, &skills).expect("plan");
        assert_eq!(
            rows,
            vec![
                (fixtures::SPACESHIP_COMMAND, "Spaceship Command".to_string(), 1, 3),
                (fixtures::MINMATAR_FRIGATE, "Minmatar Frigate".to_string(), 1, 0),
            ]
        );

        let export = planner.export_skill_plan_evemon(&rows).expect("export");
        assert_eq!(export, "Spaceship Command Level 1\nMinmatar Frigate Level 1");
    }

    #[test]
    fn computation_waits_for_eula() {
        let (_dir, planner) = planner(false);
        assert!(!planner.get_eula_accepted());

        let fit = fixtures::fit(&fixtures::sample_catalog(), fixtures::RIFTER, &[]);
        assert_eq!(
            planner.get_skill_plan_for_fit(&fit, &[]).unwrap_err(),
            EULA_REQUIRED
        );
        assert_eq!(planner.export_skill_plan_evemon(&[]).unwrap_err(), EULA_REQUIRED);

        planner.set_eula_accepted(true).expect("accept");
        assert!(planner.get_eula_accepted());
        assert!(planner.get_skill_plan_for_fit(&fit, &[]).is_ok());
    }

    #[test]
    fn empty_store_refuses_computation() {
        let dir = tempdir().expect("tempdir");
        let eula = EulaStore::new(dir.path());
        eula.set_accepted(true).expect("eula");
        let planner = SkillPlanner::new(CatalogStore::new(), eula);

        let fit = fixtures::fit(&fixtures::sample_catalog(), fixtures::RIFTER, &[]);
        let err = planner.get_skill_plan_for_fit(&fit, &[]).unwrap_err();
        assert!(err.contains("no SDE snapshot is loaded"));
        assert!(planner.all_ships().is_err());
    }

    #[test]
    fn progression_row_names_tier() {
        let (_dir, planner) = planner(true);
        let catalog = fixtures::sample_catalog();
        let skills = fixtures::trained(&[
            (fixtures::SPACESHIP_COMMAND, 1),
            (fixtures::MINMATAR_FRIGATE, 1),
        ]);
        let eligible = planner.get_eligible_ships(&skills).expect("eligible");
        let all = planner.all_ships().expect("all ships");
        assert_eq!(all.len(), 4);

        let (tier, ship, required) = planner
            .get_next_ship_progression(&skills, &eligible, &all)
            .expect("progression")
            .expect("suggestion");
        assert_eq!(tier, "Destroyer");
        assert_eq!(ship, fixtures::ship(&catalog, fixtures::THRASHER));
        assert!(required
            .iter()
            .any(|(id, _, level)| *id == fixtures::MINMATAR_DESTROYER && *level == 1));
    }

    #[test]
    fn export_rejects_out_of_range_rows() {
        let (_dir, planner) = planner(true);
        let err = planner
            .export_skill_plan_evemon(&[(1, "Gunnery".to_string(), 6, 0)])
            .unwrap_err();
        assert!(err.starts_with("invalid input"));
    }

    #[test]
    fn training_estimate_covers_missing_levels() {
        let (_dir, planner) = planner(true);
        let rows = vec![(fixtures::GUNNERY, "Gunnery".to_string(), 1, 0)];
        let estimate = planner.estimate_training_times(&rows).expect("estimate");
        assert_eq!(estimate.total_skill_points, 250);

        let times = planner.get_training_times(&rows).expect("times");
        assert_eq!(times, vec![(fixtures::GUNNERY, "9m".to_string())]);
    }

    #[test]
    fn auto_update_flag_is_sticky() {
        let (_dir, planner) = planner(true);
        assert!(!planner.sde_auto_update_occurred());
        planner.mark_auto_update();
        assert!(planner.sde_auto_update_occurred());
    }

    #[tokio::test]
    async fn refresh_without_source_reports_error() {
        let (_dir, planner) = planner(true);
        assert!(planner.refresh_sde().await.is_err());
    }
}
