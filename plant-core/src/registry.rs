//! Plant profiles, read-mostly.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::model::PlantProfile;
use crate::validate::ProfileUpdate;

/// Profiles in registration order.
///
/// Readers take a shared lock; the write path (registration, edits,
/// watering) is guarded independently of the reading store and alert log.
#[derive(Debug, Default)]
pub struct PlantRegistry {
    profiles: RwLock<Vec<PlantProfile>>,
}

impl PlantRegistry {
    pub fn new(profiles: impl IntoIterator<Item = PlantProfile>) -> Self {
        let registry = Self::default();
        for p in profiles {
            registry.register(p);
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<PlantProfile>> {
        self.profiles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<PlantProfile>> {
        self.profiles.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, plant_id: &str) -> Option<PlantProfile> {
        self.read().iter().find(|p| p.id == plant_id).cloned()
    }

    pub fn all(&self) -> Vec<PlantProfile> {
        self.read().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Insert `profile`, replacing in place any profile with the same id.
    pub fn register(&self, profile: PlantProfile) {
        let mut profiles = self.write();
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
    }

    /// Apply the fields present in `update`. The update is assumed validated.
    pub fn update(&self, plant_id: &str, update: &ProfileUpdate) -> Option<PlantProfile> {
        let mut profiles = self.write();
        let profile = profiles.iter_mut().find(|p| p.id == plant_id)?;
        if let Some(name) = &update.name {
            profile.name = name.trim().to_string();
        }
        if let Some(species) = &update.species {
            profile.species = species.trim().to_string();
        }
        if let Some(location) = &update.location {
            profile.location = location.trim().to_string();
        }
        if let Some(ranges) = update.optimal_ranges {
            profile.optimal_ranges = ranges;
        }
        Some(profile.clone())
    }

    pub fn record_watering(&self, plant_id: &str, at: DateTime<Utc>) -> Option<PlantProfile> {
        let mut profiles = self.write();
        let profile = profiles.iter_mut().find(|p| p.id == plant_id)?;
        profile.last_watered = Some(at);
        Some(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OptimalRanges, Range};

    fn profile(id: &str) -> PlantProfile {
        PlantProfile {
            id: id.to_string(),
            ..PlantProfile::seed()
        }
    }

    #[test]
    fn lookup_by_id() {
        let reg = PlantRegistry::new([profile("a"), profile("b")]);
        assert_eq!(reg.get("b").unwrap().id, "b");
        assert!(reg.get("c").is_none());
        assert_eq!(reg.ids(), vec!["a", "b"]);
    }

    #[test]
    fn register_replaces_same_id_in_place() {
        let reg = PlantRegistry::new([profile("a"), profile("b")]);
        reg.register(PlantProfile {
            name: "Renamed".into(),
            ..profile("a")
        });
        let all = reg.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Renamed");
    }

    #[test]
    fn update_touches_only_present_fields() {
        let reg = PlantRegistry::new([profile("a")]);
        let mut ranges = OptimalRanges::houseplant();
        ranges.light_level = Range::new(100.0, 900.0);
        let updated = reg
            .update(
                "a",
                &ProfileUpdate {
                    location: Some(" Kitchen ".into()),
                    optimal_ranges: Some(ranges),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.location, "Kitchen");
        assert_eq!(updated.name, "Monstera Deliciosa");
        assert_eq!(reg.get("a").unwrap().optimal_ranges.light_level.max, 900.0);
        assert!(reg.update("missing", &ProfileUpdate::default()).is_none());
    }

    #[test]
    fn watering_sets_last_watered() {
        let reg = PlantRegistry::new([profile("a")]);
        let at = Utc::now();
        assert_eq!(reg.record_watering("a", at).unwrap().last_watered, Some(at));
        assert!(reg.record_watering("nope", at).is_none());
    }
}
