//! Profile persistence for the terminal client
//!
//! Supports different backends based on environment:
//! - Local: JSON file in the data directory
//! - Test: in-memory store, nothing touches disk

use chrono::{DateTime, Utc};
use dailyzip_core::{
    MemoryProfileStore, Profile, ProfileStore, StoreError, StoreResult, StreakRecord, UserId,
};
use log::{debug, warn};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the local profile store inside the data directory
pub const PROFILES_FILE: &str = "dailyzip_profiles.json";

/// Environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// File-based storage
    Local,
    /// In-memory storage
    Test,
}

impl Environment {
    /// Detect environment from the DAILYZIP_ENV variable
    pub fn detect() -> Self {
        Self::from_name(std::env::var("DAILYZIP_ENV").ok().as_deref())
    }

    fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("test") | Some("testing") => Environment::Test,
            _ => Environment::Local,
        }
    }
}

/// Default data directory: the platform's local data dir, or the working
/// directory when there is none
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("dailyzip"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// ==================== Local File Backend ====================

/// JSON file store; the whole file is rewritten on every change
pub struct LocalProfileStore {
    path: PathBuf,
    cache: Mutex<Option<ProfileFile>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileFile {
    profiles: BTreeMap<UserId, Profile>,
}

impl LocalProfileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(PROFILES_FILE),
            cache: Mutex::new(None),
        }
    }

    fn read_file(&self) -> ProfileFile {
        match fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("ignoring unreadable profile file {}: {e}", self.path.display());
                ProfileFile::default()
            }),
            Err(_) => ProfileFile::default(),
        }
    }

    fn write_file(&self, data: &ProfileFile) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(data).map_err(|e| StoreError::Storage(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| StoreError::Storage(e.to_string()))?;
        debug!("saved {} profile(s) to {}", data.profiles.len(), self.path.display());
        Ok(())
    }

    /// Run `f` against a copy of the cached file contents under the lock.
    /// When `f` reports a change the copy is written out, and the cache only
    /// takes it once the write succeeded.
    fn with_data<T>(
        &self,
        f: impl FnOnce(&mut ProfileFile) -> StoreResult<(T, bool)>,
    ) -> StoreResult<T> {
        let mut cache = self.cache.lock();
        let data = cache.get_or_insert_with(|| self.read_file());
        let mut draft = data.clone();
        let (value, changed) = f(&mut draft)?;
        if changed {
            self.write_file(&draft)?;
            *data = draft;
        }
        Ok(value)
    }
}

impl ProfileStore for LocalProfileStore {
    fn load(&self, user: &UserId) -> StoreResult<Profile> {
        self.with_data(|data| {
            let profile = data
                .profiles
                .get(user)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(user.clone()))?;
            Ok((profile, false))
        })
    }

    fn insert(&self, user: &UserId, profile: Profile) -> StoreResult<()> {
        self.with_data(|data| {
            data.profiles.insert(user.clone(), profile);
            Ok(((), true))
        })
    }

    fn compare_and_swap(
        &self,
        user: &UserId,
        expected: Option<DateTime<Utc>>,
        record: StreakRecord,
    ) -> StoreResult<bool> {
        self.with_data(|data| {
            let profile = data
                .profiles
                .get_mut(user)
                .ok_or_else(|| StoreError::NotFound(user.clone()))?;
            if profile.record.last_played_at != expected {
                return Ok((false, false));
            }
            profile.record = record;
            Ok((true, true))
        })
    }

    fn backend_name(&self) -> &'static str {
        "Local"
    }
}

// ==================== Backend Factory ====================

/// Create the appropriate store based on environment
pub fn create_store(env: Environment, data_dir: &Path) -> Arc<dyn ProfileStore> {
    match env {
        Environment::Local => Arc::new(LocalProfileStore::new(data_dir)),
        Environment::Test => Arc::new(MemoryProfileStore::new()),
    }
}

// ==================== Gamer Tags ====================

const ADJECTIVES: [&str; 10] = [
    "Neon", "Crimson", "Phantom", "Galactic", "Cyber", "Shadow", "Mythic", "Arcane", "Quantum",
    "Solar",
];
const ARCHETYPES: [&str; 10] = [
    "Rogue", "Ranger", "Viper", "Nova", "Falcon", "Specter", "Titan", "Samurai", "Glitch", "Rider",
];
const FINISHERS: [&str; 10] = [
    "Prime", "Eclipse", "Strike", "Pulse", "Forge", "Blaze", "Shift", "Storm", "Flux", "Drift",
];
const CONNECTORS: [&str; 3] = ["_", "-", ""];

/// Random display name for a new profile, e.g. `NeonRoguePrime_123`
pub fn gamer_tag<R: Rng + ?Sized>(rng: &mut R) -> String {
    let pick = |list: &[&'static str], rng: &mut R| list.choose(rng).copied().unwrap_or_default();
    let adjective = pick(&ADJECTIVES, rng);
    let archetype = pick(&ARCHETYPES, rng);
    let finisher = pick(&FINISHERS, rng);
    let connector = pick(&CONNECTORS, rng);
    let digits: u16 = rng.gen_range(100..=999);
    format!("{adjective}{archetype}{finisher}{connector}{digits}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn played(day: u32) -> StreakRecord {
        StreakRecord {
            streak: day,
            xp: day * 10,
            last_played_at: Some(Utc.with_ymd_and_hms(2024, 7, day, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_local_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::from("player");

        let store = LocalProfileStore::new(dir.path());
        assert_eq!(store.backend_name(), "Local");
        assert!(matches!(store.load(&user), Err(StoreError::NotFound(_))));
        store.insert(&user, Profile::new("GlitchRiderPulse-808")).unwrap();
        assert!(store.compare_and_swap(&user, None, played(1)).unwrap());

        let reopened = LocalProfileStore::new(dir.path());
        let profile = reopened.load(&user).unwrap();
        assert_eq!(profile.username, "GlitchRiderPulse-808");
        assert_eq!(profile.record, played(1));
    }

    #[test]
    fn test_local_store_stale_swap_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::from("player");
        let store = LocalProfileStore::new(dir.path());
        store.insert(&user, Profile::new("p")).unwrap();

        assert!(store.compare_and_swap(&user, None, played(1)).unwrap());
        assert!(!store.compare_and_swap(&user, None, played(2)).unwrap());
        assert!(store
            .compare_and_swap(&user, played(1).last_played_at, played(2))
            .unwrap());
        assert_eq!(store.load(&user).unwrap().record, played(2));
    }

    #[test]
    fn test_failed_write_leaves_record_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::from("player");
        let store = LocalProfileStore::new(dir.path());
        store.insert(&user, Profile::new("ShadowViperBlaze_250")).unwrap();

        // a directory in place of the file makes every write fail
        let file = dir.path().join(PROFILES_FILE);
        fs::remove_file(&file).unwrap();
        fs::create_dir(&file).unwrap();

        assert!(matches!(
            store.compare_and_swap(&user, None, played(1)),
            Err(StoreError::Storage(_))
        ));
        assert_eq!(store.load(&user).unwrap().record, StreakRecord::default());

        // once the disk recovers the same swap goes through
        fs::remove_dir(&file).unwrap();
        assert!(store.compare_and_swap(&user, None, played(1)).unwrap());
        assert_eq!(
            LocalProfileStore::new(dir.path()).load(&user).unwrap().record,
            played(1)
        );
    }

    #[test]
    fn test_local_store_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = LocalProfileStore::new(&nested);
        store.insert(&UserId::from("u"), Profile::new("p")).unwrap();
        assert!(nested.join(PROFILES_FILE).exists());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROFILES_FILE), "{ not json").unwrap();
        let store = LocalProfileStore::new(dir.path());
        assert!(matches!(
            store.load(&UserId::from("u")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_environment_detection() {
        assert_eq!(Environment::from_name(None), Environment::Local);
        assert_eq!(Environment::from_name(Some("local")), Environment::Local);
        assert_eq!(Environment::from_name(Some("test")), Environment::Test);
        assert_eq!(Environment::from_name(Some("testing")), Environment::Test);
    }

    #[test]
    fn test_factory_backends() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(create_store(Environment::Local, dir.path()).backend_name(), "Local");
        assert_eq!(create_store(Environment::Test, dir.path()).backend_name(), "Memory");
    }

    #[test]
    fn test_gamer_tag_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let tag = gamer_tag(&mut rng);
            let adjective = ADJECTIVES.iter().find(|a| tag.starts_with(*a));
            assert!(adjective.is_some(), "{tag}");

            let digits = &tag[tag.len() - 3..];
            let value: u16 = digits.parse().unwrap();
            assert!((100..=999).contains(&value), "{tag}");

            let body = tag[..tag.len() - 3].trim_end_matches(['_', '-']);
            assert!(FINISHERS.iter().any(|f| body.ends_with(f)), "{tag}");
        }
    }
}
