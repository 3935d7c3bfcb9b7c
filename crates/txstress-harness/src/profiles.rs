//! Named workload profiles.
//!
//! Each preset is a named parameterization of one [`WorkloadConfig`],
//! aimed at a different class of store defect. A profile derives its own
//! run seed from its name so two different profiles never share RNG
//! streams by accident, while any profile can still be re-seeded
//! explicitly.

use txstress_types::derive_profile_seed;

use crate::workload::{InsertCountRange, WorkloadConfig};

/// Names accepted by [`profile_by_name`], in presentation order.
pub const PROFILE_NAMES: [&str; 4] = [
    "smoke",
    "rollback-storm",
    "fixed-key-contention",
    "duplicate-retry",
];

/// Sequential mixed commit/rollback run; the smallest useful sanity check.
#[must_use]
pub fn profile_smoke() -> WorkloadConfig {
    WorkloadConfig {
        total_transactions: 100,
        concurrency: 1,
        insert_count_range: InsertCountRange::new(1, 9),
        rollback_probability: 0.5,
        run_seed: derive_profile_seed("smoke"),
        ..WorkloadConfig::default()
    }
}

/// Every transaction rolls back; the store must end empty.
#[must_use]
pub fn profile_rollback_storm() -> WorkloadConfig {
    WorkloadConfig {
        total_transactions: 200,
        concurrency: 8,
        insert_count_range: InsertCountRange::new(1, 9),
        rollback_probability: 1.0,
        run_seed: derive_profile_seed("rollback-storm"),
        ..WorkloadConfig::default()
    }
}

/// Many workers hammering one identity label to probe cross-session write
/// races; no duplicate retries, so every extra effective write is a store
/// defect.
#[must_use]
pub fn profile_fixed_key_contention() -> WorkloadConfig {
    WorkloadConfig {
        total_transactions: 2_000,
        concurrency: 50,
        insert_count_range: InsertCountRange::new(1, 4),
        rollback_probability: 0.3,
        duplicate_retry_probability: 0.0,
        fixed_key: Some("dup".to_owned()),
        run_seed: derive_profile_seed("fixed-key-contention"),
        ..WorkloadConfig::default()
    }
}

/// Exercises the erroneous client-side retry path: a quarter of the plans
/// re-insert their first row inside the same transaction.
#[must_use]
pub fn profile_duplicate_retry() -> WorkloadConfig {
    WorkloadConfig {
        total_transactions: 400,
        concurrency: 4,
        insert_count_range: InsertCountRange::new(1, 6),
        rollback_probability: 0.25,
        duplicate_retry_probability: 0.25,
        duplicate_batch_size: 1,
        run_seed: derive_profile_seed("duplicate-retry"),
        ..WorkloadConfig::default()
    }
}

/// Look up a profile by its CLI name.
#[must_use]
pub fn profile_by_name(name: &str) -> Option<WorkloadConfig> {
    match name {
        "smoke" => Some(profile_smoke()),
        "rollback-storm" => Some(profile_rollback_storm()),
        "fixed-key-contention" => Some(profile_fixed_key_contention()),
        "duplicate-retry" => Some(profile_duplicate_retry()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_profile_resolves_and_validates() {
        for name in PROFILE_NAMES {
            let config = profile_by_name(name)
                .unwrap_or_else(|| panic!("profile {name} must resolve"));
            config.validate().unwrap();
        }
    }

    #[test]
    fn unknown_profile_name_is_rejected() {
        assert!(profile_by_name("chaos-monkey").is_none());
    }

    #[test]
    fn profiles_derive_distinct_seeds() {
        let seeds: Vec<u64> = PROFILE_NAMES
            .iter()
            .filter_map(|name| profile_by_name(name).map(|c| c.run_seed))
            .collect();
        let mut deduped = seeds.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), seeds.len(), "seeds: {seeds:?}");
    }

    #[test]
    fn fixed_key_profile_pins_the_label() {
        let config = profile_fixed_key_contention();
        assert_eq!(config.fixed_key.as_deref(), Some("dup"));
        assert_eq!(config.duplicate_retry_probability, 0.0);
    }
}
