//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check backend bookkeeping and layer coherence.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{CacheBackend, CacheLayer, MemoryCacheBackend};
use crate::store::SettingsMap;
use crate::tenant::{Tenant, TenantScope};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: u64 = 300;

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

fn valid_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..256)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: Vec<u8> },
    Get { key: String },
    Forget { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Forget { key }),
    ]
}

fn scope_strategy() -> impl Strategy<Value = TenantScope> {
    prop_oneof![
        Just(TenantScope::Global),
        (prop::sample::select(vec!["Company", "User"]), 1i64..20)
            .prop_map(|(model_type, id)| TenantScope::from(&Tenant::new(model_type, id))),
    ]
}

fn settings_strategy() -> impl Strategy<Value = SettingsMap> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,16}".prop_map(Value::String),
    ];
    prop::collection::btree_map("[a-z_]{1,12}", leaf, 0..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Statistics reflect every get issued against the backend.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let backend = MemoryCacheBackend::new(TEST_MAX_ENTRIES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => backend.put(&key, value, TEST_TTL).unwrap(),
                CacheOp::Get { key } => match backend.get(&key).unwrap() {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Forget { key } => {
                    backend.forget(&key).unwrap();
                }
            }
        }

        let stats = backend.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, backend.len(), "Total entries mismatch");
    }

    // A put followed by another put under the same key leaves one entry holding the latest bytes.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let backend = MemoryCacheBackend::new(TEST_MAX_ENTRIES);
        backend.put(&key, value1, TEST_TTL).unwrap();
        backend.put(&key, value2.clone(), TEST_TTL).unwrap();

        prop_assert_eq!(backend.get(&key).unwrap(), Some(value2));
        prop_assert_eq!(backend.len(), 1);
    }

    // The backend never holds more than its capacity.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let max_entries = 50;
        let backend = MemoryCacheBackend::new(max_entries);

        for (key, value) in entries {
            backend.put(&key, value, TEST_TTL).unwrap();
            prop_assert!(
                backend.len() <= max_entries,
                "Cache size {} exceeds max {}",
                backend.len(),
                max_entries
            );
        }
    }

    // Touching the oldest key moves eviction onto the next oldest.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        new_key in valid_key_strategy()
    ) {
        let mut seen = HashSet::new();
        let unique_keys: Vec<String> = keys.into_iter().filter(|k| seen.insert(k.clone())).collect();
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let backend = MemoryCacheBackend::new(unique_keys.len());
        for key in &unique_keys {
            backend.put(key, key.as_bytes().to_vec(), TEST_TTL).unwrap();
        }

        backend.get(&unique_keys[0]).unwrap();
        backend.put(&new_key, b"new".to_vec(), TEST_TTL).unwrap();

        prop_assert!(backend.get(&unique_keys[0]).unwrap().is_some());
        prop_assert!(backend.get(&unique_keys[1]).unwrap().is_none());
        prop_assert!(backend.get(&new_key).unwrap().is_some());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Whatever was last put for a scope is what read-through returns, from either tier.
    #[test]
    fn prop_layer_read_after_put(scope in scope_strategy(), settings in settings_strategy()) {
        let backend = Arc::new(MemoryCacheBackend::default());
        let layer = CacheLayer::new(backend.clone(), "prop", TEST_TTL);
        layer.put(&scope, settings.clone());

        let local = layer
            .read_through(&scope, || panic!("populated scope must not reload"))
            .unwrap();
        prop_assert_eq!(local.as_ref(), &settings);

        let cold = CacheLayer::new(backend, "prop", TEST_TTL);
        let remote = cold
            .read_through(&scope, || panic!("backend tier must serve the scope"))
            .unwrap();
        prop_assert_eq!(remote.as_ref(), &settings);
    }

    // Invalidating one scope never disturbs another.
    #[test]
    fn prop_layer_scope_isolation(
        a in scope_strategy(),
        b in scope_strategy(),
        settings in settings_strategy()
    ) {
        prop_assume!(a != b);
        let layer = CacheLayer::new(Arc::new(MemoryCacheBackend::default()), "prop", TEST_TTL);
        layer.put(&a, settings.clone());
        layer.put(&b, SettingsMap::new());

        layer.invalidate(&b);

        let kept = layer.snapshot(&a);
        prop_assert_eq!(kept.as_deref(), Some(&settings));
        prop_assert!(layer.snapshot(&b).is_none());
    }
}
