//! Process-wide canonical set for filter nodes.
//!
//! The set holds weak references keyed by structural fingerprint, so unused
//! filters are reclaimed once their last strong handle drops. Dead entries
//! are swept opportunistically during lookups and wholesale once an insert
//! threshold is exceeded.

use crate::{
    filter::{Filter, FilterError, Node},
    model::RecordModel,
};
use std::{
    collections::HashMap,
    ptr,
    sync::{Arc, LazyLock, Mutex, Weak},
};

// Full sweep cadence, counted in inserts.
const SWEEP_INTERVAL: usize = 1024;

// Per-record parse-cache capacity; the whole cache drops when exceeded,
// standing in for the source's soft-valued map.
const PARSE_CACHE_MAX: usize = 256;

static CANONICAL: LazyLock<Mutex<CanonicalSet>> =
    LazyLock::new(|| Mutex::new(CanonicalSet::default()));

static PARSED: LazyLock<Mutex<HashMap<(usize, String), Filter>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Default)]
struct CanonicalSet {
    buckets: HashMap<u64, Vec<Weak<Node>>>,
    inserts_since_sweep: usize,
}

impl CanonicalSet {
    fn intern(&mut self, node: Node) -> Filter {
        let fingerprint = node.structural_hash();
        let bucket = self.buckets.entry(fingerprint).or_default();

        bucket.retain(|weak| weak.strong_count() > 0);
        for weak in bucket.iter() {
            if let Some(existing) = weak.upgrade() {
                if existing.structural_eq(&node) {
                    return Filter(existing);
                }
            }
        }

        let interned = Arc::new(node);
        bucket.push(Arc::downgrade(&interned));

        self.inserts_since_sweep += 1;
        if self.inserts_since_sweep >= SWEEP_INTERVAL {
            self.sweep();
        }

        Filter(interned)
    }

    fn sweep(&mut self) {
        self.buckets.retain(|_, bucket| {
            bucket.retain(|weak| weak.strong_count() > 0);
            !bucket.is_empty()
        });
        self.inserts_since_sweep = 0;
    }
}

/// Return the canonical instance structurally equal to `node`, interning
/// `node` if no live instance exists.
pub(crate) fn canonicalize(node: Node) -> Filter {
    let mut set = CANONICAL.lock().expect("canonical set lock poisoned");
    set.intern(node)
}

/// Parse and canonicalize, memoized by `(record, expr)`.
pub(crate) fn filter_for(
    record: &'static RecordModel,
    expr: &str,
) -> Result<Filter, FilterError> {
    let key = (ptr::from_ref(record) as usize, expr.to_string());

    if let Some(hit) = PARSED.lock().expect("parse cache lock poisoned").get(&key) {
        return Ok(hit.clone());
    }

    let parsed = super::parse::parse(record, expr)?;

    let mut cache = PARSED.lock().expect("parse cache lock poisoned");
    if cache.len() >= PARSE_CACHE_MAX {
        cache.clear();
    }
    cache.insert(key, parsed.clone());

    Ok(parsed)
}
