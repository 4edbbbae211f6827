//! Attaches verified source code to decoded steps by program counter.
//!
//! A verification service supplies code fragments for some program counters only.
//! The map is made dense by carrying each fragment forward until the next one.

use std::{collections::BTreeMap, sync::Arc};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::processed::DecodedStep;

/// Number of contracts whose source maps are kept by default.
pub const DEFAULT_SOURCE_CACHE_CAPACITY: usize = 32;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct SourceFragment {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub context_code: String,
}

/// Entry in the list form used by the verification service.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub pc: u64,
    #[serde(flatten)]
    pub fragment: SourceFragment,
}

/// Fragments for some program counters.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SparseSourceMap(pub BTreeMap<u64, SourceFragment>);

impl SparseSourceMap {
    pub fn from_entries<I: IntoIterator<Item = SourceEntry>>(entries: I) -> Self {
        Self(
            entries
                .into_iter()
                .map(|entry| (entry.pc, entry.fragment))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fragments for every program counter from the lowest to the highest known one.
///
/// Only the known program counters are stored. A pc between two of them resolves
/// to the fragment at the nearest lower one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DenseSourceMap {
    breakpoints: BTreeMap<u64, SourceFragment>,
}

impl DenseSourceMap {
    /// Fills gaps with the most recent fragment at a lower pc.
    pub fn from_sparse(sparse: &SparseSourceMap) -> Self {
        Self {
            breakpoints: sparse.0.clone(),
        }
    }

    /// Fragment for the pc, None outside the covered range.
    pub fn get(&self, pc: u64) -> Option<&SourceFragment> {
        let (_, end) = self.range()?;
        if pc > end {
            return None;
        }
        self.breakpoints
            .range(..=pc)
            .next_back()
            .map(|(_, fragment)| fragment)
    }

    /// Lowest and highest pc covered.
    pub fn range(&self) -> Option<(u64, u64)> {
        let (start, _) = self.breakpoints.first_key_value()?;
        let (end, _) = self.breakpoints.last_key_value()?;
        Some((*start, *end))
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}

/// Sets source_code and context_code on every step.
///
/// Steps outside the map get empty strings.
pub fn annotate(steps: &mut [DecodedStep], map: &DenseSourceMap) {
    let empty = SourceFragment::default();
    for step in steps {
        let fragment = map.get(step.pc).unwrap_or(&empty);
        step.source_code = Some(fragment.code.clone());
        step.context_code = Some(fragment.context_code.clone());
    }
}

/// Address of the contract the source map should be fetched for: the first
/// non-empty call target in the trace.
pub fn source_target(trace: &[DecodedStep]) -> Option<&str> {
    trace
        .iter()
        .find_map(|step| step.target().filter(|address| !address.is_empty()))
}

/// Supplies source maps for contracts (e.g., a client of a verification service).
pub trait SourceMapProvider {
    /// None if there is no source map for the address.
    fn sparse_source_map(&self, address: &str) -> Option<SparseSourceMap>;
}

impl<F> SourceMapProvider for F
where
    F: Fn(&str) -> Option<SparseSourceMap>,
{
    fn sparse_source_map(&self, address: &str) -> Option<SparseSourceMap> {
        self(address)
    }
}

/// Dense source maps by contract address. Least recently used maps are evicted
/// once `capacity` is reached.
#[derive(Debug)]
pub struct SourceMapCache {
    capacity: usize,
    maps: IndexMap<String, Arc<DenseSourceMap>>,
}

impl SourceMapCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            maps: IndexMap::with_capacity(capacity.max(1)),
        }
    }

    /// Gets a cached map, fetching and densifying it if absent.
    ///
    /// A provider that has no map yields an empty map, which is not cached.
    pub fn get_or_fetch<P: SourceMapProvider + ?Sized>(
        &mut self,
        address: &str,
        provider: &P,
    ) -> Arc<DenseSourceMap> {
        let key = address.to_lowercase();
        if let Some(index) = self.maps.get_index_of(&key) {
            debug!("Source map cache hit for {key}");
            let last = self.maps.len() - 1;
            self.maps.move_index(index, last);
            return Arc::clone(&self.maps[last]);
        }

        let Some(sparse) = provider.sparse_source_map(&key) else {
            warn!("No source map available for {key}");
            return Arc::new(DenseSourceMap::default());
        };
        let dense = Arc::new(DenseSourceMap::from_sparse(&sparse));
        if self.maps.len() >= self.capacity {
            if let Some((evicted, _)) = self.maps.shift_remove_index(0) {
                debug!("Source map cache evicted {evicted}");
            }
        }
        debug!("Source map cache stored {key}");
        self.maps.insert(key, Arc::clone(&dense));
        dense
    }

    pub fn contains(&self, address: &str) -> bool {
        self.maps.contains_key(&address.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

impl Default for SourceMapCache {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_CACHE_CAPACITY)
    }
}
