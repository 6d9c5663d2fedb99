use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::trackpoint_enricher::{enrich_trackpoints, EnrichedTable};
use crate::TcxError;

/// Tables kept before the least recently used one is evicted.
const DEFAULT_CAPACITY: usize = 32;

type ContentHash = [u8; 32];

/// Content-addressed memoization of enrichment results: the SHA-256 of the
/// uploaded bytes keys the finished table, so re-rendering the same file
/// skips the whole transform. Bounded LRU; safe to share across sessions.
///
/// Failed transforms are not cached. Two concurrent uploads of the same file
/// may both compute, but the transform is pure, so they converge to one
/// entry.
pub struct TableCache {
    entries: Mutex<LruCache<ContentHash, Arc<EnrichedTable>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Cache holding at most `capacity` tables (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached table for these bytes, or runs the transform and
    /// caches the result.
    pub fn get_or_enrich(&self, data: &[u8]) -> Result<Arc<EnrichedTable>, TcxError> {
        let key: ContentHash = Sha256::digest(data).into();

        if let Some(hit) = self.lock().get(&key) {
            log::debug!("table cache hit");
            return Ok(Arc::clone(hit));
        }

        let table = Arc::new(enrich_trackpoints(data)?);
        self.lock().put(key, Arc::clone(&table));
        Ok(table)
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<ContentHash, Arc<EnrichedTable>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcx_parser::TCX_NAMESPACE;

    fn tcx_document(count: usize, base_altitude: f64) -> String {
        let body: String = (0..count)
            .map(|i| {
                format!(
                    "<Trackpoint>\
                       <Time>2023-06-01T06:00:{:02}Z</Time>\
                       <Position>\
                         <LatitudeDegrees>52.52</LatitudeDegrees>\
                         <LongitudeDegrees>13.40</LongitudeDegrees>\
                       </Position>\
                       <AltitudeMeters>{}</AltitudeMeters>\
                       <DistanceMeters>{}</DistanceMeters>\
                       <HeartRateBpm><Value>80</Value></HeartRateBpm>\
                     </Trackpoint>",
                    i * 5,
                    base_altitude + i as f64,
                    25.0 * (i + 1) as f64,
                )
            })
            .collect();
        format!(
            "<TrainingCenterDatabase xmlns=\"{TCX_NAMESPACE}\">\
               <Activities><Activity><Lap><Track>{body}</Track></Lap></Activity></Activities>\
             </TrainingCenterDatabase>"
        )
    }

    #[test]
    fn identical_bytes_share_one_table() {
        let cache = TableCache::new();
        let doc = tcx_document(6, 100.0);
        let first = cache.get_or_enrich(doc.as_bytes()).unwrap();
        let second = cache.get_or_enrich(doc.as_bytes()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_bytes_compute_independently() {
        let cache = TableCache::new();
        let a = cache.get_or_enrich(tcx_document(6, 100.0).as_bytes()).unwrap();
        let b = cache.get_or_enrich(tcx_document(6, 500.0).as_bytes()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
        assert!((b.rows[0].altitude - a.rows[0].altitude - 400.0).abs() < 1e-9);
    }

    #[test]
    fn capacity_bounds_the_cache() {
        let cache = TableCache::with_capacity(2);
        for i in 0..5 {
            cache.get_or_enrich(tcx_document(6, 100.0 * (i + 1) as f64).as_bytes()).unwrap();
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_returned_and_not_cached() {
        let cache = TableCache::new();
        let err = cache.get_or_enrich(b"<not valid").unwrap_err();
        assert!(matches!(err, TcxError::MalformedInput(_)));
        assert!(cache.is_empty());

        // The same bad input fails the same way on retry.
        let again = cache.get_or_enrich(b"<not valid").unwrap_err();
        assert!(matches!(again, TcxError::MalformedInput(_)));
    }

    #[test]
    fn cache_is_shareable_across_threads() {
        let cache = std::sync::Arc::new(TableCache::new());
        let doc = std::sync::Arc::new(tcx_document(6, 100.0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let doc = Arc::clone(&doc);
                std::thread::spawn(move || cache.get_or_enrich(doc.as_bytes()).unwrap().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 6);
        }
        assert_eq!(cache.len(), 1);
    }
}
