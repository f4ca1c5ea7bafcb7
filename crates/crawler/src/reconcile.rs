//! Bucket reconciliation
//!
//! A data object `K` ending in the data suffix `S` is paired with the marker
//! object obtained by replacing the trailing `S` of `K` with the marker
//! suffix `M`. That rewrite is the only link between the two; timestamps and
//! contents play no part.
//!
//! Classifying one listing yields three disjoint sets:
//!
//! - **unprocessed**: data objects without a marker
//! - **processed**: data objects with a marker
//! - **orphan markers**: markers whose data object is not in the listing

use crawler_common::ObjectRef;
use std::collections::HashSet;

/// Result of classifying one listing. Each set keeps listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub unprocessed: Vec<ObjectRef>,
    pub processed: Vec<ObjectRef>,
    pub orphan_markers: Vec<ObjectRef>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.unprocessed.is_empty() && self.processed.is_empty() && self.orphan_markers.is_empty()
    }

    pub fn total(&self) -> usize {
        self.unprocessed.len() + self.processed.len() + self.orphan_markers.len()
    }
}

/// Marker key for a data key, or `None` if `key` does not end with
/// `data_suffix`.
pub fn marker_key(key: &str, data_suffix: &str, marker_suffix: &str) -> Option<String> {
    if data_suffix.is_empty() {
        return None;
    }
    key.strip_suffix(data_suffix)
        .map(|stem| format!("{}{}", stem, marker_suffix))
}

/// Data key for a marker key, or `None` if `key` does not end with
/// `marker_suffix`.
pub fn data_key(key: &str, data_suffix: &str, marker_suffix: &str) -> Option<String> {
    if marker_suffix.is_empty() {
        return None;
    }
    key.strip_suffix(marker_suffix)
        .map(|stem| format!("{}{}", stem, data_suffix))
}

/// Split a listing into unprocessed, processed and orphan-marker objects.
///
/// An empty `data_suffix` disables ingestion: every set comes back empty.
pub fn classify(objects: &[ObjectRef], data_suffix: &str, marker_suffix: &str) -> Classification {
    let mut result = Classification::default();
    if data_suffix.is_empty() {
        return result;
    }

    let keys: HashSet<&str> = objects.iter().map(|o| o.key.as_str()).collect();

    for object in objects {
        if let Some(marker) = marker_key(&object.key, data_suffix, marker_suffix) {
            if keys.contains(marker.as_str()) {
                result.processed.push(object.clone());
            } else {
                result.unprocessed.push(object.clone());
            }
            continue;
        }

        if let Some(data) = data_key(&object.key, data_suffix, marker_suffix) {
            if !keys.contains(data.as_str()) {
                result.orphan_markers.push(object.clone());
            }
        }
    }

    result
}
