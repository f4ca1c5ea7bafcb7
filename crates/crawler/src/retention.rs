//! Retention windows
//!
//! Objects are grouped by the folder that directly contains them, read as a
//! timestamp (`data/2024-01-01/x.csv` belongs to window `2024-01-01`). The
//! most recent windows are kept out of cleanup.

use chrono::{DateTime, Utc};
use crawler_common::ObjectRef;
use std::collections::{BTreeSet, HashSet};
use tracing::warn;

use crate::timefmt::parse_timestamp;

/// Window instant of an object, if its key has a parsable window folder
pub fn window_of(object: &ObjectRef, window_layout: &str) -> Option<DateTime<Utc>> {
    let Some(segment) = object.window_segment() else {
        warn!(object = %object.key, "Object path has no window folder, skipping retention");
        return None;
    };

    match parse_timestamp(segment, window_layout) {
        Ok(instant) => Some(instant),
        Err(e) => {
            warn!(
                object = %object.key,
                window = segment,
                layout = window_layout,
                error = %e,
                "Unable to parse window folder, skipping retention"
            );
            None
        }
    }
}

/// Processed objects sorted by their retention window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSplit {
    /// Outside the most recent windows, may be cleaned
    pub eligible: Vec<ObjectRef>,
    /// In one of the most recent windows
    pub retained: Vec<ObjectRef>,
    /// No parsable window folder, never cleaned while retention is on
    pub unwindowed: Vec<ObjectRef>,
}

/// Split `objects` around the `windows_to_retain` most recent windows.
///
/// With `windows_to_retain == 0` everything is eligible. Objects sharing a
/// window instant land on the same side. Each list keeps input order.
pub fn split_by_windows(
    objects: &[ObjectRef],
    windows_to_retain: usize,
    window_layout: &str,
) -> WindowSplit {
    if windows_to_retain == 0 {
        return WindowSplit {
            eligible: objects.to_vec(),
            ..WindowSplit::default()
        };
    }

    let mut split = WindowSplit::default();
    let mut windowed = Vec::with_capacity(objects.len());
    for object in objects {
        match window_of(object, window_layout) {
            Some(window) => windowed.push((object, window)),
            None => split.unwindowed.push(object.clone()),
        }
    }

    let distinct: BTreeSet<DateTime<Utc>> = windowed.iter().map(|(_, w)| *w).collect();
    let retained: HashSet<DateTime<Utc>> = distinct.into_iter().rev().take(windows_to_retain).collect();

    for (object, window) in windowed {
        if retained.contains(&window) {
            split.retained.push(object.clone());
        } else {
            split.eligible.push(object.clone());
        }
    }

    split
}

/// Objects eligible for cleanup once the `windows_to_retain` most recent
/// windows are set aside.
///
/// With `windows_to_retain == 0` the input comes back unchanged. Otherwise
/// objects without a parsable window are never returned. Objects sharing a
/// window instant are kept or released together. Output keeps input order.
pub fn filter_older_than_windows(
    objects: &[ObjectRef],
    windows_to_retain: usize,
    window_layout: &str,
) -> Vec<ObjectRef> {
    split_by_windows(objects, windows_to_retain, window_layout).eligible
}
