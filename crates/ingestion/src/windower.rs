//! Overlapping fixed-width time windows over merged records.
//!
//! The cursor starts at the earliest timestamp. Each step selects the rows
//! in `[cursor, cursor + width)` and then advances by `width - overlap`
//! until the cursor passes the latest timestamp. A row can land in more
//! than one chunk; that duplication is kept.

use argo_common::Timestamped;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::WindowConfig;
use crate::error::Result;
use crate::table::{render_csv, TableRow};

/// One non-empty window of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeChunk<T> {
    /// Cursor position that opened this window.
    pub window_start: DateTime<Utc>,
    /// Earliest timestamp among the rows.
    pub start: DateTime<Utc>,
    /// Latest timestamp among the rows.
    pub end: DateTime<Utc>,
    pub rows: Vec<T>,
}

impl<T: TableRow> TimeChunk<T> {
    /// Rows rendered as CSV text with a header line.
    pub fn payload(&self) -> Result<String> {
        render_csv(&self.rows, None)
    }
}

/// Produces [`TimeChunk`]s for a validated [`WindowConfig`].
#[derive(Debug, Clone, Copy)]
pub struct TimeWindower {
    config: WindowConfig,
}

impl TimeWindower {
    /// Fails when the configuration could never advance.
    pub fn new(config: WindowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Window the rows.
    ///
    /// Rows without a timestamp are left out. The remaining rows are sorted
    /// by time (stably, so rows sharing a timestamp keep their input order)
    /// before windowing.
    pub fn chunks<T: Timestamped + Clone>(&self, rows: &[T]) -> Vec<TimeChunk<T>> {
        let mut timed: Vec<(DateTime<Utc>, &T)> = rows
            .iter()
            .filter_map(|row| row.timestamp().map(|t| (t, row)))
            .collect();
        timed.sort_by_key(|(t, _)| *t);

        let (Some(&(first, _)), Some(&(last, _))) = (timed.first(), timed.last()) else {
            return Vec::new();
        };

        let width = self.config.width();
        let step = self.config.step();
        let mut chunks = Vec::new();
        let mut cursor = first;

        while cursor <= last {
            let lo = timed.partition_point(|(t, _)| *t < cursor);
            // A window reaching past the representable range takes the rest.
            let hi = match cursor.checked_add_signed(width) {
                Some(window_end) => timed.partition_point(|(t, _)| *t < window_end),
                None => timed.len(),
            };

            if lo < hi {
                let selected = &timed[lo..hi];
                chunks.push(TimeChunk {
                    window_start: cursor,
                    start: selected[0].0,
                    end: selected[selected.len() - 1].0,
                    rows: selected.iter().map(|(_, row)| (*row).clone()).collect(),
                });
            } else {
                debug!(window_start = %cursor, "Skipping empty window");
            }

            match cursor.checked_add_signed(step) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        debug!(
            rows = timed.len(),
            skipped = rows.len() - timed.len(),
            chunks = chunks.len(),
            "Windowed records"
        );
        chunks
    }
}
