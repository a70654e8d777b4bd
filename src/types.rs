//! Shared types for the contentvault application.
//!
//! This module contains the result and filter types passed in and out of
//! the item store, plus the CLI subcommand definitions.
use std::{path::PathBuf, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::Subcommand;
use serde::Serialize;

use crate::{Item, VaultError};

/// A specialized Result type for contentvault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Outcome of a save: the stored item and whether it already existed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub item: Item,
    /// `true` when the save merged into an existing link with the same normalized URL
    pub is_duplicate: bool,
}

/// One end of a date-range filter.
///
/// A bare calendar date covers the whole day: as a lower bound it means
/// midnight UTC, as an upper bound it means 23:59:59.999 UTC of that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl DateBound {
    /// Earliest instant covered by this bound.
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            DateBound::Day(date) => date.and_time(NaiveTime::MIN).and_utc(),
            DateBound::Instant(instant) => *instant,
        }
    }

    /// Latest instant covered by this bound.
    pub fn end(&self) -> DateTime<Utc> {
        match self {
            DateBound::Day(date) => date
                .and_hms_milli_opt(23, 59, 59, 999)
                .map(|end| end.and_utc())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            DateBound::Instant(instant) => *instant,
        }
    }
}

impl FromStr for DateBound {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
            return Ok(DateBound::Instant(instant.with_timezone(&Utc)));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(DateBound::Day(date));
        }
        // Zone-less timestamps are read as UTC
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(DateBound::Instant(naive.and_utc()));
            }
        }

        Err(VaultError::InvalidDate {
            value: s.to_string(),
        })
    }
}

impl From<NaiveDate> for DateBound {
    fn from(date: NaiveDate) -> Self {
        DateBound::Day(date)
    }
}

impl From<DateTime<Utc>> for DateBound {
    fn from(instant: DateTime<Utc>) -> Self {
        DateBound::Instant(instant)
    }
}

/// Conjunctive search criteria. Every unset field matches all items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Case-insensitive substring matched against title, body, url and tags
    pub query: Option<String>,
    /// Item must carry at least one of these tags
    pub tags: Vec<String>,
    pub date_from: Option<DateBound>,
    pub date_to: Option<DateBound>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn date_from(mut self, bound: impl Into<DateBound>) -> Self {
        self.date_from = Some(bound.into());
        self
    }

    pub fn date_to(mut self, bound: impl Into<DateBound>) -> Self {
        self.date_to = Some(bound.into());
        self
    }
}

/// Available subcommands for the contentvault application
#[derive(Subcommand)]
pub enum Commands {
    /// Save a text note
    Note {
        /// Body text of the note
        body: Option<String>,

        /// Optional title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Compose the body in an editor before saving
        #[clap(short, long)]
        edit: bool,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Path to a file containing the note body
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// Save a link; saving a known URL merges into the existing entry
    Link {
        /// URL to save
        url: String,

        /// Optional title for the link
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Optional comment about the link
        #[clap(short, long)]
        comment: Option<String>,

        /// Tags to associate with the link (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,
    },

    /// Search saved items by text, tags and/or date range
    Search {
        /// Free-text query (title, body, URL and tags)
        query: Option<String>,

        /// Only items carrying this tag (repeatable; any tag matches)
        #[clap(short = 't', long = "tag")]
        tags: Vec<String>,

        /// Items created on or after this date (YYYY-MM-DD or RFC 3339)
        #[clap(long)]
        from: Option<String>,

        /// Items created on or before this date (YYYY-MM-DD or RFC 3339)
        #[clap(long)]
        to: Option<String>,

        /// Limit the number of results (0 means no limit)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List items saved in the last N days
    Recent {
        /// Number of days to look back (default from configuration)
        #[clap(short, long)]
        days: Option<u32>,

        /// Maximum number of results
        #[clap(short = 'n', long)]
        limit: Option<usize>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List every saved item, newest first
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show a single item by ID
    Show {
        /// ID of the item to show
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Delete an item by ID
    Delete {
        /// ID of the item to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// List all tags with their usage counts
    Tags {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_date_spans_whole_day() {
        let bound: DateBound = "2024-03-01".parse().unwrap();
        assert_eq!(bound.start().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(
            bound.end().to_rfc3339(),
            "2024-03-01T23:59:59.999+00:00"
        );
    }

    #[test]
    fn last_representable_day_does_not_overflow() {
        let bound = DateBound::Day(NaiveDate::MAX);
        assert_eq!(bound.end().date_naive(), NaiveDate::MAX);
        assert!(bound.start() < bound.end());
    }

    #[test]
    fn instants_are_used_as_given() {
        let bound: DateBound = "2024-03-01T10:00:00+02:00".parse().unwrap();
        assert_eq!(bound.start(), bound.end());
        assert_eq!(bound.start().to_rfc3339(), "2024-03-01T08:00:00+00:00");

        let naive: DateBound = "2024-03-01T10:15".parse().unwrap();
        assert_eq!(naive.end().to_rfc3339(), "2024-03-01T10:15:00+00:00");
    }

    #[test]
    fn rejects_garbage_dates() {
        let err = "last tuesday".parse::<DateBound>().unwrap_err();
        assert!(matches!(err, VaultError::InvalidDate { .. }));
    }
}
