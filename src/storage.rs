use std::{
    collections::{HashMap, HashSet},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, info, trace, warn};
use serde_json::Value;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::{
    merge_tags, normalize_tags, normalize_url, trim_to_option, Config, Item, ItemKind, NewItem,
    Result, SaveResult, SearchFilter, DEFAULT_SNAPSHOT_FILE,
};

/// Owns the saved items and mirrors them to a single JSON snapshot file.
///
/// All mutation goes through `&mut self`, so a caller sharing one store
/// across threads has to put it behind its own lock. Filesystem problems
/// never fail an operation: they are logged and the store carries on with
/// whatever it holds in memory.
#[derive(Debug)]
pub struct ItemStore {
    /// Directory containing the snapshot
    storage_dir: PathBuf,

    /// Full path of the snapshot file
    snapshot_path: PathBuf,

    /// Items in insertion order
    items: Vec<Item>,

    /// Whether the last persistence attempt reached disk
    durable: bool,

    /// Set when an existing snapshot could neither be loaded nor copied aside;
    /// writes are skipped so it is never overwritten
    protect_snapshot: bool,

    initialized: bool,
}

impl ItemStore {
    /// Creates an empty, unloaded store for `storage_dir/file_name`.
    ///
    /// Nothing touches the filesystem until [`ItemStore::initialize`].
    pub fn new(storage_dir: impl Into<PathBuf>, file_name: &str) -> Self {
        let storage_dir = storage_dir.into();
        let snapshot_path = storage_dir.join(file_name);
        Self::at(storage_dir, snapshot_path)
    }

    fn at(storage_dir: PathBuf, snapshot_path: PathBuf) -> Self {
        Self {
            storage_dir,
            snapshot_path,
            items: Vec::new(),
            durable: true,
            protect_snapshot: false,
            initialized: false,
        }
    }

    /// Creates and initializes a store using the default snapshot file name.
    pub fn open(storage_dir: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(storage_dir, DEFAULT_SNAPSHOT_FILE);
        store.initialize();
        store
    }

    /// Creates and initializes a store at the location named by `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut store = Self::at(config.storage_dir.clone(), config.snapshot_path());
        store.initialize();
        store
    }

    /// Loads the snapshot into memory, creating the storage directory if needed.
    ///
    /// Never fails: an unreadable directory, a missing file or a malformed
    /// snapshot all leave the store empty (and, for the first two, memory-only).
    /// A snapshot that cannot be fully loaded is copied aside first; if that
    /// copy fails the store stays memory-only rather than overwrite it.
    /// Calling this again after a successful initialization does nothing.
    ///
    /// # Returns
    ///
    /// The number of items loaded
    pub fn initialize(&mut self) -> usize {
        if self.initialized {
            return self.items.len();
        }
        self.initialized = true;

        info!(
            "Initializing ItemStore with snapshot: {}",
            self.snapshot_path.display()
        );

        if !self.storage_dir.exists() {
            debug!(
                "Storage directory does not exist, creating: {}",
                self.storage_dir.display()
            );
            if let Err(e) = fs::create_dir_all(&self.storage_dir) {
                warn!(
                    "Failed to create storage directory {} ({}), using in-memory storage only",
                    self.storage_dir.display(),
                    e
                );
                self.durable = false;
                return 0;
            }
        }

        let bytes = match fs::read(&self.snapshot_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No snapshot yet, starting with an empty collection");
                return 0;
            }
            Err(e) => {
                warn!(
                    "Failed to read snapshot {} ({}), using in-memory storage only",
                    self.snapshot_path.display(),
                    e
                );
                self.preserve_snapshot();
                self.durable = false;
                return 0;
            }
        };

        let raw = match String::from_utf8(bytes) {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    "Snapshot {} is not valid UTF-8 ({}), starting fresh",
                    self.snapshot_path.display(),
                    e.utf8_error()
                );
                self.preserve_snapshot();
                return 0;
            }
        };

        match parse_snapshot(&raw) {
            Some((items, skipped)) => {
                self.items = items;
                info!("Loaded {} items", self.items.len());
                if skipped > 0 {
                    self.preserve_snapshot();
                }
            }
            None => {
                error!(
                    "Snapshot {} is not a JSON array of items, starting fresh",
                    self.snapshot_path.display()
                );
                self.preserve_snapshot();
            }
        }

        self.items.len()
    }

    /// Saves a note or link.
    ///
    /// A link whose normalized URL matches an existing link is merged into
    /// that item instead of creating a new one: tags are unioned and an empty
    /// title or body is backfilled. Existing values are never overwritten.
    ///
    /// # Errors
    ///
    /// `InvalidItem` when a link candidate has no usable URL. Nothing is
    /// stored in that case.
    pub fn save_item(&mut self, candidate: NewItem) -> Result<SaveResult> {
        if candidate.kind == ItemKind::Link {
            let url = candidate.link_url()?;
            if let Some(index) = self.find_duplicate_index(&url) {
                return Ok(self.merge_duplicate(index, candidate));
            }
        }

        let id = self.generate_id();
        let item = candidate.into_item(id, Utc::now())?;
        info!("Saving new {}: {}", item.kind, item.id);

        self.items.push(item.clone());
        self.persist();

        Ok(SaveResult {
            item,
            is_duplicate: false,
        })
    }

    fn merge_duplicate(&mut self, index: usize, candidate: NewItem) -> SaveResult {
        let existing = &mut self.items[index];
        debug!(
            "URL already saved as {}, merging into existing item",
            existing.id
        );

        let mut changed = merge_tags(&mut existing.tags, &candidate.tags);

        if existing.title.as_deref().is_none_or(str::is_empty) {
            if let Some(title) = trim_to_option(candidate.title.as_deref()) {
                existing.title = Some(title);
                changed = true;
            }
        }
        if existing.body.as_deref().is_none_or(str::is_empty) {
            if let Some(body) = trim_to_option(candidate.body.as_deref()) {
                existing.body = Some(body);
                changed = true;
            }
        }

        if changed {
            existing.updated_at = Some(Utc::now());
        }
        let item = existing.clone();

        if changed {
            info!("Merged duplicate link into {}", item.id);
            self.persist();
        } else {
            trace!("Duplicate link {} brought nothing new, skipping write", item.id);
        }

        SaveResult {
            item,
            is_duplicate: true,
        }
    }

    /// Returns the saved link whose URL normalizes to the same value as `url`.
    pub fn find_duplicate(&self, url: &str) -> Option<&Item> {
        self.find_duplicate_index(url).map(|i| &self.items[i])
    }

    fn find_duplicate_index(&self, url: &str) -> Option<usize> {
        let normalized = normalize_url(url);
        self.items.iter().position(|item| {
            item.is_link()
                && item
                    .url
                    .as_deref()
                    .is_some_and(|u| normalize_url(u) == normalized)
        })
    }

    /// Returns the items matching every criterion in `filter`, newest first.
    ///
    /// The free-text query is matched case-insensitively against title, body,
    /// URL and tags.
    pub fn search_items(&self, filter: &SearchFilter) -> Vec<Item> {
        debug!("Searching {} items with {:?}", self.items.len(), filter);

        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        let wanted_tags: HashSet<String> = normalize_tags(&filter.tags).into_iter().collect();
        let from = filter.date_from.map(|bound| bound.start());
        let to = filter.date_to.map(|bound| bound.end());

        let results: Vec<&Item> = self
            .items
            .iter()
            .filter(|item| query.as_deref().is_none_or(|q| matches_query(item, q)))
            .filter(|item| {
                wanted_tags.is_empty()
                    || item
                        .tags
                        .iter()
                        .any(|t| wanted_tags.contains(&t.to_lowercase()))
            })
            .filter(|item| from.is_none_or(|from| item.created_at >= from))
            .filter(|item| to.is_none_or(|to| item.created_at <= to))
            .collect();

        let results = newest_first(results);
        info!("Search returned {} items", results.len());
        results
    }

    /// Returns items created within the last `days` days, newest first,
    /// truncated to `limit` when it is given and non-zero.
    pub fn get_recent_items(&self, days: u32, limit: Option<usize>) -> Vec<Item> {
        let now = Utc::now();
        // Windows reaching past chrono's range have no lower bound
        let cutoff = TimeDelta::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        debug!("Listing items created since {}", cutoff.to_rfc3339());

        let recent: Vec<&Item> = self
            .items
            .iter()
            .filter(|item| item.created_at >= cutoff && item.created_at <= now)
            .collect();

        let mut recent = newest_first(recent);
        if let Some(limit) = limit.filter(|l| *l > 0) {
            recent.truncate(limit);
        }
        recent
    }

    /// Removes the item with the given ID.
    ///
    /// # Returns
    ///
    /// `true` if an item was removed. An unknown ID is not an error and
    /// does not touch the snapshot.
    pub fn delete_item(&mut self, id: &str) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            debug!("Cannot delete item {}: not found", id);
            return false;
        };

        self.items.remove(index);
        self.persist();
        info!("Item {} deleted", id);
        true
    }

    pub fn get_item_by_id(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Returns every item, newest first.
    pub fn get_all_items(&self) -> Vec<Item> {
        newest_first(self.items.iter().collect())
    }

    /// Every distinct tag with the number of items carrying it, most used first.
    pub fn all_tags(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for tag in self.items.iter().flat_map(|item| item.tags.iter()) {
            *counts.entry(tag.to_lowercase()).or_default() += 1;
        }

        let mut tags: Vec<(String, usize)> = counts.into_iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tags
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// `false` once a write has failed and until the next one succeeds.
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().simple().to_string();
            if self.get_item_by_id(&id).is_none() {
                return id;
            }
        }
    }

    /// Writes the whole collection, degrading to memory-only on failure.
    fn persist(&mut self) {
        if self.protect_snapshot {
            debug!(
                "Not writing over unreadable snapshot {}",
                self.snapshot_path.display()
            );
            self.durable = false;
            return;
        }

        match self.write_snapshot() {
            Ok(()) => {
                if !self.durable {
                    info!(
                        "Snapshot {} is writable again",
                        self.snapshot_path.display()
                    );
                }
                self.durable = true;
            }
            Err(e) => {
                if self.durable {
                    warn!(
                        "Failed to persist {} ({}), continuing with in-memory storage",
                        self.snapshot_path.display(),
                        e
                    );
                } else {
                    debug!("Snapshot still not writable: {}", e);
                }
                self.durable = false;
            }
        }
    }

    /// Saves the collection using a temporary file in the same directory and
    /// an atomic rename, so readers see either the old or the new snapshot.
    fn write_snapshot(&self) -> Result<()> {
        if !self.storage_dir.exists() {
            debug!(
                "Creating storage directory: {}",
                self.storage_dir.display()
            );
            fs::create_dir_all(&self.storage_dir)?;
        }

        trace!("Serializing {} items", self.items.len());
        let json = serde_json::to_string_pretty(&self.items)?;

        let mut temp_file = NamedTempFile::new_in(&self.storage_dir)?;
        temp_file.write_all(json.as_bytes())?;
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;

        debug!("Moving snapshot into place: {}", self.snapshot_path.display());
        temp_file
            .persist(&self.snapshot_path)
            .map_err(|e| e.error)?;

        trace!("Snapshot written");
        Ok(())
    }

    /// Copies the current snapshot aside, or blocks further writes to it when
    /// the copy fails.
    fn preserve_snapshot(&mut self) {
        if !self.quarantine_snapshot() {
            warn!(
                "Leaving {} untouched, changes will be held in memory only",
                self.snapshot_path.display()
            );
            self.protect_snapshot = true;
            self.durable = false;
        }
    }

    /// Copies a malformed snapshot aside so the next write does not destroy it.
    fn quarantine_snapshot(&self) -> bool {
        let stem = self
            .snapshot_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "items".to_string());
        let target = self.storage_dir.join(format!(
            "{}.corrupt-{}.json",
            stem,
            Utc::now().timestamp()
        ));

        match fs::copy(&self.snapshot_path, &target) {
            Ok(_) => {
                warn!("Malformed snapshot preserved at {}", target.display());
                true
            }
            Err(e) => {
                warn!("Could not preserve malformed snapshot: {}", e);
                false
            }
        }
    }
}

/// Parses snapshot text into the usable items and the number of skipped
/// entries. `None` when it is not a JSON array at all; individual entries
/// that fail to parse or repeat an id are logged and skipped.
fn parse_snapshot(raw: &str) -> Option<(Vec<Item>, usize)> {
    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => return None,
        Err(e) => {
            warn!("Snapshot is not valid JSON: {}", e);
            return None;
        }
    };

    let mut seen = HashSet::with_capacity(entries.len());
    let mut items = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for (position, entry) in entries.into_iter().enumerate() {
        let mut item: Item = match serde_json::from_value(entry) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping snapshot entry {}: {}", position, e);
                skipped += 1;
                continue;
            }
        };

        if !seen.insert(item.id.clone()) {
            warn!("Skipping snapshot entry {}: duplicate id {}", position, item.id);
            skipped += 1;
            continue;
        }

        item.tags = normalize_tags(&item.tags);
        items.push(item);
    }

    if skipped > 0 {
        error!("Encountered {} unusable snapshot entries", skipped);
    }
    Some((items, skipped))
}

fn matches_query(item: &Item, query: &str) -> bool {
    let contains = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(query))
    };

    contains(&item.title)
        || contains(&item.body)
        || contains(&item.url)
        || item.tags.iter().any(|t| t.to_lowercase().contains(query))
}

/// Clones and orders by creation time, newest first. Equal timestamps keep
/// insertion order.
fn newest_first(mut items: Vec<&Item>) -> Vec<Item> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    items.into_iter().cloned().collect()
}
