//! The shared registry index and the algorithms that merge into it.
//!
//! The index lists every known version of every kit and suite, plus the
//! last few publish events. Publishers never replace it wholesale: they
//! fetch the remote copy, upsert their own versions per name and per
//! version, and write the result back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::Chart;
use crate::types::{PackageKind, PackageName};

/// Schema version written into every index this crate produces.
pub const INDEX_VERSION: &str = "v1";

/// Upper bound on the publish history kept in [`Index::authors`].
pub const MAX_AUTHORS: usize = 5;

/// Version lists keyed by package name.
pub type ChartMap = BTreeMap<PackageName, Vec<Chart>>;

/// One publish event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Login name of whoever ran the publish.
    #[serde(default)]
    pub name: String,
    /// Operating system the publish ran on.
    #[serde(default)]
    pub platform: String,
    /// Public IPv4 address, empty when the lookup failed or was disabled.
    #[serde(default)]
    pub ip: String,
    /// When the publish happened.
    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,
}

impl Author {
    /// Author stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        platform: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            ip: ip.into(),
            generated: Utc::now(),
        }
    }
}

/// The registry document stored at `<prefix>/index.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Schema version of the document.
    #[serde(default = "default_version")]
    pub version: String,
    /// Every kit version, newest first per name.
    #[serde(default)]
    pub kits: ChartMap,
    /// Every suite version, newest first per name.
    #[serde(default)]
    pub suites: ChartMap,
    /// Recent publish events, newest first.
    #[serde(default)]
    pub authors: Vec<Author>,
}

fn default_version() -> String {
    INDEX_VERSION.to_string()
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Index {
    /// An empty index at the current schema version.
    pub fn new() -> Self {
        Self {
            version: default_version(),
            kits: ChartMap::new(),
            suites: ChartMap::new(),
            authors: Vec::new(),
        }
    }

    /// Parse an index from YAML.
    ///
    /// # Errors
    ///
    /// Returns the `serde_yaml` error for malformed documents.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize the index as YAML.
    ///
    /// # Errors
    ///
    /// Returns the `serde_yaml` error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// The version map for one package kind.
    pub fn entries(&self, kind: PackageKind) -> &ChartMap {
        match kind {
            PackageKind::Kit => &self.kits,
            PackageKind::Suite => &self.suites,
        }
    }

    /// Mutable version map for one package kind.
    pub fn entries_mut(&mut self, kind: PackageKind) -> &mut ChartMap {
        match kind {
            PackageKind::Kit => &mut self.kits,
            PackageKind::Suite => &mut self.suites,
        }
    }

    /// Versions recorded for `name`, newest first.
    pub fn versions(&self, kind: PackageKind, name: &str) -> Option<&[Chart]> {
        self.entries(kind).get(name).map(Vec::as_slice)
    }

    /// Upsert one chart and keep its version list sorted.
    pub fn insert(&mut self, kind: PackageKind, chart: Chart) {
        let list = self.entries_mut(kind).entry(chart.name.clone()).or_default();
        merge_versions(list, vec![chart]);
        sort_descending(list);
    }

    /// Total number of chart entries across both kinds.
    pub fn len(&self) -> usize {
        self.kits.values().chain(self.suites.values()).map(Vec::len).sum()
    }

    /// True when neither map holds any chart.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge a publisher's partial index into this one.
    ///
    /// Both kinds go through [`merge_names`]; authors are left alone, use
    /// [`Index::rotate_author`] to record the publish.
    pub fn merge(&mut self, incoming: Index) {
        merge_names(&mut self.kits, incoming.kits);
        merge_names(&mut self.suites, incoming.suites);
    }

    /// Record a publish event at the head of the author history.
    pub fn rotate_author(&mut self, author: Author) {
        rotate_authors(&mut self.authors, author);
    }
}

/// Upsert `incoming` into `existing` by version.
///
/// A chart whose version is already present replaces that entry in place;
/// anything else is appended. Versions only present in `existing` are
/// kept. Call [`sort_descending`] afterwards to restore ordering.
pub fn merge_versions(existing: &mut Vec<Chart>, incoming: Vec<Chart>) {
    for chart in incoming {
        match existing.iter_mut().find(|c| c.version == chart.version) {
            Some(slot) => *slot = chart,
            None => existing.push(chart),
        }
    }
}

/// Sort newest version first. Stable for equal versions.
pub fn sort_descending(list: &mut [Chart]) {
    list.sort_by(|a, b| b.version.cmp(&a.version));
}

/// Merge `incoming` name lists into `remote`.
///
/// Names present on both sides get a per-version upsert followed by a
/// descending sort. New names are inserted and sorted. Names present only
/// in `remote` are not touched.
pub fn merge_names(remote: &mut ChartMap, incoming: ChartMap) {
    for (name, charts) in incoming {
        match remote.get_mut(&name) {
            Some(existing) => {
                merge_versions(existing, charts);
                sort_descending(existing);
            }
            None => {
                let mut charts = charts;
                sort_descending(&mut charts);
                remote.insert(name, charts);
            }
        }
    }
}

/// Prepend `author` and cap the history at [`MAX_AUTHORS`].
pub fn rotate_authors(authors: &mut Vec<Author>, author: Author) {
    authors.insert(0, author);
    authors.truncate(MAX_AUTHORS);
}
