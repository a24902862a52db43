use std::collections::btree_map;
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::plot::{PlotId, Priority};

/// One member's ranking of plots: plot ID -> priority.
///
/// Serialized as a JSON object with stringified plot IDs as keys, e.g. `{"12": 1, "3": 2}`.
/// Decoding never fails on a bad entry: keys or values outside `1..=53` are set aside
/// and reported by [`PlotData::repair`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlotData {
    entries: BTreeMap<PlotId, Priority>,
    #[serde(skip)]
    malformed: Vec<(i64, i64)>,
}

/// An entry dropped by [`PlotData::repair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairedEntry {
    PlotOutOfRange { plot: i64, priority: i64 },
    PriorityOutOfRange { plot: PlotId, priority: i64 },
    DuplicatePriority { plot: PlotId, priority: Priority, kept: PlotId },
}

impl<'de> Deserialize<'de> for PlotData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<i64, i64>::deserialize(deserializer)?;
        let mut data = PlotData::new();
        for (plot, priority) in raw {
            let valid = u32::try_from(plot)
                .ok()
                .and_then(|plot| PlotId::new(plot).ok())
                .zip(
                    u32::try_from(priority)
                        .ok()
                        .and_then(|priority| Priority::new(priority).ok()),
                );
            match valid {
                Some((plot, priority)) => {
                    data.entries.insert(plot, priority);
                }
                None => data.malformed.push((plot, priority)),
            }
        }
        Ok(data)
    }
}

impl PlotData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, plot: PlotId) -> Option<Priority> {
        self.entries.get(&plot).copied()
    }

    pub fn contains(&self, plot: PlotId) -> bool {
        self.entries.contains_key(&plot)
    }

    /// Plots in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (PlotId, Priority)> + '_ {
        self.entries.iter().map(|(plot, priority)| (*plot, *priority))
    }

    pub fn priorities(&self) -> impl Iterator<Item = Priority> + '_ {
        self.entries.values().copied()
    }

    /// Entries sorted by priority (most wanted first).
    pub fn ranked(&self) -> Vec<(PlotId, Priority)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by_key(|(plot, priority)| (*priority, *plot));
        ranked
    }

    pub(crate) fn insert(&mut self, plot: PlotId, priority: Priority) -> Option<Priority> {
        self.entries.insert(plot, priority)
    }

    pub(crate) fn remove(&mut self, plot: PlotId) -> Option<Priority> {
        self.entries.remove(&plot)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries that break the ledger invariants: plot or priority outside the map
    /// range, and repeated priorities. For a repeated priority the lowest plot ID keeps it.
    pub fn repair(&mut self) -> Vec<RepairedEntry> {
        let mut dropped: Vec<RepairedEntry> = self
            .malformed
            .drain(..)
            .map(|(plot, priority)| {
                match u32::try_from(plot).ok().and_then(|id| PlotId::new(id).ok()) {
                    Some(plot) => RepairedEntry::PriorityOutOfRange { plot, priority },
                    None => RepairedEntry::PlotOutOfRange { plot, priority },
                }
            })
            .collect();
        let mut holders: BTreeMap<Priority, PlotId> = BTreeMap::new();

        self.entries.retain(|plot, priority| match holders.entry(*priority) {
            btree_map::Entry::Occupied(kept) => {
                dropped.push(RepairedEntry::DuplicatePriority {
                    plot: *plot,
                    priority: *priority,
                    kept: *kept.get(),
                });
                false
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(*plot);
                true
            }
        });

        dropped
    }

    /// Priority values held by more than one plot, ascending.
    pub fn duplicate_priorities(&self) -> Vec<Priority> {
        let mut seen = HashSet::new();
        let mut duplicates: Vec<Priority> = self
            .priorities()
            .filter(|priority| !seen.insert(*priority))
            .collect();
        duplicates.sort();
        duplicates.dedup();
        duplicates
    }
}

impl FromIterator<(PlotId, Priority)> for PlotData {
    fn from_iter<T: IntoIterator<Item = (PlotId, Priority)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            malformed: Vec::new(),
        }
    }
}

/// A community member as returned by `GET /community`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub battletag: String,
    #[serde(default)]
    pub char: String,
    #[serde(default)]
    pub note: String,
    #[serde(
        rename = "plotData",
        default,
        deserialize_with = "deserialize_plot_data"
    )]
    pub plot_data: PlotData,
}

impl Member {
    /// Character name if known, otherwise the battletag.
    pub fn display_name(&self) -> &str {
        if self.char.is_empty() {
            &self.battletag
        } else {
            &self.char
        }
    }
}

fn deserialize_plot_data<'de, D>(deserializer: D) -> Result<PlotData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PlotData>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope used by `GET /community` and `POST /user/update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub members: Vec<Member>,
}

/// Body of `POST /user/update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub note: String,
    #[serde(rename = "plotData")]
    pub plot_data: PlotData,
}
