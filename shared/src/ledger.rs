//! Priority bookkeeping for a single member's plot ranking.
//!
//! Clicking a plot toggles it: an unranked plot gets the lowest free priority, a ranked
//! plot is dropped. A targeted edit writes an explicit priority and evicts whichever plot
//! held that priority before.

use std::collections::HashSet;
use std::fmt;

use crate::member::PlotData;
use crate::plot::{OutOfRange, PlotId, Priority, TOTAL_PLOTS};

/// Smallest positive integer not present in `used`.
pub fn lowest_free(used: impl IntoIterator<Item = u32>) -> u32 {
    let used: HashSet<u32> = used.into_iter().collect();
    let mut candidate = 1;
    while used.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

/// Lowest priority this member has not used yet. Can exceed [`TOTAL_PLOTS`] only when
/// every priority is taken.
pub fn lowest_free_priority(plot_data: &PlotData) -> u32 {
    lowest_free(plot_data.priorities().map(Priority::get))
}

/// Plot currently holding `priority`, if any.
pub fn holder_of(plot_data: &PlotData, priority: Priority) -> Option<PlotId> {
    plot_data
        .iter()
        .find(|(_, held)| *held == priority)
        .map(|(plot, _)| plot)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityEdit {
    /// Rank the plot with the lowest free priority.
    Select,
    /// Drop the plot's ranking.
    Deselect,
    /// Rank the plot with an explicit priority, evicting its previous holder.
    Overwrite(Priority),
}

impl PriorityEdit {
    /// Resolve a map click on `plot` into a select or deselect.
    pub fn toggle(plot_data: &PlotData, plot: PlotId) -> Self {
        if plot_data.contains(plot) {
            Self::Deselect
        } else {
            Self::Select
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Selected {
        plot: PlotId,
        priority: Priority,
    },
    Deselected {
        plot: PlotId,
        priority: Priority,
    },
    Overwritten {
        plot: PlotId,
        priority: Priority,
        /// Priority the plot had before the edit.
        previous: Option<Priority>,
        /// Plot that held `priority` before and is now unranked.
        displaced: Option<PlotId>,
    },
    /// Nothing to do: selecting a ranked plot or deselecting an unranked one.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    PlotOutOfRange(OutOfRange),
    PriorityOutOfRange(OutOfRange),
    /// Every priority is in use, so there is no free one to select with.
    Exhausted,
    /// The community is locked; ranking edits are disabled.
    Locked,
    /// The session ended, so there is no ranking to edit.
    NoSession,
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlotOutOfRange(e) => write!(f, "plot {} does not exist on the map", e.value),
            Self::PriorityOutOfRange(e) => {
                write!(f, "priority {} is out of the accepted bounds 1..={TOTAL_PLOTS}", e.value)
            }
            Self::Exhausted => write!(f, "every priority is already in use"),
            Self::Locked => write!(
                f,
                "an admin has locked this community, plot selection is disabled"
            ),
            Self::NoSession => write!(f, "Session expired. Please log in again."),
        }
    }
}

impl std::error::Error for LedgerError {}

pub fn plot_id(value: u32) -> Result<PlotId, LedgerError> {
    PlotId::new(value).map_err(LedgerError::PlotOutOfRange)
}

pub fn priority(value: u32) -> Result<Priority, LedgerError> {
    Priority::new(value).map_err(LedgerError::PriorityOutOfRange)
}

/// Result of validating a targeted priority before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteCheck {
    /// The priority is free (or already on this plot) and can be applied directly.
    Free(Priority),
    /// Another plot holds the priority; applying it unranks that plot.
    Taken { priority: Priority, holder: PlotId },
}

impl OverwriteCheck {
    pub fn priority(self) -> Priority {
        match self {
            Self::Free(priority) | Self::Taken { priority, .. } => priority,
        }
    }

    pub fn needs_confirmation(self) -> bool {
        matches!(self, Self::Taken { .. })
    }
}

impl fmt::Display for OverwriteCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free(priority) => write!(f, "priority {priority} is free"),
            Self::Taken { priority, holder } => write!(
                f,
                "priority {priority} already assigned to plot {holder}, confirm to reassign (plot {holder} becomes unassigned)"
            ),
        }
    }
}

/// Validate a raw priority the user typed for `plot`.
pub fn check_overwrite(
    plot_data: &PlotData,
    plot: PlotId,
    raw: u32,
) -> Result<OverwriteCheck, LedgerError> {
    let wanted = priority(raw)?;
    Ok(match holder_of(plot_data, wanted) {
        Some(holder) if holder != plot => OverwriteCheck::Taken {
            priority: wanted,
            holder,
        },
        _ => OverwriteCheck::Free(wanted),
    })
}

/// Apply one edit to `plot_data`. On error nothing is changed.
pub fn apply(
    plot_data: &mut PlotData,
    plot: PlotId,
    edit: PriorityEdit,
) -> Result<EditOutcome, LedgerError> {
    if !plot.is_valid() {
        return Err(LedgerError::PlotOutOfRange(OutOfRange { value: plot.get() }));
    }

    match edit {
        PriorityEdit::Select => {
            if plot_data.contains(plot) {
                return Ok(EditOutcome::Unchanged);
            }
            let next = lowest_free_priority(plot_data);
            let priority = Priority::new(next).map_err(|_| LedgerError::Exhausted)?;
            plot_data.insert(plot, priority);
            Ok(EditOutcome::Selected { plot, priority })
        }
        PriorityEdit::Deselect => Ok(match plot_data.remove(plot) {
            Some(priority) => EditOutcome::Deselected { plot, priority },
            None => EditOutcome::Unchanged,
        }),
        PriorityEdit::Overwrite(priority) => {
            if !priority.is_valid() {
                return Err(LedgerError::PriorityOutOfRange(OutOfRange {
                    value: priority.get(),
                }));
            }
            let displaced = holder_of(plot_data, priority).filter(|holder| *holder != plot);
            if let Some(holder) = displaced {
                plot_data.remove(holder);
            }
            let previous = plot_data.insert(plot, priority);
            Ok(EditOutcome::Overwritten {
                plot,
                priority,
                previous,
                displaced,
            })
        }
    }
}

/// Click on a plot: select it if unranked, deselect it otherwise.
pub fn toggle(plot_data: &mut PlotData, plot: PlotId) -> Result<EditOutcome, LedgerError> {
    let edit = PriorityEdit::toggle(plot_data, plot);
    apply(plot_data, plot, edit)
}

/// Remove every ranking. Returns how many entries were dropped.
pub fn clear(plot_data: &mut PlotData) -> usize {
    let count = plot_data.len();
    plot_data.clear();
    count
}
