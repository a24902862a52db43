//! Display state for server-provided assignments.
//!
//! The map shows either the member's own ranking or an assignment overlay. The overlay is
//! a read-only copy of what the server returned and never touches any member's ranking.

use std::fmt;

use crate::assignment::Assignment;
use crate::community::Community;
use crate::plot::PlotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// No overlay; the member's ranking is shown and editable.
    OwnPreferences,
    /// Non-committing optimizer output over an editable ranking.
    Preview,
    /// Committed assignments; ranking edits are rejected.
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileError {
    /// Preview cannot be entered or left while the community is locked.
    Locked,
    /// The operation only applies to a locked community.
    NotLocked,
    /// A finalized community cannot be unlocked or changed.
    Finalized,
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "Community is locked. Can't leave Preview Mode."),
            Self::NotLocked => write!(f, "Community is not locked."),
            Self::Finalized => write!(f, "Community assignments are finalized."),
        }
    }
}

impl std::error::Error for ReconcileError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTransition {
    Locked { assignments: usize },
    Unlocked,
}

/// Effect of an admin overwrite on the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverwriteEffect {
    /// Previous occupant of the target plot.
    pub replaced: Option<Assignment>,
    /// Plot the member held before being moved.
    pub moved_from: Option<PlotId>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    locked: bool,
    finalized: bool,
    previewing: bool,
    overlay: Vec<Assignment>,
}

impl Reconciler {
    /// Start from the community flags reported at session validation. A locked
    /// community still needs [`Reconciler::seed_locked`] to fill its overlay.
    pub fn new(community: &Community) -> Self {
        Self {
            locked: community.locked,
            finalized: community.finalized,
            previewing: false,
            overlay: Vec::new(),
        }
    }

    pub fn mode(&self) -> DisplayMode {
        if self.locked {
            DisplayMode::Locked
        } else if self.previewing {
            DisplayMode::Preview
        } else {
            DisplayMode::OwnPreferences
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_previewing(&self) -> bool {
        self.previewing
    }

    /// Ranking edits are accepted only while the community is unlocked.
    pub fn edits_allowed(&self) -> bool {
        !self.locked
    }

    /// Current overlay, sorted by plot. Empty in [`DisplayMode::OwnPreferences`].
    pub fn overlay(&self) -> &[Assignment] {
        &self.overlay
    }

    pub fn assignment_for_plot(&self, plot: PlotId) -> Option<&Assignment> {
        self.overlay.iter().find(|assignment| assignment.plot == plot)
    }

    pub fn assignment_for_member(&self, btag: &str) -> Option<&Assignment> {
        self.overlay.iter().find(|assignment| assignment.btag == btag)
    }

    fn set_overlay(&mut self, mut assignments: Vec<Assignment>) {
        assignments.sort_by_key(|assignment| assignment.plot);
        self.overlay = assignments;
    }

    /// Fill the overlay of an already locked community from `GET /community/assignments`.
    pub fn seed_locked(&mut self, assignments: Vec<Assignment>) -> Result<(), ReconcileError> {
        if !self.locked {
            return Err(ReconcileError::NotLocked);
        }
        self.set_overlay(assignments);
        Ok(())
    }

    /// Checked before fetching preview results.
    pub fn can_enter_preview(&self) -> Result<(), ReconcileError> {
        if self.locked {
            Err(ReconcileError::Locked)
        } else {
            Ok(())
        }
    }

    pub fn enter_preview(&mut self, assignments: Vec<Assignment>) -> Result<(), ReconcileError> {
        self.can_enter_preview()?;
        self.set_overlay(assignments);
        self.previewing = true;
        Ok(())
    }

    /// Drop the preview overlay and return to the member's own ranking.
    pub fn leave_preview(&mut self) -> Result<(), ReconcileError> {
        if self.locked {
            return Err(ReconcileError::Locked);
        }
        self.overlay.clear();
        self.previewing = false;
        Ok(())
    }

    /// Checked before calling the lock endpoint, which toggles server-side.
    pub fn can_toggle_lock(&self) -> Result<(), ReconcileError> {
        if self.finalized {
            Err(ReconcileError::Finalized)
        } else {
            Ok(())
        }
    }

    /// Apply the lock endpoint's response. Locking installs `assignments` as the
    /// authoritative overlay; unlocking clears the overlay and leaves preview.
    pub fn apply_lock_toggle(
        &mut self,
        assignments: Vec<Assignment>,
    ) -> Result<LockTransition, ReconcileError> {
        self.can_toggle_lock()?;
        if self.locked {
            self.locked = false;
            self.previewing = false;
            self.overlay.clear();
            Ok(LockTransition::Unlocked)
        } else {
            let count = assignments.len();
            self.locked = true;
            self.previewing = false;
            self.set_overlay(assignments);
            Ok(LockTransition::Locked { assignments: count })
        }
    }

    /// Admin override of a single plot. The plot's previous occupant loses it, and the
    /// member's previous plot (if any) is freed.
    pub fn overwrite(&mut self, assignment: Assignment) -> Result<OverwriteEffect, ReconcileError> {
        if !self.locked {
            return Err(ReconcileError::NotLocked);
        }
        if self.finalized {
            return Err(ReconcileError::Finalized);
        }

        let replaced = self
            .overlay
            .iter()
            .position(|existing| existing.plot == assignment.plot)
            .map(|idx| self.overlay.remove(idx));

        let moved_from = self
            .overlay
            .iter()
            .position(|existing| existing.btag == assignment.btag)
            .map(|idx| self.overlay.remove(idx).plot);

        self.overlay.push(assignment);
        self.overlay.sort_by_key(|existing| existing.plot);

        Ok(OverwriteEffect {
            replaced,
            moved_from,
        })
    }

    /// Replace the overlay with a bulk upload result.
    pub fn replace_overlay(&mut self, assignments: Vec<Assignment>) -> Result<(), ReconcileError> {
        if !self.locked {
            return Err(ReconcileError::NotLocked);
        }
        if self.finalized {
            return Err(ReconcileError::Finalized);
        }
        self.set_overlay(assignments);
        Ok(())
    }

    pub fn can_finalize(&self) -> Result<(), ReconcileError> {
        if !self.locked {
            Err(ReconcileError::NotLocked)
        } else if self.finalized {
            Err(ReconcileError::Finalized)
        } else {
            Ok(())
        }
    }

    pub fn finalize(&mut self) -> Result<(), ReconcileError> {
        self.can_finalize()?;
        self.finalized = true;
        Ok(())
    }
}
