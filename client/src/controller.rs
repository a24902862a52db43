//! Single writer for the plot-selection state: the roster, the caller's ranking, and the
//! assignment overlay.
//!
//! Network calls finish before any state is touched, so a result is either applied in one
//! step or discarded. Failures become [`Notification`]s and leave the state as it was.

use chrono::{DateTime, Utc};
use plotter_shared::interest::{self, InterestIndex};
use plotter_shared::ledger::{self, EditOutcome, LedgerError, OverwriteCheck, PriorityEdit};
use plotter_shared::{
    Assignment, AssignmentUpload, CommunitySettings, DisplayMode, LockTransition, Member,
    MemberUpdate, OverwriteAssignment, PlotData, PlotId, Reconciler,
};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient user-facing message produced by a controller operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
const ADMIN_ONLY: &str = "Only community admins can do that.";

pub struct Controller {
    api: ApiClient,
    store: SessionStore,
    session: Option<Session>,
    roster: Vec<Member>,
    reconciler: Reconciler,
    dirty: bool,
}

impl Controller {
    /// Fetch the roster (and the committed assignments of a locked community) for
    /// `session`. An unauthorized response clears the stored session.
    pub async fn load(
        api: ApiClient,
        store: SessionStore,
        session: Session,
    ) -> Result<Self, ApiError> {
        let fetched = Self::fetch_initial(&api, &session).await;
        let (roster, reconciler) = match fetched {
            Ok(loaded) => loaded,
            Err(e) => {
                if e.is_unauthorized() {
                    clear_store(&store);
                }
                return Err(e);
            }
        };

        let mut controller = Self {
            api,
            store,
            session: Some(session),
            roster,
            reconciler,
            dirty: false,
        };
        controller.ensure_own_member();
        info!(
            members = controller.roster.len(),
            mode = ?controller.reconciler.mode(),
            "community loaded"
        );
        Ok(controller)
    }

    async fn fetch_initial(
        api: &ApiClient,
        session: &Session,
    ) -> Result<(Vec<Member>, Reconciler), ApiError> {
        let mut reconciler = Reconciler::new(&session.user().community);
        if reconciler.is_locked() {
            let assignments = api.assignments(session).await?;
            if let Err(e) = reconciler.seed_locked(assignments) {
                warn!(error = %e, "could not seed assignment overlay");
            }
        }
        let mut roster = api.community(session).await?;
        repair_roster(&mut roster);
        Ok((roster, reconciler))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn roster(&self) -> &[Member] {
        &self.roster
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn mode(&self) -> DisplayMode {
        self.reconciler.mode()
    }

    pub fn overlay(&self) -> &[Assignment] {
        self.reconciler.overlay()
    }

    /// Whether local ranking edits are waiting for [`Controller::sync`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn interest_index(&self) -> InterestIndex {
        interest::build_interest_index(&self.roster)
    }

    pub fn own_member(&self) -> Option<&Member> {
        let battletag = self.session.as_ref()?.battletag();
        self.roster.iter().find(|member| member.battletag == battletag)
    }

    pub fn own_plot_data(&self) -> Option<&PlotData> {
        self.own_member().map(|member| &member.plot_data)
    }

    fn own_member_mut(&mut self) -> Option<&mut Member> {
        let battletag = self.session.as_ref()?.battletag().to_string();
        self.roster
            .iter_mut()
            .find(|member| member.battletag == battletag)
    }

    /// New members have no roster entry until their first sync.
    fn ensure_own_member(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if self.roster.iter().any(|m| m.battletag == session.battletag()) {
            return;
        }
        let user = session.user();
        self.roster.push(Member {
            battletag: user.battletag.clone(),
            char: user.char.clone(),
            note: user.note.clone(),
            plot_data: PlotData::new(),
        });
    }

    fn replace_roster(&mut self, mut roster: Vec<Member>) {
        repair_roster(&mut roster);
        self.roster = roster;
        self.ensure_own_member();
    }

    fn edit(&mut self, plot: PlotId, edit: PriorityEdit) -> Result<EditOutcome, LedgerError> {
        if self.session.is_none() {
            return Err(LedgerError::NoSession);
        }
        if !self.reconciler.edits_allowed() {
            return Err(LedgerError::Locked);
        }
        let member = self.own_member_mut().ok_or(LedgerError::NoSession)?;
        let outcome = ledger::apply(&mut member.plot_data, plot, edit)?;
        if outcome != EditOutcome::Unchanged {
            self.dirty = true;
        }
        debug!(?outcome, "ranking edited");
        Ok(outcome)
    }

    /// Map click: rank the plot with the lowest free priority, or drop it if ranked.
    pub fn click(&mut self, plot: u32) -> Result<EditOutcome, LedgerError> {
        let plot = ledger::plot_id(plot)?;
        let current = self.own_plot_data().cloned().unwrap_or_default();
        self.edit(plot, PriorityEdit::toggle(&current, plot))
    }

    pub fn deselect(&mut self, plot: u32) -> Result<EditOutcome, LedgerError> {
        let plot = ledger::plot_id(plot)?;
        self.edit(plot, PriorityEdit::Deselect)
    }

    /// Validate a targeted priority without applying it.
    pub fn check_priority(&self, plot: u32, priority: u32) -> Result<OverwriteCheck, LedgerError> {
        let plot = ledger::plot_id(plot)?;
        let empty = PlotData::new();
        let current = self.own_plot_data().unwrap_or(&empty);
        ledger::check_overwrite(current, plot, priority)
    }

    /// Targeted edit: give `plot` exactly `priority`, unranking the plot that held it.
    pub fn set_priority(&mut self, plot: u32, priority: u32) -> Result<EditOutcome, LedgerError> {
        let plot = ledger::plot_id(plot)?;
        let priority = ledger::priority(priority)?;
        self.edit(plot, PriorityEdit::Overwrite(priority))
    }

    /// Drop the whole ranking. Always leaves the session dirty.
    pub fn clear(&mut self) -> Result<usize, LedgerError> {
        if self.session.is_none() {
            return Err(LedgerError::NoSession);
        }
        if !self.reconciler.edits_allowed() {
            return Err(LedgerError::Locked);
        }
        let member = self.own_member_mut().ok_or(LedgerError::NoSession)?;
        let removed = ledger::clear(&mut member.plot_data);
        self.dirty = true;
        Ok(removed)
    }

    fn require_session(&self) -> Result<&Session, Notification> {
        self.session
            .as_ref()
            .ok_or_else(|| Notification::error(SESSION_EXPIRED))
    }

    fn require_admin(&self) -> Result<&Session, Notification> {
        let session = self.require_session()?;
        if session.is_admin() {
            Ok(session)
        } else {
            Err(Notification::error(ADMIN_ONLY))
        }
    }

    /// Map an API failure to a notification. An unauthorized response ends the session.
    fn fail(&mut self, e: ApiError, context: &str) -> Notification {
        if e.is_unauthorized() {
            warn!(error = %e, "session rejected by backend, logging out");
            self.session = None;
            clear_store(&self.store);
            return Notification::error(SESSION_EXPIRED);
        }
        warn!(error = %e, "{context}");
        Notification::error(format!("{context}: {e}"))
    }

    /// Push the caller's note and ranking to the backend.
    pub async fn sync(&mut self) -> Notification {
        if !self.dirty {
            return Notification::info("No pending changes.");
        }
        let session = match self.require_session() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        let Some(member) = self.own_member() else {
            return Notification::error("Error updating plot mapping.");
        };
        let update = MemberUpdate {
            note: member.note.clone(),
            plot_data: member.plot_data.clone(),
        };

        match self.api.update_member(session, &update).await {
            Ok(roster) => {
                if !roster.is_empty() {
                    self.replace_roster(roster);
                }
                self.dirty = false;
                info!(entries = update.plot_data.len(), "plot mapping synced");
                Notification::info("Plot mapping updated!")
            }
            Err(e) => self.fail(e, "Error updating plot mapping"),
        }
    }

    /// Re-fetch the roster, discarding unsynced local edits.
    pub async fn refresh(&mut self) -> Notification {
        let session = match self.require_session() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        match self.api.community(session).await {
            Ok(roster) => {
                self.replace_roster(roster);
                self.dirty = false;
                Notification::info("Community data refreshed.")
            }
            Err(e) => self.fail(e, "Failed to fetch community data"),
        }
    }

    /// Enter preview with fresh optimizer output, or leave it again.
    pub async fn toggle_preview(&mut self) -> Notification {
        if let Err(notification) = self.require_admin() {
            return notification;
        }
        if let Err(e) = self.reconciler.can_enter_preview() {
            return Notification::error(e.to_string());
        }
        if self.reconciler.is_previewing() {
            return match self.reconciler.leave_preview() {
                Ok(()) => Notification::info("Preview stopped."),
                Err(e) => Notification::error(e.to_string()),
            };
        }
        self.preview().await
    }

    /// Fetch optimizer output and show it as a non-committing overlay.
    pub async fn preview(&mut self) -> Notification {
        let session = match self.require_admin() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        if let Err(e) = self.reconciler.can_enter_preview() {
            return Notification::error(e.to_string());
        }
        match self.api.optimize(session).await {
            Ok(assignments) => {
                let count = assignments.len();
                match self.reconciler.enter_preview(assignments) {
                    Ok(()) => {
                        info!(count, "previewing optimizer output");
                        Notification::info("Previewing optimized assignments.")
                    }
                    Err(e) => Notification::error(e.to_string()),
                }
            }
            Err(e) => self.fail(e, "Optimizer failed"),
        }
    }

    /// Lock (run and commit the optimizer) or unlock the community.
    pub async fn toggle_lock(&mut self) -> Notification {
        let session = match self.require_admin() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        if let Err(e) = self.reconciler.can_toggle_lock() {
            return Notification::error(e.to_string());
        }
        match self.api.toggle_lock(session).await {
            Ok(assignments) => match self.reconciler.apply_lock_toggle(assignments) {
                Ok(LockTransition::Locked { assignments }) => {
                    info!(assignments, "community locked");
                    Notification::info("Displaying optimized assignments. Community locked.")
                }
                Ok(LockTransition::Unlocked) => {
                    info!("community unlocked");
                    Notification::info("Community unlocked.")
                }
                Err(e) => Notification::error(e.to_string()),
            },
            Err(e) => self.fail(e, "Optimizer failed"),
        }
    }

    /// Admin override of one plot's occupant. `input` is `"<battletag> [character]"`.
    pub async fn overwrite(&mut self, plot: u32, input: &str) -> Notification {
        let session = match self.require_admin() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        let plot = match ledger::plot_id(plot) {
            Ok(plot) => plot,
            Err(e) => return Notification::error(e.to_string()),
        };
        let Some(body) = OverwriteAssignment::parse(input, plot) else {
            return Notification::error("Enter the battletag of the new occupant.");
        };
        if let Err(e) = self.reconciler.can_finalize() {
            return Notification::error(e.to_string());
        }

        match self.api.overwrite_assignment(session, &body).await {
            Ok(stored) => {
                let assignment = stored.unwrap_or_else(|| body.into_assignment());
                let name = assignment.display_name().to_string();
                match self.reconciler.overwrite(assignment) {
                    Ok(effect) => {
                        info!(plot = plot.get(), member = %name, "plot overwritten");
                        let mut message = format!("Plot {plot} assigned to {name}.");
                        if let Some(replaced) = effect.replaced {
                            message.push_str(&format!(
                                " {} is no longer assigned.",
                                replaced.display_name()
                            ));
                        }
                        if let Some(from) = effect.moved_from {
                            message.push_str(&format!(" Plot {from} is now free."));
                        }
                        Notification::info(message)
                    }
                    Err(e) => Notification::error(e.to_string()),
                }
            }
            Err(e) => self.fail(e, "Overwrite failed"),
        }
    }

    /// Make the locked assignments permanent.
    pub async fn finalize(&mut self) -> Notification {
        let session = match self.require_admin() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        if let Err(e) = self.reconciler.can_finalize() {
            return Notification::error(e.to_string());
        }
        match self.api.finalize(session).await {
            Ok(()) => match self.reconciler.finalize() {
                Ok(()) => {
                    info!("assignments finalized");
                    Notification::info("Assignments finalized.")
                }
                Err(e) => Notification::error(e.to_string()),
            },
            Err(e) => self.fail(e, "Finalizing failed"),
        }
    }

    pub async fn settings(&mut self) -> Result<CommunitySettings, Notification> {
        let session = self.require_admin()?;
        match self.api.settings(session).await {
            Ok(settings) => Ok(settings),
            Err(e) => Err(self.fail(e, "Error reading community guidelines")),
        }
    }

    pub async fn update_settings(&mut self, settings: CommunitySettings) -> Notification {
        let session = match self.require_admin() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        match self.api.update_settings(session, &settings).await {
            Ok(()) => Notification::info("Community guidelines updated."),
            Err(e) => self.fail(e, "Error updating community guidelines"),
        }
    }

    /// Full community export, as served by the backend.
    pub async fn export(&mut self) -> Result<serde_json::Value, Notification> {
        let session = self.require_admin()?;
        match self.api.download(session).await {
            Ok(document) => Ok(document),
            Err(e) => Err(self.fail(e, "Download failed")),
        }
    }

    /// Replace every assignment of a locked community with `upload`.
    pub async fn upload(&mut self, upload: &AssignmentUpload) -> Notification {
        let session = match self.require_admin() {
            Ok(session) => session,
            Err(notification) => return notification,
        };
        if let Err(e) = self.reconciler.can_finalize() {
            return Notification::error(e.to_string());
        }
        match self.api.upload(session, upload).await {
            Ok(assignments) => {
                let count = assignments.len();
                match self.reconciler.replace_overlay(assignments) {
                    Ok(()) => Notification::info(format!("Uploaded {count} assignments.")),
                    Err(e) => Notification::error(e.to_string()),
                }
            }
            Err(e) => self.fail(e, "Upload failed"),
        }
    }
}

fn repair_roster(roster: &mut [Member]) {
    for member in roster.iter_mut() {
        let dropped = member.plot_data.repair();
        if !dropped.is_empty() {
            warn!(
                battletag = %member.battletag,
                dropped = dropped.len(),
                "dropped inconsistent plot priorities: {dropped:?}"
            );
        }
    }
}

fn clear_store(store: &SessionStore) {
    if let Err(e) = store.clear() {
        warn!(error = %e, path = %store.path().display(), "failed to clear session token");
    }
}
