pub mod assignment;
pub mod colors;
pub mod community;
pub mod interest;
pub mod ledger;
pub mod member;
pub mod plot;
pub mod reconcile;

pub use assignment::*;
pub use colors::priority_color;
pub use community::*;
pub use interest::{InterestIndex, PlotInterest, build_interest_index};
pub use ledger::{EditOutcome, LedgerError, OverwriteCheck, PriorityEdit};
pub use member::*;
pub use plot::*;
pub use reconcile::{DisplayMode, LockTransition, OverwriteEffect, ReconcileError, Reconciler};
