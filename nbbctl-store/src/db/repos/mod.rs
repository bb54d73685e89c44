//! Repository implementations, one per entity
//!
//! Each repository follows these patterns:
//! - Borrows the session's connection; never begins, commits or rolls back
//! - Checks required keys first; a gap is a logged no-op, not an error
//! - Exactly one statement per operation
//! - Keyed entities: `ON CONFLICT (key) DO UPDATE` overwriting every
//!   mutable column (last write wins); event logs: plain INSERT

pub mod games;
pub mod play_by_play;
pub mod player_stats;
pub mod players;
pub mod shots;
pub mod teams;

pub use games::GameRepo;
pub use play_by_play::PlayByPlayRepo;
pub use player_stats::PlayerStatRepo;
pub use players::PlayerRepo;
pub use shots::ShotRepo;
pub use teams::TeamRepo;

use tracing::warn;

/// What a repository operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// One statement executed against the session
    Written,
    /// Required keys absent; nothing executed
    Skipped { missing: Vec<&'static str> },
}

impl Applied {
    pub fn is_written(&self) -> bool {
        matches!(self, Applied::Written)
    }
}

/// `Some(Skipped)` when any required key is missing.
fn precondition(
    table: &'static str,
    missing: Vec<&'static str>,
    describe: impl FnOnce() -> String,
) -> Option<Applied> {
    if missing.is_empty() {
        return None;
    }
    warn!(
        table,
        missing = %missing.join(", "),
        record = %describe(),
        "required keys missing, skipping write"
    );
    Some(Applied::Skipped { missing })
}
