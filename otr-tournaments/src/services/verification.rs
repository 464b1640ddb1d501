//! Tournament-wide verification status procedures.
//!
//! Each procedure is a single transaction walking the hierarchy top-down:
//! tournament, its matches, their games, then those games' scores. Every level
//! is filtered on the row's own current status, never on what happened to its
//! parent, and the id sets used to scope the next level are collected
//! unconditionally.

use serde::Serialize;

use otr_shared::errors::AppResult;
use otr_shared::types::auth::AdminSession;

use crate::models::{NewAdminAction, Transition, VerificationStatus};
use crate::services::store::{CascadeLevel, VerificationStore};

/// Rows written per level by one procedure. Used for the audit trail and
/// logs only; callers of the procedures never see it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeCounts {
    pub tournaments: usize,
    pub matches: usize,
    pub games: usize,
    pub game_scores: usize,
}

impl CascadeCounts {
    pub fn total(&self) -> usize {
        self.tournaments + self.matches + self.games + self.game_scores
    }
}

/// Statuses a reset is allowed to touch.
pub fn reset_eligible_statuses(override_verified_state: bool) -> &'static [VerificationStatus] {
    if override_verified_state {
        &VerificationStatus::ASSIGNED
    } else {
        &VerificationStatus::PROVISIONAL
    }
}

/// Returns the tournament and its descendants to `None`, limited to rows whose
/// status is reset-eligible. Finalized rows are only touched when
/// `override_verified_state` is set.
pub fn reset_automated_checks<S: VerificationStore>(
    store: &mut S,
    admin: AdminSession,
    tournament_id: i32,
    override_verified_state: bool,
) -> AppResult<CascadeCounts> {
    let eligible = reset_eligible_statuses(override_verified_state);
    let reset = Transition::reset();

    store.in_transaction(|tx| {
        let tournaments = tx.transition(CascadeLevel::Tournament(tournament_id), eligible, &reset)?;
        let matches = tx.transition(CascadeLevel::Matches(tournament_id), eligible, &reset)?;

        let match_ids = tx.match_ids(tournament_id)?;
        let games = tx.transition(CascadeLevel::Games(&match_ids), eligible, &reset)?;

        let game_ids = tx.game_ids(&match_ids)?;
        let game_scores = tx.transition(CascadeLevel::GameScores(&game_ids), eligible, &reset)?;

        let counts = CascadeCounts {
            tournaments,
            matches,
            games,
            game_scores,
        };

        tx.record_admin_action(&NewAdminAction {
            admin_user_id: admin.admin_user_id,
            action: "reset_automated_checks".to_string(),
            tournament_id: Some(tournament_id),
            details: Some(serde_json::json!({
                "override_verified_state": override_verified_state,
                "rows": counts,
            })),
        })?;

        Ok(counts)
    })
}

/// Confirms every provisional status under the tournament: `PreVerified`
/// becomes `Verified` and `PreRejected` becomes `Rejected`, attributed to
/// the acting admin. A tournament id that does not exist touches nothing.
pub fn accept_pre_verification_statuses<S: VerificationStore>(
    store: &mut S,
    admin: AdminSession,
    tournament_id: i32,
) -> AppResult<CascadeCounts> {
    let verify = Transition::finalize(VerificationStatus::Verified, admin.admin_user_id);
    let reject = Transition::finalize(VerificationStatus::Rejected, admin.admin_user_id);

    store.in_transaction(|tx| {
        let tournaments = promote(tx, CascadeLevel::Tournament(tournament_id), &verify, &reject)?;
        let matches = promote(tx, CascadeLevel::Matches(tournament_id), &verify, &reject)?;

        let match_ids = tx.match_ids(tournament_id)?;
        let games = promote(tx, CascadeLevel::Games(&match_ids), &verify, &reject)?;

        let game_ids = tx.game_ids(&match_ids)?;
        let game_scores = promote(tx, CascadeLevel::GameScores(&game_ids), &verify, &reject)?;

        let counts = CascadeCounts {
            tournaments,
            matches,
            games,
            game_scores,
        };

        tx.record_admin_action(&NewAdminAction {
            admin_user_id: admin.admin_user_id,
            action: "accept_pre_verification_statuses".to_string(),
            tournament_id: Some(tournament_id),
            details: Some(serde_json::json!({ "rows": counts })),
        })?;

        Ok(counts)
    })
}

/// Verify pass then reject pass over one level.
fn promote<S: VerificationStore>(
    tx: &mut S,
    level: CascadeLevel<'_>,
    verify: &Transition,
    reject: &Transition,
) -> AppResult<usize> {
    let verified = tx.transition(level, &[VerificationStatus::PreVerified], verify)?;
    let rejected = tx.transition(level, &[VerificationStatus::PreRejected], reject)?;
    Ok(verified + rejected)
}

/// Queues every match of the tournament for a fresh data fetch and reports
/// how many were queued.
pub fn refetch_match_data<S: VerificationStore>(
    store: &mut S,
    admin: AdminSession,
    tournament_id: i32,
) -> AppResult<usize> {
    store.in_transaction(|tx| {
        let count = tx.mark_matches_for_refetch(tournament_id)?;

        tx.record_admin_action(&NewAdminAction {
            admin_user_id: admin.admin_user_id,
            action: "refetch_match_data".to_string(),
            tournament_id: Some(tournament_id),
            details: Some(serde_json::json!({ "matches": count })),
        })?;

        Ok(count)
    })
}
