//! In-memory [`VerificationStore`] with snapshot transactions and fault
//! injection, for exercising the procedures without Postgres.

use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::BTreeMap;

use otr_shared::errors::{AppError, AppResult};

use crate::models::{
    DataFetchStatus, NewAdminAction, RejectionReason, Transition, VerificationStatus, WarningFlags,
};
use crate::services::store::{CascadeLevel, VerificationStore};

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentRow {
    pub id: i32,
    pub verification_status: VerificationStatus,
    pub rejection_reason: RejectionReason,
    pub verified_by_user_id: Option<i32>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub id: i32,
    pub tournament_id: i32,
    pub verification_status: VerificationStatus,
    pub rejection_reason: RejectionReason,
    pub warning_flags: WarningFlags,
    pub verified_by_user_id: Option<i32>,
    pub data_fetch_status: DataFetchStatus,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameRow {
    pub id: i32,
    pub match_id: i32,
    pub verification_status: VerificationStatus,
    pub rejection_reason: RejectionReason,
    pub warning_flags: WarningFlags,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub id: i32,
    pub game_id: i32,
    pub verification_status: VerificationStatus,
    pub rejection_reason: RejectionReason,
    pub updated: Option<DateTime<Utc>>,
}

/// Level whose status update fails with a constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Tournament,
    Matches,
    Games,
    GameScores,
}

impl FailPoint {
    fn hits(self, level: &CascadeLevel<'_>) -> bool {
        matches!(
            (self, level),
            (Self::Tournament, CascadeLevel::Tournament(_))
                | (Self::Matches, CascadeLevel::Matches(_))
                | (Self::Games, CascadeLevel::Games(_))
                | (Self::GameScores, CascadeLevel::GameScores(_))
        )
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    tournaments: BTreeMap<i32, TournamentRow>,
    matches: BTreeMap<i32, MatchRow>,
    games: BTreeMap<i32, GameRow>,
    scores: BTreeMap<i32, ScoreRow>,
    admin_actions: Vec<NewAdminAction>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    fail_at: Option<FailPoint>,
}

impl MemoryStore {
    pub fn add_tournament(&mut self, id: i32, status: VerificationStatus) {
        self.tables.tournaments.insert(
            id,
            TournamentRow {
                id,
                verification_status: status,
                rejection_reason: RejectionReason::NONE,
                verified_by_user_id: None,
                updated: None,
            },
        );
    }

    pub fn add_match(&mut self, id: i32, tournament_id: i32, status: VerificationStatus) {
        self.tables.matches.insert(
            id,
            MatchRow {
                id,
                tournament_id,
                verification_status: status,
                rejection_reason: RejectionReason::NONE,
                warning_flags: WarningFlags::NONE,
                verified_by_user_id: None,
                data_fetch_status: DataFetchStatus::Fetched,
                updated: None,
            },
        );
    }

    pub fn add_game(&mut self, id: i32, match_id: i32, status: VerificationStatus) {
        self.tables.games.insert(
            id,
            GameRow {
                id,
                match_id,
                verification_status: status,
                rejection_reason: RejectionReason::NONE,
                warning_flags: WarningFlags::NONE,
                updated: None,
            },
        );
    }

    pub fn add_score(&mut self, id: i32, game_id: i32, status: VerificationStatus) {
        self.tables.scores.insert(
            id,
            ScoreRow {
                id,
                game_id,
                verification_status: status,
                rejection_reason: RejectionReason::NONE,
                updated: None,
            },
        );
    }

    pub fn fail_at(&mut self, point: FailPoint) {
        self.fail_at = Some(point);
    }

    pub fn tournament(&self, id: i32) -> &TournamentRow {
        &self.tables.tournaments[&id]
    }

    pub fn tournament_mut(&mut self, id: i32) -> &mut TournamentRow {
        self.tables.tournaments.get_mut(&id).expect("unknown tournament")
    }

    pub fn match_row(&self, id: i32) -> &MatchRow {
        &self.tables.matches[&id]
    }

    pub fn match_mut(&mut self, id: i32) -> &mut MatchRow {
        self.tables.matches.get_mut(&id).expect("unknown match")
    }

    pub fn game(&self, id: i32) -> &GameRow {
        &self.tables.games[&id]
    }

    pub fn game_mut(&mut self, id: i32) -> &mut GameRow {
        self.tables.games.get_mut(&id).expect("unknown game")
    }

    pub fn score(&self, id: i32) -> &ScoreRow {
        &self.tables.scores[&id]
    }

    pub fn score_mut(&mut self, id: i32) -> &mut ScoreRow {
        self.tables.scores.get_mut(&id).expect("unknown score")
    }

    pub fn admin_actions(&self) -> &[NewAdminAction] {
        &self.tables.admin_actions
    }

    /// Compares the four hierarchy tables, ignoring the audit trail.
    pub fn same_rows(&self, other: &MemoryStore) -> bool {
        self.tables.tournaments == other.tables.tournaments
            && self.tables.matches == other.tables.matches
            && self.tables.games == other.tables.games
            && self.tables.scores == other.tables.scores
    }
}

fn apply_status(
    status: &mut VerificationStatus,
    rejection_reason: &mut RejectionReason,
    transition: &Transition,
) {
    *status = transition.status;
    if transition.clears_rejection_reason {
        rejection_reason.clear();
    }
}

impl VerificationStore for MemoryStore {
    fn in_transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> AppResult<T>) -> AppResult<T> {
        let snapshot = self.tables.clone();
        let result = f(self);
        if result.is_err() {
            self.tables = snapshot;
        }
        result
    }

    fn transition(
        &mut self,
        level: CascadeLevel<'_>,
        from: &[VerificationStatus],
        transition: &Transition,
    ) -> AppResult<usize> {
        if self.fail_at.is_some_and(|point| point.hits(&level)) {
            return Err(AppError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::CheckViolation,
                Box::new(format!("injected failure at {}", level.name())),
            )));
        }

        let now = Some(Utc::now());
        let tables = &mut self.tables;
        let mut rows = 0;

        match level {
            CascadeLevel::Tournament(id) => {
                for row in tables.tournaments.values_mut() {
                    if row.id != id || !from.contains(&row.verification_status) {
                        continue;
                    }
                    apply_status(&mut row.verification_status, &mut row.rejection_reason, transition);
                    row.verified_by_user_id = transition.verified_by_user_id;
                    row.updated = now;
                    rows += 1;
                }
            }
            CascadeLevel::Matches(tournament_id) => {
                for row in tables.matches.values_mut() {
                    if row.tournament_id != tournament_id || !from.contains(&row.verification_status) {
                        continue;
                    }
                    apply_status(&mut row.verification_status, &mut row.rejection_reason, transition);
                    row.warning_flags.clear();
                    row.verified_by_user_id = transition.verified_by_user_id;
                    row.updated = now;
                    rows += 1;
                }
            }
            CascadeLevel::Games(match_ids) => {
                for row in tables.games.values_mut() {
                    if !match_ids.contains(&row.match_id) || !from.contains(&row.verification_status) {
                        continue;
                    }
                    apply_status(&mut row.verification_status, &mut row.rejection_reason, transition);
                    row.warning_flags.clear();
                    row.updated = now;
                    rows += 1;
                }
            }
            CascadeLevel::GameScores(game_ids) => {
                for row in tables.scores.values_mut() {
                    if !game_ids.contains(&row.game_id) || !from.contains(&row.verification_status) {
                        continue;
                    }
                    apply_status(&mut row.verification_status, &mut row.rejection_reason, transition);
                    row.updated = now;
                    rows += 1;
                }
            }
        }

        Ok(rows)
    }

    fn match_ids(&mut self, tournament_id: i32) -> AppResult<Vec<i32>> {
        Ok(self
            .tables
            .matches
            .values()
            .filter(|row| row.tournament_id == tournament_id)
            .map(|row| row.id)
            .collect())
    }

    fn game_ids(&mut self, match_ids: &[i32]) -> AppResult<Vec<i32>> {
        Ok(self
            .tables
            .games
            .values()
            .filter(|row| match_ids.contains(&row.match_id))
            .map(|row| row.id)
            .collect())
    }

    fn mark_matches_for_refetch(&mut self, tournament_id: i32) -> AppResult<usize> {
        let now = Some(Utc::now());
        let mut rows = 0;
        for row in self.tables.matches.values_mut() {
            if row.tournament_id == tournament_id {
                row.data_fetch_status = DataFetchStatus::NotFetched;
                row.updated = now;
                rows += 1;
            }
        }
        Ok(rows)
    }

    fn record_admin_action(&mut self, action: &NewAdminAction) -> AppResult<()> {
        self.tables.admin_actions.push(action.clone());
        Ok(())
    }
}
