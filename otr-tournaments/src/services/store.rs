use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::query_builder::{QueryFragment, QueryId};

use otr_shared::errors::AppResult;

use crate::models::{DataFetchStatus, NewAdminAction, Transition, VerificationStatus};
use crate::schema::{admin_actions, game_scores, games, matches, tournaments};

/// Rows one cascade step applies to, keyed by the parent id chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeLevel<'a> {
    /// The tournament row itself.
    Tournament(i32),
    /// Matches owned by the tournament.
    Matches(i32),
    /// Games owned by any of the match ids.
    Games(&'a [i32]),
    /// Scores owned by any of the game ids.
    GameScores(&'a [i32]),
}

impl CascadeLevel<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tournament(_) => "tournament",
            Self::Matches(_) => "match",
            Self::Games(_) => "game",
            Self::GameScores(_) => "game_score",
        }
    }
}

/// Persistence operations the verification procedures are scripted against.
pub trait VerificationStore {
    /// Runs `f` atomically; any error discards every write made inside it.
    fn in_transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> AppResult<T>) -> AppResult<T>;

    /// Applies `transition` to rows at `level` whose own current status is in
    /// `from`. Returns the number of rows written.
    fn transition(
        &mut self,
        level: CascadeLevel<'_>,
        from: &[VerificationStatus],
        transition: &Transition,
    ) -> AppResult<usize>;

    /// Every match id of the tournament, whatever its status.
    fn match_ids(&mut self, tournament_id: i32) -> AppResult<Vec<i32>>;

    /// Every game id under the given matches, whatever its status.
    fn game_ids(&mut self, match_ids: &[i32]) -> AppResult<Vec<i32>>;

    /// Flags every match of the tournament to be fetched again.
    fn mark_matches_for_refetch(&mut self, tournament_id: i32) -> AppResult<usize>;

    fn record_admin_action(&mut self, action: &NewAdminAction) -> AppResult<()>;
}

// Bulk UPDATE has no multi-table join form, so every level below the
// tournament is scoped by an id set gathered beforehand.
impl VerificationStore for PgConnection {
    fn in_transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> AppResult<T>) -> AppResult<T> {
        self.transaction(f)
    }

    fn transition(
        &mut self,
        level: CascadeLevel<'_>,
        from: &[VerificationStatus],
        transition: &Transition,
    ) -> AppResult<usize> {
        let now = Utc::now();

        let rows = match level {
            CascadeLevel::Tournament(id) => tournament_update(id, from, transition, now).execute(self)?,
            CascadeLevel::Matches(tournament_id) => {
                match_update(tournament_id, from, transition, now).execute(self)?
            }
            CascadeLevel::Games([]) | CascadeLevel::GameScores([]) => 0,
            CascadeLevel::Games(match_ids) => game_update(match_ids, from, transition, now).execute(self)?,
            CascadeLevel::GameScores(game_ids) => {
                game_score_update(game_ids, from, transition, now).execute(self)?
            }
        };

        tracing::debug!(level = level.name(), status = ?transition.status, rows, "status pass applied");
        Ok(rows)
    }

    fn match_ids(&mut self, tournament_id: i32) -> AppResult<Vec<i32>> {
        let ids = matches::table
            .filter(matches::tournament_id.eq(tournament_id))
            .select(matches::id)
            .load::<i32>(self)?;
        Ok(ids)
    }

    fn game_ids(&mut self, match_ids: &[i32]) -> AppResult<Vec<i32>> {
        if match_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = games::table
            .filter(games::match_id.eq_any(match_ids))
            .select(games::id)
            .load::<i32>(self)?;
        Ok(ids)
    }

    fn mark_matches_for_refetch(&mut self, tournament_id: i32) -> AppResult<usize> {
        let rows = refetch_update(tournament_id, Utc::now()).execute(self)?;
        Ok(rows)
    }

    fn record_admin_action(&mut self, action: &NewAdminAction) -> AppResult<()> {
        diesel::insert_into(admin_actions::table)
            .values(action)
            .execute(self)?;
        Ok(())
    }
}

// Status passes. Each level is scoped by its parent key and by the row's own
// current status, nothing else.

fn tournament_update(
    id: i32,
    from: &[VerificationStatus],
    transition: &Transition,
    now: DateTime<Utc>,
) -> impl QueryFragment<Pg> + QueryId + RunQueryDsl<PgConnection> {
    diesel::update(
        tournaments::table
            .filter(tournaments::id.eq(id))
            .filter(tournaments::verification_status.eq_any(from.to_vec())),
    )
    .set(transition.tournament_changes(now))
}

fn match_update(
    tournament_id: i32,
    from: &[VerificationStatus],
    transition: &Transition,
    now: DateTime<Utc>,
) -> impl QueryFragment<Pg> + QueryId + RunQueryDsl<PgConnection> {
    diesel::update(
        matches::table
            .filter(matches::tournament_id.eq(tournament_id))
            .filter(matches::verification_status.eq_any(from.to_vec())),
    )
    .set(transition.match_changes(now))
}

fn game_update(
    match_ids: &[i32],
    from: &[VerificationStatus],
    transition: &Transition,
    now: DateTime<Utc>,
) -> impl QueryFragment<Pg> + QueryId + RunQueryDsl<PgConnection> {
    diesel::update(
        games::table
            .filter(games::match_id.eq_any(match_ids.to_vec()))
            .filter(games::verification_status.eq_any(from.to_vec())),
    )
    .set(transition.game_changes(now))
}

fn game_score_update(
    game_ids: &[i32],
    from: &[VerificationStatus],
    transition: &Transition,
    now: DateTime<Utc>,
) -> impl QueryFragment<Pg> + QueryId + RunQueryDsl<PgConnection> {
    diesel::update(
        game_scores::table
            .filter(game_scores::game_id.eq_any(game_ids.to_vec()))
            .filter(game_scores::verification_status.eq_any(from.to_vec())),
    )
    .set(transition.game_score_changes(now))
}

fn refetch_update(
    tournament_id: i32,
    now: DateTime<Utc>,
) -> impl QueryFragment<Pg> + QueryId + RunQueryDsl<PgConnection> {
    diesel::update(matches::table.filter(matches::tournament_id.eq(tournament_id))).set((
        matches::data_fetch_status.eq(DataFetchStatus::NotFetched),
        matches::updated.eq(Some(now)),
    ))
}
