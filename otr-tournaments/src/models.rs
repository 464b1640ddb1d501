use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Integer;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::ops::BitOr;

use crate::schema::{admin_actions, game_scores, games, matches, tournaments};

/// Maps an `i32`-convertible type onto a Postgres `INTEGER` column.
macro_rules! integer_sql {
    ($ty:ty) => {
        impl ToSql<Integer, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(&i32::from(*self).to_be_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Integer, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <i32 as FromSql<Integer, Pg>>::from_sql(bytes)?;
                <$ty>::try_from(raw).map_err(Into::into)
            }
        }
    };
}

// --- VerificationStatus ---

/// Review state shared by tournaments, matches, games and scores.
///
/// `Pre*` values are written by automated checks and only become final
/// through an admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Integer)]
#[serde(rename_all = "camelCase")]
pub enum VerificationStatus {
    None,
    PreRejected,
    PreVerified,
    Rejected,
    Verified,
}

impl VerificationStatus {
    pub const PROVISIONAL: [Self; 2] = [Self::PreRejected, Self::PreVerified];
    pub const ASSIGNED: [Self; 4] = [Self::PreRejected, Self::PreVerified, Self::Rejected, Self::Verified];
}

impl From<VerificationStatus> for i32 {
    fn from(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::None => 0,
            VerificationStatus::PreRejected => 1,
            VerificationStatus::PreVerified => 2,
            VerificationStatus::Rejected => 3,
            VerificationStatus::Verified => 4,
        }
    }
}

impl TryFrom<i32> for VerificationStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::PreRejected),
            2 => Ok(Self::PreVerified),
            3 => Ok(Self::Rejected),
            4 => Ok(Self::Verified),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

integer_sql!(VerificationStatus);

// --- DataFetchStatus ---

/// Progress of the external match data fetcher. A refetch puts matches back
/// to `NotFetched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Integer)]
#[serde(rename_all = "camelCase")]
pub enum DataFetchStatus {
    NotFetched,
    Fetching,
    Fetched,
    NotFound,
    Failed,
}

impl From<DataFetchStatus> for i32 {
    fn from(status: DataFetchStatus) -> Self {
        match status {
            DataFetchStatus::NotFetched => 0,
            DataFetchStatus::Fetching => 1,
            DataFetchStatus::Fetched => 2,
            DataFetchStatus::NotFound => 3,
            DataFetchStatus::Failed => 4,
        }
    }
}

impl TryFrom<i32> for DataFetchStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotFetched),
            1 => Ok(Self::Fetching),
            2 => Ok(Self::Fetched),
            3 => Ok(Self::NotFound),
            4 => Ok(Self::Failed),
            other => Err(format!("unknown data fetch status: {other}")),
        }
    }
}

integer_sql!(DataFetchStatus);

// --- Bit flags ---

macro_rules! bit_flags {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$flag_meta:meta])* const $flag:ident = $value:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
        #[diesel(sql_type = Integer)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            pub const NONE: Self = Self(0);
            $( $(#[$flag_meta])* pub const $flag: Self = Self($value); )*

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Drops every flag. Every path that resets a status calls this.
            pub fn clear(&mut self) {
                *self = Self::NONE;
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl From<i32> for $name {
            fn from(bits: i32) -> Self {
                Self(bits)
            }
        }

        impl From<$name> for i32 {
            fn from(flags: $name) -> Self {
                flags.0
            }
        }

        integer_sql!($name);
    };
}

bit_flags! {
    /// Why automated checks rejected an entity.
    RejectionReason {
        const NO_DATA = 1 << 0;
        const NO_VERIFIED_CHILDREN = 1 << 1;
        const NOT_ENOUGH_VERIFIED_CHILDREN = 1 << 2;
        const ABNORMAL_FORMAT = 1 << 3;
        const INCOMPLETE_DATA = 1 << 4;
        /// Cascaded from a rejected parent.
        const REJECTED_PARENT = 1 << 5;
    }
}

bit_flags! {
    /// Non-fatal findings from automated checks on matches and games.
    WarningFlags {
        const UNEXPECTED_TITLE_FORMAT = 1 << 0;
        const UNEXPECTED_GAME_COUNT = 1 << 1;
        const LOW_GAME_COUNT = 1 << 2;
        const BEATMAP_USED_ONCE = 1 << 3;
    }
}

// --- Transitions ---

/// Values one filtered status pass writes to every row it matches.
///
/// Warning flags are always cleared where the level carries them; the
/// verifier is written only on tournaments and matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: VerificationStatus,
    pub verified_by_user_id: Option<i32>,
    pub clears_rejection_reason: bool,
}

impl Transition {
    /// Back to `None` with every auxiliary field cleared.
    pub fn reset() -> Self {
        Self {
            status: VerificationStatus::None,
            verified_by_user_id: None,
            clears_rejection_reason: true,
        }
    }

    /// Admin confirmation of a provisional status.
    pub fn finalize(status: VerificationStatus, admin_user_id: i32) -> Self {
        Self {
            status,
            verified_by_user_id: Some(admin_user_id),
            clears_rejection_reason: false,
        }
    }

    fn rejection_reason(&self) -> Option<RejectionReason> {
        self.clears_rejection_reason.then_some(RejectionReason::NONE)
    }

    fn warning_flags(&self) -> WarningFlags {
        WarningFlags::NONE
    }

    pub fn tournament_changes(&self, now: DateTime<Utc>) -> TournamentChanges {
        TournamentChanges {
            verification_status: self.status,
            rejection_reason: self.rejection_reason(),
            verified_by_user_id: Some(self.verified_by_user_id),
            updated: Some(now),
        }
    }

    pub fn match_changes(&self, now: DateTime<Utc>) -> MatchChanges {
        MatchChanges {
            verification_status: self.status,
            rejection_reason: self.rejection_reason(),
            warning_flags: self.warning_flags(),
            verified_by_user_id: Some(self.verified_by_user_id),
            updated: Some(now),
        }
    }

    pub fn game_changes(&self, now: DateTime<Utc>) -> GameChanges {
        GameChanges {
            verification_status: self.status,
            rejection_reason: self.rejection_reason(),
            warning_flags: self.warning_flags(),
            updated: Some(now),
        }
    }

    pub fn game_score_changes(&self, now: DateTime<Utc>) -> GameScoreChanges {
        GameScoreChanges {
            verification_status: self.status,
            rejection_reason: self.rejection_reason(),
            updated: Some(now),
        }
    }
}

// --- Changesets ---
//
// `None` fields are left untouched; `Some(None)` writes NULL.

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tournaments)]
pub struct TournamentChanges {
    pub verification_status: VerificationStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub verified_by_user_id: Option<Option<i32>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = matches)]
pub struct MatchChanges {
    pub verification_status: VerificationStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub warning_flags: WarningFlags,
    pub verified_by_user_id: Option<Option<i32>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = games)]
pub struct GameChanges {
    pub verification_status: VerificationStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub warning_flags: WarningFlags,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = game_scores)]
pub struct GameScoreChanges {
    pub verification_status: VerificationStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub updated: Option<DateTime<Utc>>,
}

// --- AdminAction ---

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = admin_actions)]
pub struct NewAdminAction {
    pub admin_user_id: i32,
    pub action: String,
    pub tournament_id: Option<i32>,
    pub details: Option<serde_json::Value>,
}
