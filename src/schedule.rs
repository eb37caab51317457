use {
    anyhow::anyhow,
    enum_iterator::{
        Sequence,
        all,
    },
    rocket::{
        form::{
            self,
            FromFormField,
            ValueField,
        },
        request::FromParam,
    },
    sqlx::{
        Decode,
        Encode,
        QueryBuilder,
        postgres::{
            PgArgumentBuffer,
            PgTypeInfo,
            PgValueRef,
        },
    },
    std::str::FromStr,
    crate::prelude::*,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error("winner {winner:?} is not a participant of match {id}")]
    WinnerNotAParticipant {
        id: i64,
        winner: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Stage {
    League,
    Semifinal,
    Final,
    ThirdPlace,
}

impl Stage {
    pub(crate) fn slug(&self) -> &'static str {
        match self {
            Self::League => "league",
            Self::Semifinal => "semifinal",
            Self::Final => "final",
            Self::ThirdPlace => "third_place",
        }
    }
}

impl FromStr for Stage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        all::<Self>().find(|stage| stage.slug() == s).ok_or(())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl<'r> Decode<'r, Postgres> for Stage {
    fn decode(value: PgValueRef<'r>) -> Result<Self, Box<dyn std::error::Error + 'static + Send + Sync>> {
        let stage = <&str as Decode<'_, Postgres>>::decode(value)?;
        stage.parse().map_err(|()| anyhow!("unknown match stage: {stage}").into())
    }
}

impl<'q> Encode<'q, Postgres> for Stage {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Encode::<Postgres>::encode_by_ref(&self.slug(), buf)
    }

    fn encode(self, buf: &mut PgArgumentBuffer) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Encode::<Postgres>::encode(self.slug(), buf)
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Encode::<Postgres>::produces(&self.slug())
    }

    fn size_hint(&self) -> usize {
        Encode::<Postgres>::size_hint(&self.slug())
    }
}

impl sqlx::Type<Postgres> for Stage {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'a> FromParam<'a> for Stage {
    type Error = &'a str;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse().map_err(|()| param)
    }
}

impl<'v> FromFormField<'v> for Stage {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        field.value.parse().map_err(|()| form::Error::validation("unknown match stage").into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MatchStatus {
    Upcoming,
    Live,
    Completed,
}

impl MatchStatus {
    pub(crate) fn slug(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Live => "live",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        all::<Self>().find(|status| status.slug() == s).ok_or(())
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl<'r> Decode<'r, Postgres> for MatchStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, Box<dyn std::error::Error + 'static + Send + Sync>> {
        let status = <&str as Decode<'_, Postgres>>::decode(value)?;
        status.parse().map_err(|()| anyhow!("unknown match status: {status}").into())
    }
}

impl<'q> Encode<'q, Postgres> for MatchStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Encode::<Postgres>::encode_by_ref(&self.slug(), buf)
    }

    fn encode(self, buf: &mut PgArgumentBuffer) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Encode::<Postgres>::encode(self.slug(), buf)
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Encode::<Postgres>::produces(&self.slug())
    }

    fn size_hint(&self) -> usize {
        Encode::<Postgres>::size_hint(&self.slug())
    }
}

impl sqlx::Type<Postgres> for MatchStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'v> FromFormField<'v> for MatchStatus {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        field.value.parse().map_err(|()| form::Error::validation("unknown match status").into())
    }
}

/// One fixture of the championship. Participants are referenced by clan name,
/// matching how the stored data keys them.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub(crate) struct Match {
    pub(crate) id: i64,
    pub(crate) sport: String,
    pub(crate) stage: Stage,
    pub(crate) status: MatchStatus,
    pub(crate) clan1: String,
    pub(crate) clan2: String,
    pub(crate) scheduled_for: DateTime<Utc>,
    pub(crate) venue: Option<String>,
    pub(crate) clan1_score: Option<i32>,
    pub(crate) clan2_score: Option<i32>,
    pub(crate) winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct NewMatch {
    pub(crate) sport: String,
    pub(crate) stage: Stage,
    pub(crate) clan1: String,
    pub(crate) clan2: String,
    pub(crate) scheduled_for: DateTime<Utc>,
    pub(crate) venue: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MatchUpdate {
    pub(crate) scheduled_for: Option<DateTime<Utc>>,
    pub(crate) venue: Option<String>,
    pub(crate) status: Option<MatchStatus>,
}

impl Match {
    pub(crate) async fn scheduled(transaction: &mut Transaction<'_, Postgres>, stage: Option<Stage>, status: Option<MatchStatus>) -> Result<Vec<Self>, Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, sport, stage, status, clan1, clan2, scheduled_for, venue, clan1_score, clan2_score, winner FROM matches");
        let mut separator = " WHERE ";
        if let Some(stage) = stage {
            builder.push(separator).push("stage = ").push_bind(stage);
            separator = " AND ";
        }
        if let Some(status) = status {
            builder.push(separator).push("status = ").push_bind(status);
        }
        builder.push(" ORDER BY scheduled_for, id");
        Ok(builder.build_query_as::<Self>().fetch_all(&mut **transaction).await?)
    }

    pub(crate) async fn from_id(transaction: &mut Transaction<'_, Postgres>, id: i64) -> Result<Option<Self>, Error> {
        Ok(
            sqlx::query_as::<_, Self>("SELECT id, sport, stage, status, clan1, clan2, scheduled_for, venue, clan1_score, clan2_score, winner FROM matches WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut **transaction)
                .await?
        )
    }

    /// Every match that can award medals: completed finals and third-place
    /// playoffs. The standings recalculation runs over exactly this set.
    pub(crate) async fn completed_podium(transaction: &mut Transaction<'_, Postgres>) -> Result<Vec<Self>, Error> {
        Ok(
            sqlx::query_as::<_, Self>("SELECT id, sport, stage, status, clan1, clan2, scheduled_for, venue, clan1_score, clan2_score, winner FROM matches WHERE stage IN ('final', 'third_place') AND status = 'completed' ORDER BY id")
                .fetch_all(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn create(transaction: &mut Transaction<'_, Postgres>, new_match: &NewMatch) -> Result<Self, Error> {
        Ok(
            sqlx::query_as::<_, Self>("INSERT INTO matches (sport, stage, status, clan1, clan2, scheduled_for, venue) VALUES ($1, $2, 'upcoming', $3, $4, $5, $6) RETURNING id, sport, stage, status, clan1, clan2, scheduled_for, venue, clan1_score, clan2_score, winner")
                .bind(&new_match.sport)
                .bind(new_match.stage)
                .bind(&new_match.clan1)
                .bind(&new_match.clan2)
                .bind(new_match.scheduled_for)
                .bind(&new_match.venue)
                .fetch_one(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn update(&self, transaction: &mut Transaction<'_, Postgres>, update: &MatchUpdate) -> Result<Self, Error> {
        Ok(
            sqlx::query_as::<_, Self>("UPDATE matches SET scheduled_for = $1, venue = $2, status = $3 WHERE id = $4 RETURNING id, sport, stage, status, clan1, clan2, scheduled_for, venue, clan1_score, clan2_score, winner")
                .bind(update.scheduled_for.unwrap_or(self.scheduled_for))
                .bind(update.venue.as_deref().or(self.venue.as_deref()))
                .bind(update.status.unwrap_or(self.status))
                .bind(self.id)
                .fetch_one(&mut **transaction)
                .await?
        )
    }

    /// Persists the outcome of a fixture and marks it completed. Standings are
    /// not touched here; the recalculation derives them from the match log.
    pub(crate) async fn record_result(&self, transaction: &mut Transaction<'_, Postgres>, clan1_score: i32, clan2_score: i32, winner: Option<&str>) -> Result<Self, Error> {
        if let Some(winner) = winner {
            if winner != self.clan1 && winner != self.clan2 {
                return Err(Error::WinnerNotAParticipant { id: self.id, winner: winner.to_owned() })
            }
        }
        Ok(
            sqlx::query_as::<_, Self>("UPDATE matches SET status = 'completed', clan1_score = $1, clan2_score = $2, winner = $3 WHERE id = $4 RETURNING id, sport, stage, status, clan1, clan2, scheduled_for, venue, clan1_score, clan2_score, winner")
                .bind(clan1_score)
                .bind(clan2_score)
                .bind(winner)
                .bind(self.id)
                .fetch_one(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn delete(transaction: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool, Error> {
        Ok(sqlx::query("DELETE FROM matches WHERE id = $1").bind(id).execute(&mut **transaction).await?.rows_affected() > 0)
    }
}
