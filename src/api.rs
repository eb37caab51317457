use crate::{
    announcement::{
        self,
        Announcement,
    },
    clan::{
        self,
        Clan,
    },
    prelude::*,
    schedule::{
        self,
        Match,
        MatchStatus,
        Stage,
    },
    sport::{
        self,
        Sport,
    },
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Announcement(#[from] announcement::Error),
    #[error(transparent)]
    Clan(#[from] clan::Error),
    #[error(transparent)]
    Schedule(#[from] schedule::Error),
    #[error(transparent)]
    Sport(#[from] sport::Error),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

impl From<Error> for StatusOrError<Error> {
    fn from(e: Error) -> Self {
        StatusOrError::Err(e)
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for Error {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        Ok(Status::InternalServerError.respond_to(request)?)
    }
}

#[rocket::get("/api/leaderboard")]
pub(crate) async fn leaderboard(db_pool: &State<PgPool>) -> Result<Json<Vec<Clan>>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let clans = Clan::leaderboard(&mut transaction).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(clans))
}

/// The top three of the leaderboard, for the podium view.
#[rocket::get("/api/podium")]
pub(crate) async fn podium(db_pool: &State<PgPool>) -> Result<Json<Vec<Clan>>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let clans = Clan::leaderboard(&mut transaction).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(clans.into_iter().take(3).collect()))
}

#[rocket::get("/api/clans")]
pub(crate) async fn clans(db_pool: &State<PgPool>) -> Result<Json<Vec<Clan>>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let clans = Clan::all(&mut transaction).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(clans))
}

#[rocket::get("/api/clans/<name>")]
pub(crate) async fn clan_detail(db_pool: &State<PgPool>, name: &str) -> Result<Json<Clan>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let clan = Clan::from_name(&mut transaction, name).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    clan.map(Json).ok_or(StatusOrError::Status(Status::NotFound))
}

#[rocket::get("/api/matches?<stage>&<status>")]
pub(crate) async fn matches(db_pool: &State<PgPool>, stage: Option<Stage>, status: Option<MatchStatus>) -> Result<Json<Vec<Match>>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let matches = Match::scheduled(&mut transaction, stage, status).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(matches))
}

#[rocket::get("/api/sports")]
pub(crate) async fn sports(db_pool: &State<PgPool>) -> Result<Json<Vec<Sport>>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let sports = Sport::all(&mut transaction).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(sports))
}

#[rocket::get("/api/announcements")]
pub(crate) async fn announcements(db_pool: &State<PgPool>) -> Result<Json<Vec<Announcement>>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let announcements = Announcement::all(&mut transaction).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(announcements))
}
