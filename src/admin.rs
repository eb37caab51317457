use crate::{
    announcement::{
        self,
        Announcement,
        NewAnnouncement,
    },
    auth::AdminToken,
    clan::{
        self,
        Clan,
        ClanProfile,
        NewClan,
    },
    import,
    prelude::*,
    schedule::{
        self,
        Match,
        MatchUpdate,
        NewMatch,
    },
    sport::{
        self,
        NewSport,
        Sport,
    },
    standings,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Announcement(#[from] announcement::Error),
    #[error(transparent)]
    Clan(#[from] clan::Error),
    #[error(transparent)]
    Import(#[from] import::Error),
    #[error(transparent)]
    Schedule(#[from] schedule::Error),
    #[error(transparent)]
    Sport(#[from] sport::Error),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error(transparent)]
    Standings(#[from] standings::Error),
    #[error("no such record")]
    NotFound,
}

impl From<Error> for StatusOrError<Error> {
    fn from(e: Error) -> Self {
        StatusOrError::Err(e)
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for Error {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        match self {
            Self::NotFound => Ok(Status::NotFound.respond_to(request)?),
            Self::Clan(clan::Error::InvalidName | clan::Error::Duplicate(_))
            | Self::Sport(sport::Error::Duplicate(_))
            | Self::Schedule(schedule::Error::WinnerNotAParticipant { .. }) => {
                Ok(Status::UnprocessableEntity.respond_to(request)?)
            }
            Self::Import(import::Error::Header | import::Error::Rows(_)) => {
                let body = Json(serde_json::json!({ "error": self.to_string(), "rows": import_rows(&self) }));
                Ok((Status::UnprocessableEntity, body).respond_to(request)?)
            }
            Self::Standings(standings::Error::AlreadyRunning) => Ok(Status::Conflict.respond_to(request)?),
            _ => Ok(Status::InternalServerError.respond_to(request)?),
        }
    }
}

fn import_rows(e: &Error) -> Vec<import::RowError> {
    if let Error::Import(import::Error::Rows(rows)) = e {
        rows.clone()
    } else {
        Vec::default()
    }
}

/// Rebuilds the standings from the match log on operator demand. The response
/// lists any match rows that were skipped as inconsistent.
#[rocket::post("/admin/recalculate")]
pub(crate) async fn recalculate(_admin: AdminToken, db_pool: &State<PgPool>) -> Result<Json<standings::Report>, StatusOrError<Error>> {
    let report = standings::recalculate(db_pool.inner()).await.map_err(Error::from)?;
    Ok(Json(report))
}

#[rocket::post("/admin/clans", format = "json", data = "<new_clan>")]
pub(crate) async fn create_clan(_admin: AdminToken, db_pool: &State<PgPool>, new_clan: Json<NewClan>) -> Result<Json<Clan>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let clan = Clan::create(&mut transaction, &new_clan).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(clan))
}

#[rocket::patch("/admin/clans/<name>", format = "json", data = "<profile>")]
pub(crate) async fn update_clan(_admin: AdminToken, db_pool: &State<PgPool>, name: &str, profile: Json<ClanProfile>) -> Result<Status, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    if !Clan::update_profile(&mut transaction, name, &profile).await.map_err(Error::from)? {
        return Err(Error::NotFound.into())
    }
    transaction.commit().await.map_err(Error::from)?;
    Ok(Status::NoContent)
}

#[rocket::delete("/admin/clans/<name>")]
pub(crate) async fn delete_clan(_admin: AdminToken, db_pool: &State<PgPool>, name: &str) -> Result<Status, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    if !Clan::delete(&mut transaction, name).await.map_err(Error::from)? {
        return Err(Error::NotFound.into())
    }
    transaction.commit().await.map_err(Error::from)?;
    Ok(Status::NoContent)
}

#[rocket::post("/admin/sports", format = "json", data = "<new_sport>")]
pub(crate) async fn create_sport(_admin: AdminToken, db_pool: &State<PgPool>, new_sport: Json<NewSport>) -> Result<Json<Sport>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let sport = Sport::create(&mut transaction, &new_sport).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(sport))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SportUpdate {
    description: Option<String>,
    icon_url: Option<String>,
}

#[rocket::patch("/admin/sports/<name>", format = "json", data = "<update>")]
pub(crate) async fn update_sport(_admin: AdminToken, db_pool: &State<PgPool>, name: &str, update: Json<SportUpdate>) -> Result<Status, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    if !Sport::update(&mut transaction, name, update.description.as_deref(), update.icon_url.as_deref()).await.map_err(Error::from)? {
        return Err(Error::NotFound.into())
    }
    transaction.commit().await.map_err(Error::from)?;
    Ok(Status::NoContent)
}

#[rocket::delete("/admin/sports/<name>")]
pub(crate) async fn delete_sport(_admin: AdminToken, db_pool: &State<PgPool>, name: &str) -> Result<Status, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    if !Sport::delete(&mut transaction, name).await.map_err(Error::from)? {
        return Err(Error::NotFound.into())
    }
    transaction.commit().await.map_err(Error::from)?;
    Ok(Status::NoContent)
}

#[rocket::post("/admin/matches", format = "json", data = "<new_match>")]
pub(crate) async fn create_match(_admin: AdminToken, db_pool: &State<PgPool>, new_match: Json<NewMatch>) -> Result<Json<Match>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    for name in [&new_match.clan1, &new_match.clan2] {
        if Clan::from_name(&mut transaction, name).await.map_err(Error::from)?.is_none() {
            return Err(StatusOrError::Status(Status::UnprocessableEntity))
        }
    }
    if Sport::from_name(&mut transaction, &new_match.sport).await.map_err(Error::from)?.is_none() || new_match.clan1 == new_match.clan2 {
        return Err(StatusOrError::Status(Status::UnprocessableEntity))
    }
    let fixture = Match::create(&mut transaction, &new_match).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(fixture))
}

#[rocket::patch("/admin/matches/<id>", format = "json", data = "<update>")]
pub(crate) async fn update_match(_admin: AdminToken, db_pool: &State<PgPool>, id: i64, update: Json<MatchUpdate>) -> Result<Json<Match>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let fixture = Match::from_id(&mut transaction, id).await.map_err(Error::from)?.ok_or(Error::NotFound)?;
    let fixture = fixture.update(&mut transaction, &update).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(fixture))
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchResult {
    clan1_score: i32,
    clan2_score: i32,
    winner: Option<String>,
}

/// Records the outcome of a fixture, then rebuilds the standings from the
/// match log. The result is persisted even if the recalculation errors out;
/// the operator can re-trigger the recalculation on its own.
#[rocket::post("/admin/matches/<id>/result", format = "json", data = "<result>")]
pub(crate) async fn record_match_result(_admin: AdminToken, db_pool: &State<PgPool>, id: i64, result: Json<MatchResult>) -> Result<Json<standings::Report>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let fixture = Match::from_id(&mut transaction, id).await.map_err(Error::from)?.ok_or(Error::NotFound)?;
    fixture.record_result(&mut transaction, result.clan1_score, result.clan2_score, result.winner.as_deref()).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    let report = standings::recalculate(db_pool.inner()).await.map_err(Error::from)?;
    Ok(Json(report))
}

#[rocket::delete("/admin/matches/<id>")]
pub(crate) async fn delete_match(_admin: AdminToken, db_pool: &State<PgPool>, id: i64) -> Result<Status, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    if !Match::delete(&mut transaction, id).await.map_err(Error::from)? {
        return Err(Error::NotFound.into())
    }
    transaction.commit().await.map_err(Error::from)?;
    Ok(Status::NoContent)
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) imported: usize,
}

#[rocket::post("/admin/import/schedule", data = "<csv>")]
pub(crate) async fn import_schedule(_admin: AdminToken, db_pool: &State<PgPool>, csv: String) -> Result<Json<ImportSummary>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let imported = import::import_schedule(&mut transaction, &csv).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(ImportSummary { imported }))
}

#[rocket::post("/admin/announcements", format = "json", data = "<new_announcement>")]
pub(crate) async fn create_announcement(_admin: AdminToken, db_pool: &State<PgPool>, new_announcement: Json<NewAnnouncement>) -> Result<Json<Announcement>, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    let announcement = Announcement::create(&mut transaction, &new_announcement).await.map_err(Error::from)?;
    transaction.commit().await.map_err(Error::from)?;
    Ok(Json(announcement))
}

#[rocket::patch("/admin/announcements/<id>", format = "json", data = "<update>")]
pub(crate) async fn update_announcement(_admin: AdminToken, db_pool: &State<PgPool>, id: i64, update: Json<NewAnnouncement>) -> Result<Status, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    if !Announcement::update(&mut transaction, id, &update.title, &update.body).await.map_err(Error::from)? {
        return Err(Error::NotFound.into())
    }
    transaction.commit().await.map_err(Error::from)?;
    Ok(Status::NoContent)
}

#[rocket::delete("/admin/announcements/<id>")]
pub(crate) async fn delete_announcement(_admin: AdminToken, db_pool: &State<PgPool>, id: i64) -> Result<Status, StatusOrError<Error>> {
    let mut transaction = db_pool.begin().await.map_err(Error::from)?;
    if !Announcement::delete(&mut transaction, id).await.map_err(Error::from)? {
        return Err(Error::NotFound.into())
    }
    transaction.commit().await.map_err(Error::from)?;
    Ok(Status::NoContent)
}
