use {
    rocket::{
        Ignite,
        Rocket,
    },
    crate::{
        admin,
        api,
        prelude::*,
    },
};

pub(crate) enum StatusOrError<E> {
    Status(Status),
    Err(E),
}

impl<'r, E: rocket::response::Responder<'r, 'static>> rocket::response::Responder<'r, 'static> for StatusOrError<E> {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        match self {
            Self::Status(status) => status.respond_to(request),
            Self::Err(e) => e.respond_to(request),
        }
    }
}

#[rocket::catch(404)]
fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "not found" }))
}

#[rocket::catch(422)]
fn unprocessable_entity() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "unprocessable request body" }))
}

#[rocket::catch(500)]
fn internal_server_error() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "internal server error" }))
}

pub(crate) async fn rocket(db_pool: PgPool, config: Config, port: u16) -> Result<Rocket<Ignite>, rocket::Error> {
    rocket::custom(rocket::Config {
        port,
        ..rocket::Config::default()
    })
    .manage(config)
    .manage(db_pool)
    .mount("/", rocket::routes![
        api::leaderboard,
        api::podium,
        api::clans,
        api::clan_detail,
        api::matches,
        api::sports,
        api::announcements,
        admin::recalculate,
        admin::create_clan,
        admin::update_clan,
        admin::delete_clan,
        admin::create_sport,
        admin::update_sport,
        admin::delete_sport,
        admin::create_match,
        admin::update_match,
        admin::record_match_result,
        admin::delete_match,
        admin::import_schedule,
        admin::create_announcement,
        admin::update_announcement,
        admin::delete_announcement,
    ])
    .register("/", rocket::catchers![not_found, unprocessable_entity, internal_server_error])
    .ignite().await
}
