use {
    rocket::{
        Request,
        request::{
            self,
            FromRequest,
        },
    },
    crate::prelude::*,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("missing Authorization header")]
    Missing,
    #[error("invalid admin token")]
    Invalid,
}

/// Request guard for the operator surface. Mutating routes take this as a
/// parameter; the expected token comes from the config file and is presented
/// as `Authorization: Bearer <token>`.
pub(crate) struct AdminToken;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Error> {
        let Some(config) = request.rocket().state::<Config>() else {
            return request::Outcome::Error((Status::InternalServerError, Error::Missing))
        };
        match request.headers().get_one("Authorization").and_then(|value| value.strip_prefix("Bearer ")) {
            Some(token) if token == config.admin_token => request::Outcome::Success(Self),
            Some(_) => request::Outcome::Error((Status::Unauthorized, Error::Invalid)),
            None => request::Outcome::Error((Status::Unauthorized, Error::Missing)),
        }
    }
}
