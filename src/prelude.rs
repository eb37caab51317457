pub(crate) use {
    std::{
        collections::HashSet,
        fmt,
        time::Duration,
    },
    chrono::prelude::*,
    log::{
        debug,
        warn,
    },
    rocket::{
        Request,
        State,
        http::Status,
        serde::json::Json,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    sqlx::{
        PgPool,
        Postgres,
        Transaction,
    },
    crate::{
        config::Config,
        http::StatusOrError,
    },
};
