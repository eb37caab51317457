use {
    std::path::PathBuf,
    clap::Parser as _,
    futures::FutureExt as _,
    sqlx::{
        ConnectOptions as _,
        postgres::{
            PgConnectOptions,
            PgPoolOptions,
        },
    },
    crate::prelude::*,
};

mod admin;
mod announcement;
mod api;
mod auth;
mod clan;
mod config;
mod http;
mod import;
mod prelude;
mod schedule;
mod sport;
mod standings;

#[allow(unused)] // variants only constructed under conditional compilation
#[derive(Default, Clone, Copy)]
enum Environment {
    #[cfg_attr(any(feature = "production", not(any(feature = "dev", feature = "local", debug_assertions))), default)]
    Production,
    #[cfg_attr(any(feature = "dev", all(debug_assertions, not(feature = "production"), not(feature = "local"))), default)]
    Dev,
    #[cfg_attr(feature = "local", default)]
    Local,
}

impl Environment {
    fn is_dev(&self) -> bool {
        match self {
            Self::Production => false,
            Self::Dev => true,
            Self::Local => true,
        }
    }
}

fn parse_port(arg: &str) -> Result<u16, std::num::ParseIntError> {
    match arg {
        "production" => Ok(24680),
        "dev" => Ok(24682),
        _ => arg.parse(),
    }
}

#[derive(clap::Parser)]
#[clap(version)]
struct Args {
    #[clap(long, value_parser = parse_port)]
    port: Option<u16>,
    #[clap(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)] Config(#[from] config::Error),
    #[error(transparent)] Rocket(#[from] rocket::Error),
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error(transparent)] Task(#[from] tokio::task::JoinError),
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let Args { port, config } = Args::parse();
    // Initialize logging to systemd journal via stderr
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    let default_panic_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("Thread panic: {info:?}");
        default_panic_hook(info)
    }));
    let config_path = config.unwrap_or_else(|| PathBuf::from(if Environment::default().is_dev() { "cfg/clash-arena-dev.json" } else { "cfg/clash-arena.json" }));
    let config = Config::load(&config_path).await?;
    let mut db_options = PgConnectOptions::default()
        .username("clash")
        .database(if Environment::default().is_dev() { "clash_arena_dev" } else { "clash_arena" })
        .application_name("clash-arena")
        .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(10));

    // Override with config if provided
    if let Some(ref db_config) = config.database {
        if let Some(ref host) = db_config.host {
            db_options = db_options.host(host);
        }
        if let Some(port) = db_config.port {
            db_options = db_options.port(port);
        }
        if let Some(ref username) = db_config.username {
            db_options = db_options.username(username);
        }
        if let Some(ref password) = db_config.password {
            db_options = db_options.password(password);
        }
        if let Some(ref database) = db_config.database {
            db_options = db_options.database(database);
        }
    }

    let db_pool = PgPoolOptions::default()
        .max_connections(16)
        .connect_with(db_options)
        .await?;
    let rocket = http::rocket(
        db_pool.clone(),
        config,
        port.unwrap_or_else(|| if Environment::default().is_dev() { 24682 } else { 24680 }),
    ).await?;
    let standings_task = tokio::spawn(standings_manager(db_pool, rocket.shutdown())).map(|res| match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(Error::Task(e)),
    });
    let rocket_task = tokio::spawn(rocket.launch()).map(|res| match res {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(Error::from(e)),
        Err(e) => Err(Error::Task(e)),
    });
    let ((), ()) = tokio::try_join!(standings_task, rocket_task)?;
    Ok(())
}

/// Background task keeping the standings converged with the match log even
/// when fixtures are edited without an explicit recalculation trigger.
async fn standings_manager(db_pool: PgPool, shutdown: rocket::Shutdown) -> Result<(), Error> {
    let mut interval = tokio::time::interval(Duration::from_secs(15 * 60));

    loop {
        tokio::select! {
            _ = interval.tick() => match standings::recalculate(&db_pool).await {
                Ok(report) => if report.skipped.is_empty() {
                    debug!("standings recalculated for {} clan(s)", report.clans);
                } else {
                    warn!("standings recalculated for {} clan(s), {} match(es) skipped as inconsistent", report.clans, report.skipped.len());
                },
                Err(standings::Error::AlreadyRunning) => debug!("skipping scheduled standings recalculation, one is already running"),
                Err(e) => log::error!("error recalculating standings: {e}"),
            },
            _ = shutdown.clone() => break,
        }
    }

    Ok(())
}
