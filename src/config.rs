use {
    std::{
        io,
        path::Path,
    },
    tokio::fs,
    crate::prelude::*,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Io(#[from] io::Error),
    #[error(transparent)] Json(#[from] serde_json::Error),
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Config {
    pub(crate) admin_token: String,
    #[serde(default)]
    pub(crate) database: Option<ConfigDatabase>,
}

impl Config {
    pub(crate) async fn load(path: &Path) -> Result<Self, Error> {
        let buf = fs::read(path).await?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigDatabase {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) database: Option<String>,
}
