use {
    std::path::{
        Path,
        PathBuf,
    },
    crate::{
        prelude::*,
        rowmap::DateFallback,
    },
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Io(#[from] std::io::Error),
    #[error(transparent)] Json(#[from] serde_json::Error),
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) database: ConfigDatabase,
    pub(crate) telegram: ConfigTelegram,
    pub(crate) google: ConfigGoogle,
    #[serde(default)]
    pub(crate) omdb_api_key: Option<String>,
    #[serde(default)]
    pub(crate) rawg_api_key: Option<String>,
    #[serde(default)]
    pub(crate) youtube: Option<ConfigYouTube>,
    /// What the row mapper returns for an unparseable date cell. The historical
    /// backends disagreed (`null` vs the current date), so the choice is explicit.
    #[serde(default)]
    pub(crate) invalid_date_fallback: DateFallback,
}

impl Config {
    pub(crate) async fn load(path: &Path) -> Result<Self, Error> {
        let buf = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigDatabase {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) database: Option<String>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigTelegram {
    #[serde(default)]
    pub(crate) bot_token: String,
    pub(crate) default_admin_id: i64,
    /// Admin UI exposed through the chat menu button, if deployed.
    #[serde(default)]
    pub(crate) web_app_url: Option<Url>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigGoogle {
    pub(crate) sheet_id: String,
    pub(crate) service_account_path: PathBuf,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigYouTube {
    pub(crate) api_key: String,
    pub(crate) playlist_id: String,
    #[serde(default = "default_poll_interval_minutes")]
    pub(crate) poll_interval_minutes: u64,
}

fn default_poll_interval_minutes() -> u64 { 360 }
