use anyhow::{bail, Context};
use serde::Deserialize;

/// Which `UserStore` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub seed_users: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a valid port: {v}"))?,
            None => 8080,
        };

        let store = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("unknown STORE_BACKEND {other:?}, expected postgres or memory"),
        };

        let database_url = lookup("DATABASE_URL").or_else(|| assemble_database_url(&lookup));
        if store == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL or DB_USER/DB_NAME must be set for the postgres store");
        }

        let seed_users = match lookup("SEED_USERS") {
            Some(v) => parse_flag(&v).with_context(|| format!("SEED_USERS is not a flag: {v}"))?,
            None => true,
        };

        Ok(Self {
            host,
            port,
            store,
            database_url,
            seed_users,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// DB_USER / DB_PASSWORD / DB_HOST / DB_PORT / DB_NAME
fn assemble_database_url<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let user = lookup("DB_USER")?;
    let name = lookup("DB_NAME")?;
    let password = lookup("DB_PASSWORD").unwrap_or_default();
    let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".into());
    let port = lookup("DB_PORT").unwrap_or_else(|| "5432".into());
    let credentials = if password.is_empty() {
        user
    } else {
        format!("{user}:{password}")
    };
    Some(format!("postgres://{credentials}@{host}:{port}/{name}"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
