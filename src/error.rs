use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{collection}/{id} could not be decoded: {source}")]
    Decode {
        collection: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("csv import failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("{collection}/{id} not found")]
    NotFound { collection: &'static str, id: String },

    #[error("no active partner; activate one first")]
    NoActivePartner,

    #[error("invalid {collection} document: {message}")]
    Validation {
        collection: &'static str,
        message: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    #[error("config file {} does not exist", path.display())]
    MissingFile { path: PathBuf },

    #[error("invalid configuration: {message}")]
    Validation { message: String },

    #[error("database_url is not set (use DATABASE_URL or FLEET_DATABASE_URL)")]
    MissingDatabaseUrl,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}
