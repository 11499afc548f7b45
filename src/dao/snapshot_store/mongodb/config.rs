//! Connection settings and bootstrap for the MongoDB snapshot backend.

use std::{env, time::Duration};

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "words_weave";
const PING_ATTEMPTS: u32 = 10;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Parsed driver options plus the database holding the snapshot collections.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection string.
    pub options: ClientOptions,
    /// Database holding the snapshot collections.
    pub database: String,
}

impl MongoConfig {
    /// Parse `uri`; an absent or empty `database` falls back to `words_weave`.
    pub async fn parse(uri: &str, database: Option<String>) -> MongoResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;
        let database = database
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
        Ok(Self { options, database })
    }

    /// Read `MONGO_URI` (required) and `MONGO_DB`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        Self::parse(&uri, env::var("MONGO_DB").ok()).await
    }

    /// Build a client and hand out the database once the server answers a ping.
    pub(super) async fn open(&self) -> MongoResult<Database> {
        let client = Client::with_options(self.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&self.database);

        let mut delay = FIRST_PING_DELAY;
        let mut attempt = 1;
        loop {
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => return Ok(database),
                Err(source) if attempt >= PING_ATTEMPTS => {
                    return Err(MongoDaoError::InitialPing {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    debug!(attempt, error = %err, "MongoDB not answering yet");
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_PING_DELAY);
                    attempt += 1;
                }
            }
        }
    }
}
