//! Connection settings for the CouchDB snapshot backend.

use std::{env, fmt};

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "words_weave";

/// Basic-auth pair sent with every request.
#[derive(Clone)]
pub struct CouchCredentials {
    /// Account name.
    pub username: String,
    /// Account password; never printed by `Debug`.
    pub password: String,
}

impl fmt::Debug for CouchCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouchCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where snapshot documents are written.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, without trailing slash.
    pub server: String,
    /// Database receiving both session and batch documents.
    pub database: String,
    /// Basic-auth pair, `None` for an open server.
    pub credentials: Option<CouchCredentials>,
}

impl CouchConfig {
    /// Settings for `database` on `server`, without credentials.
    pub fn new(server: &str, database: impl Into<String>) -> Self {
        Self {
            server: server.trim_end_matches('/').to_owned(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, `COUCH_USERNAME` and `COUCH_PASSWORD`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|name| env::var(name).ok().filter(|value| !value.is_empty()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let server = lookup("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar("COUCH_BASE_URL"))?;
        let database = lookup("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let mut config = Self::new(&server, database);
        config.credentials = lookup("COUCH_USERNAME")
            .zip(lookup("COUCH_PASSWORD"))
            .map(|(username, password)| CouchCredentials { username, password });
        Ok(config)
    }

    /// URL of the database itself.
    pub fn database_url(&self) -> String {
        format!("{}/{}", self.server, self.database)
    }

    /// URL of one document.
    pub fn document_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.server, self.database, id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn base_url_is_required() {
        let err = CouchConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, CouchDaoError::MissingEnvVar("COUCH_BASE_URL")));
    }

    #[test]
    fn defaults_and_urls() {
        let config = CouchConfig::from_lookup(lookup(&[("COUCH_BASE_URL", "http://couch:5984/")])).unwrap();
        assert_eq!(config.database_url(), "http://couch:5984/words_weave");
        assert_eq!(
            config.document_url("session::a::b"),
            "http://couch:5984/words_weave/session::a::b"
        );
        assert!(config.credentials.is_none());
    }

    #[test]
    fn credentials_need_both_halves() {
        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984"),
            ("COUCH_USERNAME", "admin"),
        ]))
        .unwrap();
        assert!(config.credentials.is_none());

        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984"),
            ("COUCH_USERNAME", "admin"),
            ("COUCH_PASSWORD", "hunter2"),
        ]))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
