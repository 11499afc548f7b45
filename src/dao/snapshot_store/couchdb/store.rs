use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

use crate::dao::{
    models::{ChallengeBatchEntity, SessionSnapshotEntity},
    snapshot_store::SnapshotStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchChallengesDocument, CouchSessionDocument},
};

/// Writes every snapshot as a new CouchDB document.
#[derive(Clone)]
pub struct CouchSnapshotStore {
    client: Client,
    config: Arc<CouchConfig>,
}

impl CouchSnapshotStore {
    /// Build the client and create the database when it is missing.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder().build().map_err(CouchDaoError::Client)?;
        let store = Self {
            client,
            config: Arc::new(config),
        };
        store.ensure_database().await?;
        info!(database = %store.config.database, "CouchDB snapshot store ready");
        Ok(store)
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> CouchResult<Response> {
        let request = match &self.config.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        };
        request.send().await.map_err(|source| CouchDaoError::Unreachable {
            url: url.to_owned(),
            source,
        })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let url = self.config.database_url();
        let status = self.send(self.client.head(&url), &url).await?.status();
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            return Err(CouchDaoError::Status { url, status });
        }

        debug!(%url, "creating CouchDB database");
        match self.send(self.client.put(&url), &url).await?.status() {
            // 412: created concurrently by another instance.
            status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => Ok(()),
            status => Err(CouchDaoError::Status { url, status }),
        }
    }

    async fn insert<T: Serialize>(&self, id: &str, document: &T) -> CouchResult<()> {
        let url = self.config.document_url(id);
        let response = self.send(self.client.put(&url).json(document), &url).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Duplicate { id: id.to_owned() }),
            status => Err(CouchDaoError::Status { url, status }),
        }
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.config.database_url();
        match self.send(self.client.head(&url), &url).await?.status() {
            status if status.is_success() => Ok(()),
            status => Err(CouchDaoError::Status { url, status }),
        }
    }
}

impl SnapshotStore for CouchSnapshotStore {
    fn append_session(
        &self,
        snapshot: SessionSnapshotEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document = CouchSessionDocument::from(snapshot);
            Ok(store.insert(&document.id, &document).await?)
        })
    }

    fn append_challenges(
        &self,
        batch: ChallengeBatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document = CouchChallengesDocument::from(batch);
            Ok(store.insert(&document.id, &document).await?)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ping().await?) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ensure_database().await?) })
    }
}
