use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{MongoChallengesDocument, MongoSessionDocument},
};
use crate::dao::{
    models::{ChallengeBatchEntity, SessionSnapshotEntity},
    snapshot_store::SnapshotStore,
    storage::StorageResult,
};

const SESSION_COLLECTION_NAME: &str = "sessions";
const CHALLENGES_COLLECTION_NAME: &str = "challenges";

/// MongoDB-backed snapshot store. Every append is a plain insert.
#[derive(Clone)]
pub struct MongoSnapshotStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    // Replaced wholesale on reconnect; the handle owns its client.
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = self.config.open().await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoSnapshotStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = config.open().await?;
        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(doc! {"session_id": 1, "recorded_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_recorded_idx".to_owned()))
                    .build(),
            )
            .build();

        self.sessions()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION_NAME,
                index: "session_id,recorded_at",
                source,
            })?;

        Ok(())
    }

    async fn sessions(&self) -> Collection<MongoSessionDocument> {
        self.inner
            .database
            .read()
            .await
            .collection::<MongoSessionDocument>(SESSION_COLLECTION_NAME)
    }

    async fn challenges(&self) -> Collection<MongoChallengesDocument> {
        self.inner
            .database
            .read()
            .await
            .collection::<MongoChallengesDocument>(CHALLENGES_COLLECTION_NAME)
    }
}

impl SnapshotStore for MongoSnapshotStore {
    fn append_session(
        &self,
        snapshot: SessionSnapshotEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document = MongoSessionDocument::from(snapshot);
            store
                .sessions()
                .await
                .insert_one(&document)
                .await
                .map_err(|source| MongoDaoError::Insert {
                    record: format!("snapshot {} of session {}", document.id, document.session_id),
                    source,
                })?;
            Ok(())
        })
    }

    fn append_challenges(
        &self,
        batch: ChallengeBatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document = MongoChallengesDocument::from(batch);
            store
                .challenges()
                .await
                .insert_one(&document)
                .await
                .map_err(|source| MongoDaoError::Insert {
                    record: format!("challenge batch {}", document.id),
                    source,
                })?;
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.reconnect().await.map_err(Into::into) })
    }
}
