//! Metadata index on a relational database through sea-orm.

use async_trait::async_trait;
use hashbin_common::index::{ContentRecord, IndexError, MetadataIndex, Principal};
use hashbin_common::storage::ContentHash;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QuerySelect, Set, SqlErr};
use tracing::warn;

use crate::entity::content_record;

pub struct SeaOrmMetadataIndex {
    db: DatabaseConnection,
}

impl SeaOrmMetadataIndex {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn backend(err: DbErr) -> IndexError {
    IndexError::Backend(err.to_string())
}

fn to_record(model: content_record::Model) -> Result<ContentRecord, IndexError> {
    let hash = ContentHash::from_hex(&model.content_hash)
        .map_err(|e| IndexError::Corrupt(format!("row {}: {e}", model.content_hash)))?;
    let size = u64::try_from(model.size)
        .map_err(|_| IndexError::Corrupt(format!("row {}: negative size", model.content_hash)))?;

    Ok(ContentRecord {
        hash,
        filename: model.filename,
        owner: Principal::new(model.owner),
        size,
        created_at: model.created_at,
    })
}

#[async_trait]
impl MetadataIndex for SeaOrmMetadataIndex {
    async fn find(&self, hash: &ContentHash) -> Result<Option<ContentRecord>, IndexError> {
        content_record::Entity::find_by_id(hash.to_hex())
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(to_record)
            .transpose()
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, IndexError> {
        let found: Option<String> = content_record::Entity::find_by_id(hash.to_hex())
            .select_only()
            .column(content_record::Column::ContentHash)
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(backend)?;
        Ok(found.is_some())
    }

    /// Insert-if-absent. The primary key is the arbiter between concurrent
    /// uploaders: a conflicting insert affects no rows and reports
    /// [`IndexError::DuplicateKey`].
    async fn insert(&self, record: &ContentRecord) -> Result<(), IndexError> {
        let model = content_record::ActiveModel {
            content_hash: Set(record.hash.to_hex()),
            filename: Set(record.filename.clone()),
            owner: Set(record.owner.as_str().to_string()),
            size: Set(i64::try_from(record.size).unwrap_or(i64::MAX)),
            created_at: Set(record.created_at),
        };

        let result = content_record::Entity::insert(model)
            .on_conflict(
                OnConflict::column(content_record::Column::ContentHash)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match result {
            Ok(0) | Err(DbErr::RecordNotInserted) => Err(IndexError::DuplicateKey(record.hash)),
            Ok(_) => Ok(()),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(IndexError::DuplicateKey(record.hash))
                }
                _ => Err(backend(e)),
            },
        }
    }

    async fn delete(&self, hash: &ContentHash) -> Result<(), IndexError> {
        content_record::Entity::delete_by_id(hash.to_hex())
            .exec(&self.db)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_hashes(&self) -> Result<Vec<ContentHash>, IndexError> {
        let rows: Vec<String> = content_record::Entity::find()
            .select_only()
            .column(content_record::Column::ContentHash)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(backend)?;

        Ok(rows
            .into_iter()
            .filter_map(|hex| match ContentHash::from_hex(&hex) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    warn!(content_hash = %hex, error = %e, "skipping malformed content record key");
                    None
                }
            })
            .collect())
    }
}
