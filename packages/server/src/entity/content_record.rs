use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_record")]
pub struct Model {
    /// SHA-256 content hash, lowercase hex. The uniqueness of this key is what
    /// serializes concurrent first uploads.
    #[sea_orm(primary_key, auto_increment = false)]
    pub content_hash: String,

    /// Filename given by the first uploader.
    pub filename: String,

    /// Username of the first uploader.
    #[sea_orm(indexed)]
    pub owner: String,

    /// Size of the content in bytes.
    pub size: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
