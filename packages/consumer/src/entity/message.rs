use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One ingested pager frame. `raw` is unique; rows are never updated.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Frame text exactly as the decoder produced it.
    #[sea_orm(column_type = "Text")]
    pub raw: String,

    /// Decoder-supplied capture time, stored verbatim.
    pub timestamp: Option<String>,

    pub priority: Option<String>,

    /// GRIP response grade, 1-4.
    pub grip: Option<i32>,

    /// Capcodes in frame order, separated by single spaces.
    #[sea_orm(column_type = "Text")]
    pub capcodes: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub body: Option<String>,

    pub received_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
