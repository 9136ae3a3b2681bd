use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A persisted, immutable set of parsed rows plus ownership and narrative
/// metadata. Rows are stored as a JSON array of column->scalar records.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "datasets")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub original_name: String,
    pub rows: Json,
    pub owner_id: String,
    pub narrative_text: Option<String>,
    pub narrative_source: Option<String>,
    pub narrative_generated_at: Option<ChronoDateTimeUtc>,
    /// Legacy on-disk blob, removed best-effort on delete. Never set for
    /// new uploads.
    pub blob_path: Option<String>,
    pub uploaded_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::analyses::Entity")]
    Analyses,
}

impl Related<super::analyses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analyses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
