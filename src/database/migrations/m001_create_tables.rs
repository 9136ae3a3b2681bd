use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create datasets table
        manager
            .create_table(
                Table::create()
                    .table(Datasets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Datasets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Datasets::OriginalName).string().not_null())
                    .col(ColumnDef::new(Datasets::Rows).json().not_null())
                    .col(ColumnDef::new(Datasets::OwnerId).string().not_null())
                    .col(ColumnDef::new(Datasets::NarrativeText).text())
                    .col(ColumnDef::new(Datasets::NarrativeSource).string())
                    .col(ColumnDef::new(Datasets::NarrativeGeneratedAt).timestamp())
                    .col(ColumnDef::new(Datasets::BlobPath).string())
                    .col(ColumnDef::new(Datasets::UploadedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create analyses table. dataset_id is deliberately not a foreign
        // key: deleting a dataset orphans its analyses rather than
        // cascading.
        manager
            .create_table(
                Table::create()
                    .table(Analyses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Analyses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Analyses::OwnerId).string().not_null())
                    .col(ColumnDef::new(Analyses::DatasetId).integer().not_null())
                    .col(ColumnDef::new(Analyses::XAxis).string().not_null())
                    .col(ColumnDef::new(Analyses::YAxis).string().not_null())
                    .col(ColumnDef::new(Analyses::ChartType).string().not_null())
                    .col(ColumnDef::new(Analyses::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_datasets_owner_id")
                    .table(Datasets::Table)
                    .col(Datasets::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analyses_owner_id")
                    .table(Analyses::Table)
                    .col(Analyses::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Analyses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Datasets::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Datasets {
    Table,
    Id,
    OriginalName,
    Rows,
    OwnerId,
    NarrativeText,
    NarrativeSource,
    NarrativeGeneratedAt,
    BlobPath,
    UploadedAt,
}

#[derive(Iden)]
enum Analyses {
    Table,
    Id,
    OwnerId,
    DatasetId,
    XAxis,
    YAxis,
    ChartType,
    CreatedAt,
}
