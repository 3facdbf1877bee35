//! Schema for the SQLite workbook backend.
//!
//! - `workbooks`: named workbooks
//! - `worksheets`: named partitions of a workbook, with their header row
//! - `worksheet_rows`: data rows, addressed by their 1-based sheet position

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Workbooks {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Worksheets {
    Table,
    Id,
    WorkbookId,
    Title,
    Header,
    RowCount,
    ColCount,
}

#[derive(Iden)]
enum WorksheetRows {
    Table,
    Id,
    WorksheetId,
    Position,
    Cells,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Workbooks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Workbooks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Workbooks::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Worksheets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Worksheets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Worksheets::WorkbookId).integer().not_null())
                    .col(ColumnDef::new(Worksheets::Title).string().not_null())
                    .col(ColumnDef::new(Worksheets::Header).text().not_null())
                    .col(ColumnDef::new(Worksheets::RowCount).integer().not_null())
                    .col(ColumnDef::new(Worksheets::ColCount).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-worksheets-workbook_id")
                            .from(Worksheets::Table, Worksheets::WorkbookId)
                            .to(Workbooks::Table, Workbooks::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-worksheets-workbook_id-title-unique")
                    .table(Worksheets::Table)
                    .col(Worksheets::WorkbookId)
                    .col(Worksheets::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorksheetRows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorksheetRows::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WorksheetRows::WorksheetId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorksheetRows::Position).integer().not_null())
                    .col(ColumnDef::new(WorksheetRows::Cells).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-worksheet_rows-worksheet_id")
                            .from(WorksheetRows::Table, WorksheetRows::WorksheetId)
                            .to(Worksheets::Table, Worksheets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-worksheet_rows-worksheet_id-position-unique")
                    .table(WorksheetRows::Table)
                    .col(WorksheetRows::WorksheetId)
                    .col(WorksheetRows::Position)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorksheetRows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Worksheets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workbooks::Table).to_owned())
            .await
    }
}
