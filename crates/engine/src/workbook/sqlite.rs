//! Workbook stored in a SQLite database through sea-orm.
//!
//! The schema lives in the `migration` crate; it must be applied before
//! [`SqliteWorkbook::open`] is called.
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::{BackendError, Cell, Record, SheetSize, Workbook, Worksheet};

mod workbooks {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "workbooks")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique)]
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

mod worksheets {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "worksheets")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub workbook_id: i32,
        pub title: String,
        /// JSON array of column names.
        pub header: String,
        pub row_count: i32,
        pub col_count: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

mod worksheet_rows {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "worksheet_rows")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub worksheet_id: i32,
        /// 1-based sheet row; the header occupies row 1.
        pub position: i32,
        /// JSON array of cells.
        pub cells: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Clone, Debug)]
pub struct SqliteWorkbook {
    name: String,
    id: i32,
    database: DatabaseConnection,
}

impl SqliteWorkbook {
    /// Opens the workbook called `name`, creating it when missing.
    pub async fn open(database: DatabaseConnection, name: &str) -> Result<Self, BackendError> {
        let existing = workbooks::Entity::find()
            .filter(workbooks::Column::Name.eq(name))
            .one(&database)
            .await?;

        let model = match existing {
            Some(model) => model,
            None => {
                tracing::info!("creating workbook \"{name}\"");
                workbooks::ActiveModel {
                    name: ActiveValue::Set(name.to_string()),
                    ..Default::default()
                }
                .insert(&database)
                .await?
            }
        };

        Ok(Self {
            name: model.name,
            id: model.id,
            database,
        })
    }

    async fn header(&self, sheet: &Worksheet) -> Result<Vec<String>, BackendError> {
        let model = worksheets::Entity::find_by_id(sheet_id(sheet)?)
            .one(&self.database)
            .await?
            .ok_or_else(|| BackendError::NotFound(sheet.title.clone()))?;
        decode(&model.header)
    }
}

fn sheet_id(sheet: &Worksheet) -> Result<i32, BackendError> {
    i32::try_from(sheet.id)
        .map_err(|_| BackendError::Malformed(format!("worksheet id {} out of range", sheet.id)))
}

fn position(row: usize) -> Result<i32, BackendError> {
    i32::try_from(row).map_err(|_| BackendError::Malformed(format!("row {row} out of range")))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, BackendError> {
    serde_json::from_str(raw).map_err(|err| BackendError::Malformed(err.to_string()))
}

fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, BackendError> {
    serde_json::to_string(value).map_err(|err| BackendError::Malformed(err.to_string()))
}

#[async_trait]
impl Workbook for SqliteWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn worksheet(&self, title: &str) -> Result<Option<Worksheet>, BackendError> {
        let model = worksheets::Entity::find()
            .filter(worksheets::Column::WorkbookId.eq(self.id))
            .filter(worksheets::Column::Title.eq(title))
            .one(&self.database)
            .await?;

        Ok(model.map(|m| Worksheet {
            id: i64::from(m.id),
            title: m.title,
        }))
    }

    async fn add_worksheet(
        &self,
        title: &str,
        header: &[&str],
        size: SheetSize,
    ) -> Result<Worksheet, BackendError> {
        let model = worksheets::ActiveModel {
            workbook_id: ActiveValue::Set(self.id),
            title: ActiveValue::Set(title.to_string()),
            header: ActiveValue::Set(encode(header)?),
            row_count: ActiveValue::Set(i32::try_from(size.rows).unwrap_or(i32::MAX)),
            col_count: ActiveValue::Set(i32::try_from(size.cols).unwrap_or(i32::MAX)),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;

        Ok(Worksheet {
            id: i64::from(model.id),
            title: model.title,
        })
    }

    async fn append_row(&self, sheet: &Worksheet, row: Vec<Cell>) -> Result<(), BackendError> {
        let worksheet_id = sheet_id(sheet)?;
        let db_tx = self.database.begin().await?;

        let last = worksheet_rows::Entity::find()
            .filter(worksheet_rows::Column::WorksheetId.eq(worksheet_id))
            .order_by_desc(worksheet_rows::Column::Position)
            .one(&db_tx)
            .await?;
        let next = last.map_or(2, |r| r.position + 1);

        worksheet_rows::ActiveModel {
            worksheet_id: ActiveValue::Set(worksheet_id),
            position: ActiveValue::Set(next),
            cells: ActiveValue::Set(encode(&row)?),
            ..Default::default()
        }
        .insert(&db_tx)
        .await?;

        db_tx.commit().await?;
        Ok(())
    }

    async fn records(&self, sheet: &Worksheet) -> Result<Vec<Record>, BackendError> {
        let header = self.header(sheet).await?;
        let rows = worksheet_rows::Entity::find()
            .filter(worksheet_rows::Column::WorksheetId.eq(sheet_id(sheet)?))
            .order_by_asc(worksheet_rows::Column::Position)
            .all(&self.database)
            .await?;

        rows.iter()
            .map(|row| Ok(Record::from_row(&header, decode(&row.cells)?)))
            .collect()
    }

    async fn update_cell(
        &self,
        sheet: &Worksheet,
        row: usize,
        col: usize,
        value: Cell,
    ) -> Result<(), BackendError> {
        if row < 2 || col == 0 {
            return Err(BackendError::Malformed(format!(
                "cell ({row}, {col}) is outside the data rows"
            )));
        }

        let model = worksheet_rows::Entity::find()
            .filter(worksheet_rows::Column::WorksheetId.eq(sheet_id(sheet)?))
            .filter(worksheet_rows::Column::Position.eq(position(row)?))
            .one(&self.database)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("{} row {row}", sheet.title)))?;

        let mut cells: Vec<Cell> = decode(&model.cells)?;
        if cells.len() < col {
            cells.resize(col, Cell::Text(String::new()));
        }
        cells[col - 1] = value;

        worksheet_rows::ActiveModel {
            id: ActiveValue::Set(model.id),
            cells: ActiveValue::Set(encode(&cells)?),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        Ok(())
    }
}
