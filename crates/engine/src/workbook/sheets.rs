//! Google Sheets backend (Sheets API v4, Drive API v3).
//!
//! The access token must already be authorized for the
//! `spreadsheets` and `drive` scopes; obtaining it is up to the caller.
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BackendError, Cell, Record, SheetSize, Workbook, Worksheet};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Reply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    add_sheet: Option<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct ValuesBody<'a> {
    values: &'a [Vec<Cell>],
}

#[derive(Clone, Debug)]
pub struct SheetsWorkbook {
    client: Client,
    sheets_api: String,
    name: String,
    spreadsheet_id: String,
}

impl SheetsWorkbook {
    /// Finds the spreadsheet called `name` in the account's Drive and opens it.
    pub async fn open(access_token: &str, name: &str) -> Result<Self, BackendError> {
        Self::open_at(access_token, name, SHEETS_API, DRIVE_API).await
    }

    /// Same as [`SheetsWorkbook::open`] against the given API base URLs.
    pub(crate) async fn open_at(
        access_token: &str,
        name: &str,
        sheets_api: &str,
        drive_api: &str,
    ) -> Result<Self, BackendError> {
        let mut auth = header::HeaderValue::try_from(format!("Bearer {access_token}"))
            .map_err(|err| BackendError::Request(format!("invalid access token: {err}")))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| BackendError::Request(format!("failed to build http client: {err}")))?;

        let query = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let resp = client
            .get(drive_api)
            .query(&[("q", query.as_str()), ("fields", "files(id)")])
            .send()
            .await?;
        let files: FileList = parse_response(resp).await?;

        let file = files
            .files
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        tracing::debug!("opened spreadsheet \"{name}\" ({})", file.id);

        Ok(Self {
            client,
            sheets_api: sheets_api.to_string(),
            name: name.to_string(),
            spreadsheet_id: file.id,
        })
    }

    fn url(&self, tail: &[&str]) -> Result<Url, BackendError> {
        let mut url =
            Url::parse(&self.sheets_api).map_err(|err| BackendError::Malformed(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Malformed("invalid sheets url".to_string()))?
            .push(&self.spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    async fn append_values(&self, title: &str, rows: &[Vec<Cell>]) -> Result<(), BackendError> {
        let range = format!("{}:append", a1_range(title, None));
        let resp = self
            .client
            .post(self.url(&["values", &range])?)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&ValuesBody { values: rows })
            .send()
            .await?;
        let _: Value = parse_response(resp).await?;
        Ok(())
    }

    async fn sheets(&self) -> Result<Vec<SheetProperties>, BackendError> {
        let resp = self
            .client
            .get(self.url(&[])?)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .send()
            .await?;
        let spreadsheet: Spreadsheet = parse_response(resp).await?;
        Ok(spreadsheet.sheets.into_iter().map(|s| s.properties).collect())
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(
    resp: reqwest::Response,
) -> Result<T, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error.message,
        Err(_) => "server error".to_string(),
    };
    match status {
        StatusCode::NOT_FOUND => Err(BackendError::NotFound(message)),
        _ => Err(BackendError::Request(format!("{status}: {message}"))),
    }
}

/// Column number (1-based) to its A1 letters.
fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 notation for a whole sheet or a single cell of it.
fn a1_range(title: &str, cell: Option<(usize, usize)>) -> String {
    let sheet = format!("'{}'", title.replace('\'', "''"));
    match cell {
        Some((row, col)) => format!("{sheet}!{}{row}", column_letters(col)),
        None => sheet,
    }
}

fn to_cell(value: Value) -> Cell {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Cell::Int(f as i64),
                _ => Cell::Text(n.to_string()),
            },
        },
        Value::String(s) => Cell::Text(s),
        Value::Null => Cell::Text(String::new()),
        other => Cell::Text(other.to_string()),
    }
}

#[async_trait]
impl Workbook for SheetsWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn worksheet(&self, title: &str) -> Result<Option<Worksheet>, BackendError> {
        Ok(self
            .sheets()
            .await?
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| Worksheet {
                id: p.sheet_id,
                title: p.title,
            }))
    }

    /// Adds the sheet and writes its header in one `batchUpdate`, which the
    /// API applies as a whole or not at all.
    async fn add_worksheet(
        &self,
        title: &str,
        header: &[&str],
        size: SheetSize,
    ) -> Result<Worksheet, BackendError> {
        let existing = self.sheets().await?;
        if existing.iter().any(|p| p.title == title) {
            return Err(BackendError::Malformed(format!(
                "a sheet named \"{title}\" already exists"
            )));
        }
        let sheet_id = existing.iter().map(|p| p.sheet_id).max().map_or(0, |id| id + 1);

        let batch = format!("{}:batchUpdate", self.spreadsheet_id);
        let mut url = self.url(&[])?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Malformed("invalid sheets url".to_string()))?
            .pop()
            .push(&batch);

        let header: Vec<Value> = header
            .iter()
            .map(|h| json!({ "userEnteredValue": { "stringValue": h } }))
            .collect();
        let body = json!({
            "requests": [
                {
                    "addSheet": {
                        "properties": {
                            "sheetId": sheet_id,
                            "title": title,
                            "gridProperties": {
                                "rowCount": size.rows,
                                "columnCount": size.cols,
                            }
                        }
                    }
                },
                {
                    "updateCells": {
                        "start": { "sheetId": sheet_id, "rowIndex": 0, "columnIndex": 0 },
                        "rows": [{ "values": header }],
                        "fields": "userEnteredValue",
                    }
                }
            ]
        });
        let resp = self.client.post(url).json(&body).send().await?;
        let update: BatchUpdateResponse = parse_response(resp).await?;

        let properties = update
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .map(|s| s.properties)
            .ok_or_else(|| BackendError::Malformed("addSheet reply missing".to_string()))?;

        Ok(Worksheet {
            id: properties.sheet_id,
            title: properties.title,
        })
    }

    async fn append_row(&self, sheet: &Worksheet, row: Vec<Cell>) -> Result<(), BackendError> {
        self.append_values(&sheet.title, &[row]).await
    }

    /// Cleared rows inside the data come back as `[]` and are kept as blank
    /// records so that positions keep matching sheet rows.
    async fn records(&self, sheet: &Worksheet) -> Result<Vec<Record>, BackendError> {
        let range = a1_range(&sheet.title, None);
        let resp = self
            .client
            .get(self.url(&["values", &range])?)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("majorDimension", "ROWS"),
            ])
            .send()
            .await?;
        let values: ValueRange = parse_response(resp).await?;

        let mut rows = values.values.into_iter();
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };
        let header: Vec<String> = header.into_iter().map(|v| to_cell(v).as_text()).collect();

        Ok(rows
            .map(|row| Record::from_row(&header, row.into_iter().map(to_cell).collect()))
            .collect())
    }

    async fn update_cell(
        &self,
        sheet: &Worksheet,
        row: usize,
        col: usize,
        value: Cell,
    ) -> Result<(), BackendError> {
        if row == 0 || col == 0 {
            return Err(BackendError::Malformed(format!(
                "cell ({row}, {col}) is not addressable"
            )));
        }
        let range = a1_range(&sheet.title, Some((row, col)));
        let resp = self
            .client
            .put(self.url(&["values", &range])?)
            .query(&[("valueInputOption", "RAW")])
            .json(&ValuesBody {
                values: &[vec![value]],
            })
            .send()
            .await?;
        let _: Value = parse_response(resp).await?;
        Ok(())
    }
}
