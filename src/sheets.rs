//! Google Sheets access: reads a sheet as rows of strings, appends, overwrites,
//! or blanks single rows. Rows are never physically removed, so the row-number
//! pointers held by database records stay valid across deletes.

use {
    std::path::PathBuf,
    tokio::{
        sync::Mutex,
        time::{
            Instant,
            sleep_until,
        },
    },
    yup_oauth2::{
        ServiceAccountAuthenticator,
        read_service_account_key,
    },
    crate::prelude::*,
};

/// from <https://developers.google.com/sheets/api/limits#quota>:
///
/// > Read requests […] Per minute per user per project […] 60
///
/// Also spaces out consecutive writes during bulk row rewrites.
const RATE_LIMIT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Io(#[from] std::io::Error),
    #[error(transparent)] OAuth(#[from] yup_oauth2::Error),
    #[error(transparent)] Reqwest(#[from] reqwest::Error),
    #[error("empty token is not valid")]
    EmptyToken,
    #[error("OAuth token is expired")]
    TokenExpired,
    #[error("append response has no row number: {0:?}")]
    AppendRange(String),
}

/// Seam between the reconciler and the spreadsheet. Sheet titles are the fixed
/// Cyrillic strings from [`crate::model`]; row numbers are 1-indexed.
#[async_trait::async_trait]
pub(crate) trait SheetStore: Send + Sync {
    /// The header row (sheet row 1).
    async fn header_row(&self, sheet: &str) -> Result<Vec<String>, Error>;
    /// All rows of the sheet, header included.
    async fn values(&self, sheet: &str) -> Result<Vec<Vec<String>>, Error>;
    /// Appends a row after the last non-empty one and returns its row number.
    async fn append_row(&self, sheet: &str, cells: Vec<String>) -> Result<i32, Error>;
    /// Overwrites the entire row in place.
    async fn update_row(&self, sheet: &str, row_number: i32, cells: Vec<String>) -> Result<(), Error>;
    /// Soft delete: clears the row's cells without shifting anything below it.
    async fn blank_row(&self, sheet: &str, row_number: i32, width: usize) -> Result<(), Error> {
        self.update_row(sheet, row_number, vec![String::new(); width]).await
    }
}

pub(crate) struct GoogleSheets {
    http_client: reqwest::Client,
    sheet_id: String,
    service_account_path: PathBuf,
    next_request: Mutex<Instant>,
}

impl GoogleSheets {
    pub(crate) fn new(http_client: reqwest::Client, sheet_id: String, service_account_path: PathBuf) -> Self {
        Self {
            next_request: Mutex::new(Instant::now()),
            http_client, sheet_id, service_account_path,
        }
    }

    async fn auth_token(&self) -> Result<String, Error> {
        let secret = read_service_account_key(&self.service_account_path).await?;
        let auth = ServiceAccountAuthenticator::builder(secret).build().await?;
        let token = auth.token(&["https://www.googleapis.com/auth/spreadsheets"]).await?;
        if token.is_expired() {
            return Err(Error::TokenExpired)
        }
        let Some(token) = token.token() else { return Err(Error::EmptyToken) };
        if token.is_empty() {
            return Err(Error::EmptyToken)
        }
        Ok(token.to_owned())
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, Error> {
        #[derive(Deserialize)]
        struct ValueRange {
            #[serde(default)]
            values: Vec<Vec<String>>,
        }

        let mut next_request = self.next_request.lock().await;
        sleep_until(*next_request).await;
        let token = self.auth_token().await?;
        let ValueRange { values } = self.http_client.get(format!("https://sheets.googleapis.com/v4/spreadsheets/{}/values/{range}", self.sheet_id))
            .bearer_auth(token)
            .query(&[
                ("valueRenderOption", "FORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
                ("majorDimension", "ROWS"),
            ])
            .send().await?
            .error_for_status()?
            .json::<ValueRange>().await?;
        *next_request = Instant::now() + RATE_LIMIT;
        Ok(values)
    }
}

#[derive(Serialize)]
struct WriteValueRange {
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Deserialize)]
struct AppendUpdates {
    #[serde(rename = "updatedRange")]
    updated_range: String,
}

#[async_trait::async_trait]
impl SheetStore for GoogleSheets {
    async fn header_row(&self, sheet: &str) -> Result<Vec<String>, Error> {
        Ok(self.get_values(&format!("'{sheet}'!1:1")).await?.into_iter().next().unwrap_or_default())
    }

    async fn values(&self, sheet: &str) -> Result<Vec<Vec<String>>, Error> {
        self.get_values(&format!("'{sheet}'")).await
    }

    async fn append_row(&self, sheet: &str, cells: Vec<String>) -> Result<i32, Error> {
        let mut next_request = self.next_request.lock().await;
        sleep_until(*next_request).await;
        let token = self.auth_token().await?;
        let response = self.http_client.post(format!("https://sheets.googleapis.com/v4/spreadsheets/{}/values/'{sheet}':append", self.sheet_id))
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&WriteValueRange { values: vec![cells] })
            .send().await?
            .error_for_status()?
            .json::<AppendResponse>().await?;
        *next_request = Instant::now() + RATE_LIMIT;
        row_number_from_range(&response.updates.updated_range)
            .ok_or(Error::AppendRange(response.updates.updated_range))
    }

    async fn update_row(&self, sheet: &str, row_number: i32, cells: Vec<String>) -> Result<(), Error> {
        let range = format!("'{sheet}'!A{row_number}:{}{row_number}", column_name(cells.len().max(1)));
        let mut next_request = self.next_request.lock().await;
        sleep_until(*next_request).await;
        let token = self.auth_token().await?;
        self.http_client.put(format!("https://sheets.googleapis.com/v4/spreadsheets/{}/values/{range}", self.sheet_id))
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&WriteValueRange { values: vec![cells] })
            .send().await?
            .error_for_status()?;
        *next_request = Instant::now() + RATE_LIMIT;
        Ok(())
    }
}

/// Row number of the first cell of an A1 range like `'Выпуски'!A5:G5`.
fn row_number_from_range(range: &str) -> Option<i32> {
    let cell = range.rsplit('!').next()?;
    let cell = cell.split(':').next()?;
    let digits = cell.chars().filter(char::is_ascii_digit).collect::<String>();
    digits.parse().ok()
}

/// 1-indexed column number to its A1 letter name.
fn column_name(mut number: usize) -> String {
    let mut name = String::new();
    while number > 0 {
        let rem = (number - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        number = (number - 1) / 26;
    }
    name
}

#[cfg(test)]
mod tests {
    use {
        std::sync::Mutex as SyncMutex,
        super::*,
    };

    /// Records writes instead of performing them.
    #[derive(Default)]
    struct FakeSheets {
        updates: SyncMutex<Vec<(String, i32, Vec<String>)>>,
    }

    #[async_trait::async_trait]
    impl SheetStore for FakeSheets {
        async fn header_row(&self, _: &str) -> Result<Vec<String>, Error> {
            Ok(Vec::default())
        }

        async fn values(&self, _: &str) -> Result<Vec<Vec<String>>, Error> {
            Ok(Vec::default())
        }

        async fn append_row(&self, _: &str, _: Vec<String>) -> Result<i32, Error> {
            Ok(2)
        }

        async fn update_row(&self, sheet: &str, row_number: i32, cells: Vec<String>) -> Result<(), Error> {
            self.updates.lock().unwrap().push((sheet.to_owned(), row_number, cells));
            Ok(())
        }
    }

    #[tokio::test]
    async fn blank_row_overwrites_the_full_width() {
        let sheets = FakeSheets::default();
        sheets.blank_row("Выпуски", 5, 3).await.unwrap();
        let updates = sheets.updates.lock().unwrap();
        assert_eq!(*updates, [("Выпуски".to_owned(), 5, vec![String::new(); 3])]);
    }

    #[test]
    fn row_number_from_append_range() {
        assert_eq!(row_number_from_range("'Выпуски'!A5:G5"), Some(5));
        assert_eq!(row_number_from_range("Config!B12"), Some(12));
        assert_eq!(row_number_from_range("'Выпуски'!A:G"), None);
        assert_eq!(row_number_from_range(""), None);
    }

    #[test]
    fn column_names() {
        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(15), "O");
        assert_eq!(column_name(26), "Z");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(52), "AZ");
    }
}
