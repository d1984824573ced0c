//! Google Sheets feedback table (Sheets REST v4, reqwest only).
//!
//! The worksheet holds [`FEEDBACK_COLUMNS`] in row 1; data rows start at row 2.

use super::FeedbackStore;
use crate::error::StoreError;
use crate::record::{InteractionRecord, FEEDBACK_COLUMNS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Serialize)]
struct ValueRangeBody<'a> {
    values: Vec<&'a [String]>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetsFeedbackStore {
    spreadsheet_id: Option<String>,
    access_token: Option<String>,
    worksheet: String,
    api_base: String,
    client: reqwest::Client,
    header_ready: AtomicBool,
}

impl SheetsFeedbackStore {
    /// Missing id or token is allowed here; the store then reports every append as not persisted.
    pub fn new(spreadsheet_id: Option<String>, access_token: Option<String>, worksheet: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            spreadsheet_id: spreadsheet_id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            access_token: access_token.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            worksheet: worksheet.to_string(),
            api_base: SHEETS_API_BASE.to_string(),
            client,
            header_ready: AtomicBool::new(false),
        }
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.spreadsheet_id.is_some() && self.access_token.is_some()
    }

    fn credentials(&self) -> Result<(&str, &str), StoreError> {
        let id = self
            .spreadsheet_id
            .as_deref()
            .ok_or(StoreError::NotConfigured("missing spreadsheet id"))?;
        let token = self
            .access_token
            .as_deref()
            .ok_or(StoreError::NotConfigured("missing access token"))?;
        Ok((id, token))
    }

    /// `{base}/{id}/values/'{worksheet}'!{cells}{suffix}` with the range percent-encoded as one segment.
    fn values_url(&self, id: &str, cells: &str, suffix: &str) -> Result<reqwest::Url, StoreError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| StoreError::Api(0, format!("invalid Sheets API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Api(0, "Sheets API base cannot be a base URL".to_string()))?
            .push(id)
            .push("values")
            .push(&format!("{}{}", a1_range(&self.worksheet, cells), suffix));
        Ok(url)
    }

    async fn read_range(&self, cells: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let (id, token) = self.credentials()?;
        let url = self.values_url(id, cells, "")?;
        let res = self.client.get(url).bearer_auth(token).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Api(status.as_u16(), body));
        }
        let parsed: ValueRangeResponse = res.json().await?;
        Ok(parsed.values)
    }

    async fn ensure_header(&self) -> Result<(), StoreError> {
        if self.header_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        let existing = self.read_range("A1:H1").await?;
        if existing.first().map_or(true, |row| row.is_empty()) {
            let (id, token) = self.credentials()?;
            let url = self.values_url(id, "A1:H1", "")?;
            let header: Vec<String> = FEEDBACK_COLUMNS.iter().map(|c| c.to_string()).collect();
            let body = ValueRangeBody {
                values: vec![header.as_slice()],
            };
            let res = self
                .client
                .put(url)
                .query(&[("valueInputOption", "RAW")])
                .bearer_auth(token)
                .json(&body)
                .send()
                .await?;
            let status = res.status();
            if !status.is_success() {
                let body = res.text().await.unwrap_or_default();
                return Err(StoreError::Api(status.as_u16(), body));
            }
            tracing::info!(worksheet = %self.worksheet, "feedback sheet header row created");
        }
        self.header_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn try_append(&self, record: &InteractionRecord) -> Result<(), StoreError> {
        let (id, token) = self.credentials()?;
        self.ensure_header().await?;
        let url = self.values_url(id, "A:H", ":append")?;
        let row = record.to_row();
        let body = ValueRangeBody {
            values: vec![row.as_slice()],
        };
        let res = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::Api(status.as_u16(), body));
        }
        Ok(())
    }

    async fn try_load_all(&self) -> Result<Vec<InteractionRecord>, StoreError> {
        let rows = self.read_range("A2:H").await?;
        Ok(parse_rows(&rows))
    }
}

/// A1 range on a quoted sheet name, so names like `FB1` or `a!b` are never read as cell refs.
fn a1_range(worksheet: &str, cells: &str) -> String {
    format!("'{}'!{}", worksheet.replace('\'', "''"), cells)
}

fn parse_rows(rows: &[Vec<String>]) -> Vec<InteractionRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let rec = InteractionRecord::from_row(row);
            if rec.is_none() {
                tracing::debug!(row = i + 2, "skipping feedback row without a 0/1 feedback_value");
            }
            rec
        })
        .collect()
}

#[async_trait]
impl FeedbackStore for SheetsFeedbackStore {
    fn name(&self) -> &'static str {
        "sheets"
    }

    async fn append(&self, record: &InteractionRecord) -> bool {
        match self.try_append(record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("feedback append failed (sheets): {}", e);
                false
            }
        }
    }

    async fn load_all(&self) -> Vec<InteractionRecord> {
        match self.try_load_all().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("feedback load failed (sheets): {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Feedback, Rating};

    #[tokio::test]
    async fn unconfigured_store_degrades_quietly() {
        let store = SheetsFeedbackStore::new(None, Some("token".into()), "feedback");
        assert!(!store.is_configured());
        let rec = InteractionRecord::new("UX", "a", "b", &Feedback::Positive);
        assert!(!store.append(&rec).await);
        assert!(store.load_all().await.is_empty());
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let store = SheetsFeedbackStore::new(Some(" ".into()), Some("t".into()), "feedback");
        assert!(!store.is_configured());
    }

    #[test]
    fn range_is_encoded_as_one_segment() {
        let store = SheetsFeedbackStore::new(Some("abc".into()), Some("t".into()), "brand feedback");
        let url = store.values_url("abc", "A:H", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'brand%20feedback'!A:H:append"
        );
    }

    #[test]
    fn sheet_names_are_quoted() {
        assert_eq!(a1_range("FB1", "A1:H1"), "'FB1'!A1:H1");
        assert_eq!(a1_range("a!b", "A2:H"), "'a!b'!A2:H");
        assert_eq!(a1_range("Bob's sheet", "A:H"), "'Bob''s sheet'!A:H");
    }

    #[test]
    fn parse_rows_skips_malformed() {
        let rows = vec![
            vec!["2024-01-01 00:00:00".to_string(), "UX".into(), "a".into(), "b".into(), "👎".into(), "0".into(), "too formal".into()],
            vec!["garbage".to_string()],
        ];
        let parsed = parse_rows(&rows);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].rating, Rating::Negative);
        assert_eq!(parsed[0].reason.as_deref(), Some("too formal"));
    }

    mod fake {
        use axum::extract::State;
        use axum::http::{HeaderMap, Method, Uri};
        use axum::{Json, Router};
        use serde_json::{json, Value};
        use std::sync::{Arc, Mutex};

        /// In-process stand-in for the Sheets values API: one worksheet, header plus data rows.
        #[derive(Default)]
        pub struct FakeSheet {
            pub calls: Mutex<Vec<String>>,
            pub header: Mutex<Vec<Vec<String>>>,
            pub rows: Mutex<Vec<Vec<String>>>,
            pub auth: Mutex<Vec<String>>,
        }

        fn values_of(body: &str) -> Vec<Vec<String>> {
            serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| serde_json::from_value(v["values"].clone()).ok())
                .unwrap_or_default()
        }

        async fn handle(
            State(sheet): State<Arc<FakeSheet>>,
            method: Method,
            uri: Uri,
            headers: HeaderMap,
            body: String,
        ) -> Json<Value> {
            let range = uri.path().rsplit('/').next().unwrap_or_default().to_string();
            let call = match uri.query() {
                Some(q) => format!("{} {}?{}", method, range, q),
                None => format!("{} {}", method, range),
            };
            sheet.calls.lock().unwrap().push(call);
            if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
                sheet.auth.lock().unwrap().push(auth.to_string());
            }

            if range.ends_with("!A1:H1") {
                if method == Method::PUT {
                    *sheet.header.lock().unwrap() = values_of(&body);
                    return Json(json!({}));
                }
                let header = sheet.header.lock().unwrap().clone();
                return Json(if header.is_empty() { json!({}) } else { json!({ "values": header }) });
            }
            if range.ends_with("!A:H:append") {
                sheet.rows.lock().unwrap().extend(values_of(&body));
                return Json(json!({}));
            }
            Json(json!({ "values": sheet.rows.lock().unwrap().clone() }))
        }

        /// Serves the fake on an ephemeral port; returns it with the API base to point a store at.
        pub async fn serve() -> (Arc<FakeSheet>, String) {
            let sheet = Arc::new(FakeSheet::default());
            let app = Router::new().fallback(handle).with_state(sheet.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            (sheet, format!("http://{}/v4/spreadsheets", addr))
        }
    }

    #[tokio::test]
    async fn header_written_once_and_rows_round_trip() {
        let (sheet, base) = fake::serve().await;
        let store = SheetsFeedbackStore::new(Some("sheet-1".into()), Some("t0ken".into()), "feedback").with_api_base(&base);

        let pos = InteractionRecord::new("UX", "soft sofa", "Sink in.", &Feedback::Positive);
        let neg = InteractionRecord::new(
            "SEARCH",
            "oak table",
            "Oak is a wood.",
            &Feedback::Negative {
                reason: Some("too dry".into()),
                comment: None,
            },
        );
        assert!(store.append(&pos).await);
        assert!(store.append(&neg).await);

        let puts: Vec<String> = sheet
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("PUT "))
            .cloned()
            .collect();
        assert_eq!(puts, vec!["PUT 'feedback'!A1:H1?valueInputOption=RAW".to_string()]);
        assert_eq!(sheet.header.lock().unwrap()[0], FEEDBACK_COLUMNS.to_vec());

        let appends = sheet
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("POST 'feedback'!A:H:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS"))
            .count();
        assert_eq!(appends, 2);
        assert!(sheet.auth.lock().unwrap().iter().all(|a| a == "Bearer t0ken"));

        let loaded = store.load_all().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].original_text, "soft sofa");
        assert_eq!(loaded[1].rating, Rating::Negative);
        assert_eq!(loaded[1].reason.as_deref(), Some("too dry"));
        assert_eq!(sheet.calls.lock().unwrap().last().unwrap(), "GET 'feedback'!A2:H");
    }

    #[tokio::test]
    async fn existing_header_is_not_rewritten() {
        let (sheet, base) = fake::serve().await;
        sheet
            .header
            .lock()
            .unwrap()
            .push(FEEDBACK_COLUMNS.iter().map(|c| c.to_string()).collect());
        let store = SheetsFeedbackStore::new(Some("sheet-1".into()), Some("t".into()), "feedback").with_api_base(&base);

        assert!(store.append(&InteractionRecord::new("UX", "a", "b", &Feedback::Positive)).await);
        assert!(!sheet.calls.lock().unwrap().iter().any(|c| c.starts_with("PUT ")));
        assert_eq!(sheet.rows.lock().unwrap().len(), 1);
    }
}
