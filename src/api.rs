use crate::config::Config;
use crate::error::GatewayError;
use crate::models::{Category, Task};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// A record type stored in one backend table.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> Option<&str>;
}

impl Record for Task {
    const TABLE: &'static str = "Task";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Record for Category {
    const TABLE: &'static str = "Category";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// CRUD access to one table of the backend.
#[async_trait]
pub trait Gateway<R: Record>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, GatewayError>;

    /// Inserts a record and returns it with server-assigned fields.
    async fn create(&self, record: &R) -> Result<R, GatewayError>;

    async fn update(&self, id: &str, record: &R) -> Result<R, GatewayError>;

    async fn delete(&self, id: &str) -> Result<(), GatewayError>;
}

/// Talks to the PostgREST endpoint of a Supabase project.
#[derive(Clone, Debug)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(SupabaseClient {
            client,
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl<R: Record> Gateway<R> for SupabaseClient {
    async fn list(&self) -> Result<Vec<R>, GatewayError> {
        let url = self.table_url(R::TABLE);
        debug!(table = R::TABLE, "listing rows");

        let res = self
            .authorized(self.client.get(&url))
            .query(&[("select", "*")])
            .send()
            .await?;

        decode_rows(check_status(res).await?).await
    }

    async fn create(&self, record: &R) -> Result<R, GatewayError> {
        let url = self.table_url(R::TABLE);
        debug!(table = R::TABLE, "inserting row");

        let res = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        inserted_row(decode_rows(check_status(res).await?).await?)
    }

    async fn update(&self, id: &str, record: &R) -> Result<R, GatewayError> {
        let url = self.table_url(R::TABLE);
        debug!(table = R::TABLE, id, "updating row");

        let res = self
            .authorized(self.client.patch(&url))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        let mut rows: Vec<R> = decode_rows(check_status(res).await?).await?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound {
                table: R::TABLE,
                id: id.to_string(),
            });
        }
        Ok(rows.remove(0))
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let url = self.table_url(R::TABLE);
        debug!(table = R::TABLE, id, "deleting row");

        let res = self
            .authorized(self.client.delete(&url))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let rows: Vec<serde_json::Value> = decode_rows(check_status(res).await?).await?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound {
                table: R::TABLE,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

async fn check_status(res: Response) -> Result<Response, GatewayError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let error_text = res.text().await?;
    Err(classify_failure(status, &error_text))
}

async fn decode_rows<T: DeserializeOwned>(res: Response) -> Result<Vec<T>, GatewayError> {
    let body = res.bytes().await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Maps a non-success response onto the gateway error kinds.
pub fn classify_failure(status: StatusCode, body: &str) -> GatewayError {
    let message = backend_message(body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(message)
        }
        StatusCode::NOT_FOUND => GatewayError::NotFound {
            table: "resource",
            id: message,
        },
        _ => GatewayError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

// PostgREST errors look like {"code": "...", "message": "...", "details": ...}
fn backend_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// The inserted row must come back with its server-assigned id, or later
// updates and deletes can't address it.
fn inserted_row<R: Record>(rows: Vec<R>) -> Result<R, GatewayError> {
    match rows.into_iter().next() {
        Some(row) if row.id().is_some() => {
            debug!(table = R::TABLE, id = row.id().unwrap_or_default(), "row inserted");
            Ok(row)
        }
        Some(_) => Err(GatewayError::Validation(format!(
            "insert into {} returned a row without an id",
            R::TABLE
        ))),
        None => Err(GatewayError::Validation(format!(
            "insert into {} returned no row",
            R::TABLE
        ))),
    }
}
