//! HTTP client for the Firestore REST API (v1).
//!
//! Read-only: an equality query against one collection and a point read by
//! document id. Results come back as decoded field maps (see
//! [`crate::value`]); mapping them onto domain types is the caller's job.

use std::time::Duration;

use linkpulse_core::AppConfig;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::FirestoreError;
use crate::event::FirestoreDocument;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_DATABASE: &str = "(default)";

// Characters that cannot appear raw inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A document id together with its decoded fields.
pub type FetchedDocument = (String, Map<String, Value>);

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

/// Client for the Firestore REST API.
///
/// Use [`FirestoreClient::new`] for production or
/// [`FirestoreClient::with_base_url`] to point at the emulator or a mock
/// server in tests.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    documents_url: Url,
    token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl FirestoreClient {
    /// Creates a client for `project_id` against the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FirestoreError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(project_id: &str, timeout_secs: u64) -> Result<Self, FirestoreError> {
        Self::with_base_url(DEFAULT_BASE_URL, project_id, DEFAULT_DATABASE, timeout_secs)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FirestoreError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`FirestoreError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        base_url: &str,
        project_id: &str,
        database: &str,
        timeout_secs: u64,
    ) -> Result<Self, FirestoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("linkpulse/0.1 (click-enrichment)")
            .build()?;

        let raw = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            base_url.trim_end_matches('/'),
            utf8_percent_encode(project_id, SEGMENT),
            utf8_percent_encode(database, SEGMENT),
        );
        let documents_url = Url::parse(&raw).map_err(|e| FirestoreError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            documents_url,
            token: None,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`FirestoreClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, FirestoreError> {
        Ok(Self::with_base_url(
            &config.firestore_base_url,
            &config.firestore_project_id,
            &config.firestore_database,
            config.firestore_timeout_secs,
        )?
        .with_token(config.firestore_token.clone())
        .with_retry(config.firestore_max_retries, config.firestore_retry_backoff_ms))
    }

    /// Sends `Authorization: Bearer <token>` on every request when set.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Returns the first document in `collection` whose `field` equals
    /// `value`, or `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// - [`FirestoreError::Http`] on network failure.
    /// - [`FirestoreError::UnexpectedStatus`] on a non-2xx response.
    /// - [`FirestoreError::Deserialize`] / [`FirestoreError::InvalidDocument`]
    ///   if the response does not match the REST encoding.
    pub async fn find_first_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<FetchedDocument>, FirestoreError> {
        let url = self.run_query_url();
        let body = json!({
            "structuredQuery": {
                "from": [{"collectionId": collection}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": field},
                        "op": "EQUAL",
                        "value": {"stringValue": value}
                    }
                },
                "limit": 1
            }
        });
        let context = format!("runQuery({collection}.{field} == {value})");

        let raw = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.send_json(self.client.post(url.clone()).json(&body), &context)
        })
        .await?;
        let items: Vec<RunQueryItem> = match raw {
            Some(raw) => parse(raw, &context)?,
            None => Vec::new(),
        };

        items
            .into_iter()
            .find_map(|item| item.document)
            .map(|doc| -> Result<FetchedDocument, FirestoreError> {
                Ok((doc.id().to_owned(), doc.decoded_fields()?))
            })
            .transpose()
    }

    /// Fetches `collection/{id}`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`FirestoreClient::find_first_by_field`]; a 404 is not an error.
    pub async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<FetchedDocument>, FirestoreError> {
        let url = self.document_url(collection, id)?;
        let context = format!("get({collection}/{id})");

        let raw = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.send_json(self.client.get(url.clone()), &context)
        })
        .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let doc: FirestoreDocument = parse(raw, &context)?;
        Ok(Some((doc.id().to_owned(), doc.decoded_fields()?)))
    }

    fn run_query_url(&self) -> Url {
        let mut url = self.documents_url.clone();
        let path = format!("{}:runQuery", url.path());
        url.set_path(&path);
        url
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, FirestoreError> {
        let raw = format!(
            "{}/{}/{}",
            self.documents_url,
            utf8_percent_encode(collection, SEGMENT),
            utf8_percent_encode(id, SEGMENT),
        );
        Url::parse(&raw).map_err(|e| FirestoreError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }

    /// Sends the request and returns the body as JSON. A 404 yields `None`;
    /// any other non-2xx status becomes [`FirestoreError::UnexpectedStatus`].
    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Option<Value>, FirestoreError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FirestoreError::UnexpectedStatus {
                status: status.as_u16(),
                context: context.to_owned(),
                body: text,
            });
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| FirestoreError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
    }
}

fn parse<T: serde::de::DeserializeOwned>(raw: Value, context: &str) -> Result<T, FirestoreError> {
    serde_json::from_value(raw).map_err(|e| FirestoreError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
