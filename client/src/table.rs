//! Remote Table Client.
//!
//! `TableApi` is the seam every entity service talks through. It deals in
//! raw JSON records; typing happens one layer up.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crmdesk_core::table::{
    DeleteParams, FetchParams, FetchResponse, GetParams, MutationResponse, RecordResponse,
    RecordsPayload,
};

use crate::config::ClientConfig;
use crate::error::{ConfigError, ServiceError};

#[async_trait]
pub trait TableApi: Send + Sync {
    async fn fetch_records(
        &self,
        table: &str,
        params: &FetchParams,
    ) -> Result<FetchResponse, ServiceError>;

    async fn get_record_by_id(
        &self,
        table: &str,
        id: i64,
        params: &GetParams,
    ) -> Result<RecordResponse, ServiceError>;

    async fn create_records(
        &self,
        table: &str,
        payload: &RecordsPayload,
    ) -> Result<MutationResponse, ServiceError>;

    async fn update_records(
        &self,
        table: &str,
        payload: &RecordsPayload,
    ) -> Result<MutationResponse, ServiceError>;

    async fn delete_records(
        &self,
        table: &str,
        params: &DeleteParams,
    ) -> Result<MutationResponse, ServiceError>;
}

/// `TableApi` over the hosted platform's HTTP interface.
pub struct HttpTableClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTableClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("crmdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn records_url(&self, table: &str, suffix: &str) -> String {
        format!(
            "{}/v1/tables/{table}/records{suffix}",
            self.config.base_url()
        )
    }

    fn request(&self, method: Method, url: String) -> (RequestBuilder, String) {
        let request_id = uuid::Uuid::now_v7().to_string();
        let builder = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.config.public_key))
            .header("X-Project-Id", &self.config.project_id)
            .header("X-Request-Id", &request_id);
        (builder, request_id)
    }

    /// Send a request and decode the JSON body. Non-2xx responses become
    /// `ServiceError::Remote`, carrying the server's `message` when present.
    async fn execute<R: DeserializeOwned>(
        &self,
        table: &str,
        op: &'static str,
        builder: RequestBuilder,
        request_id: String,
    ) -> Result<R, ServiceError> {
        tracing::debug!(table, op, request_id = %request_id, "table request");

        let transport = |source: reqwest::Error| ServiceError::Transport {
            table: table.to_string(),
            source,
        };
        let resp = builder.send().await.map_err(transport)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| format!("{table} {op} failed with HTTP {}", status.as_u16()));
            tracing::debug!(table, op, request_id = %request_id, status = status.as_u16(), "table request rejected");
            return Err(ServiceError::Remote {
                table: table.to_string(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|source| ServiceError::decode(table, source))
    }
}

#[async_trait]
impl TableApi for HttpTableClient {
    async fn fetch_records(
        &self,
        table: &str,
        params: &FetchParams,
    ) -> Result<FetchResponse, ServiceError> {
        let (builder, request_id) = self.request(Method::POST, self.records_url(table, "/query"));
        self.execute(table, "fetch", builder.json(params), request_id)
            .await
    }

    async fn get_record_by_id(
        &self,
        table: &str,
        id: i64,
        params: &GetParams,
    ) -> Result<RecordResponse, ServiceError> {
        let fields: Vec<&str> = params.fields.iter().map(|f| f.field.name.as_str()).collect();
        let (builder, request_id) =
            self.request(Method::GET, self.records_url(table, &format!("/{id}")));
        let builder = builder.query(&[("fields", fields.join(","))]);
        self.execute(table, "get", builder, request_id).await
    }

    async fn create_records(
        &self,
        table: &str,
        payload: &RecordsPayload,
    ) -> Result<MutationResponse, ServiceError> {
        let (builder, request_id) = self.request(Method::POST, self.records_url(table, ""));
        self.execute(table, "create", builder.json(payload), request_id)
            .await
    }

    async fn update_records(
        &self,
        table: &str,
        payload: &RecordsPayload,
    ) -> Result<MutationResponse, ServiceError> {
        let (builder, request_id) = self.request(Method::PATCH, self.records_url(table, ""));
        self.execute(table, "update", builder.json(payload), request_id)
            .await
    }

    async fn delete_records(
        &self,
        table: &str,
        params: &DeleteParams,
    ) -> Result<MutationResponse, ServiceError> {
        let (builder, request_id) = self.request(Method::DELETE, self.records_url(table, ""));
        self.execute(table, "delete", builder.json(params), request_id)
            .await
    }
}
