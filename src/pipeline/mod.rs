// Request pipeline module - turns one image request into one response
//
// fetch → inspect → negotiate format → resolve plan → pre-size → execute.
// The transport adapter (HTTP, Lambda, CLI) only builds an ImageRequest
// and writes out the ImageResponse.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::constants::FALLBACK_CONTENT_TYPE;
use crate::error::ServiceError;
use crate::optimizer::{
    accepted_formats, decide, execute, presize, inspect, vary_header, winning_fm,
    ExecutionOptions, SourceImage,
};
use crate::params::{parse_query, resolve, resolve_aliases, EditPlan, Schema};
use crate::storage::{ObjectStore, StoredObject};

/// One image request, independent of transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Object key, without a leading `/`
    pub key: String,
    /// Raw query string
    pub query: String,
    /// Client Accept header
    pub accept: Option<String>,
}

impl ImageRequest {
    pub fn new(key: impl AsRef<str>, query: impl Into<String>) -> Self {
        Self {
            key: key.as_ref().trim_start_matches('/').to_string(),
            query: query.into(),
            accept: None,
        }
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageResponse {
    pub status: u16,
    pub body: Bytes,
    pub content_type: String,
    pub headers: BTreeMap<String, String>,
}

impl ImageResponse {
    fn new(status: u16, body: Bytes, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), content_type.clone());
        headers.insert("Content-Length".to_string(), body.len().to_string());
        Self {
            status,
            body,
            content_type,
            headers,
        }
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Orchestrates image requests against one object store
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    config: ServiceConfig,
    schema: &'static Schema,
}

impl Pipeline {
    pub fn new(store: Arc<dyn ObjectStore>, config: ServiceConfig) -> Self {
        Self::with_schema(store, config, Schema::builtin())
    }

    pub fn with_schema(
        store: Arc<dyn ObjectStore>,
        config: ServiceConfig,
        schema: &'static Schema,
    ) -> Self {
        Self {
            store,
            config,
            schema,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Resolve the edit plan for a query, after format negotiation.
    ///
    /// Aliases are applied, the request is resolved once to read `auto`,
    /// and the winning `fm` is written back before the final resolution.
    pub fn plan(
        &self,
        query: &str,
        accept: Option<&str>,
        source: &SourceImage,
    ) -> Result<EditPlan, ServiceError> {
        let mut raw = resolve_aliases(&parse_query(query), self.schema);
        let first_pass = resolve(&raw, self.schema)?;

        let metadata = &source.metadata;
        let negotiated = decide(
            &metadata.format,
            metadata.has_alpha,
            first_pass.list("auto"),
            &accepted_formats(accept),
        );
        if let Some(format) = negotiated {
            debug!(format = %format, original = %metadata.format, "Negotiated output format");
        }

        let explicit = raw.get("fm").map(String::as_str);
        if let Some(fm) = winning_fm(negotiated, explicit, &metadata.format) {
            raw.insert("fm".to_string(), fm);
        }

        Ok(resolve(&raw, self.schema)?)
    }

    /// Run a request, mapping failures to error responses
    pub async fn handle(&self, request: &ImageRequest) -> ImageResponse {
        match self.process(request).await {
            Ok(response) => response,
            Err(err) => {
                let status = err.to_http_status();
                if status >= 500 {
                    error!(key = %request.key, status, error = %err, "Request failed");
                } else {
                    warn!(key = %request.key, status, error = %err, "Request rejected");
                }
                ImageResponse::new(
                    status,
                    Bytes::from(err.to_string()),
                    "text/plain; charset=utf-8",
                )
            }
        }
    }

    /// Run a request end to end
    pub async fn process(&self, request: &ImageRequest) -> Result<ImageResponse, ServiceError> {
        let started = Instant::now();
        let object = self.store.get(&request.key).await?;

        let body = object.body.clone();
        let inspected = task::spawn_blocking(move || inspect(&body))
            .await
            .map_err(|e| ServiceError::Internal(format!("Decode task failed: {}", e)))?;
        let source = match inspected {
            Ok(source) => source,
            Err(err) => {
                debug!(key = %request.key, error = %err, "Source is not a decodable image");
                return Ok(self.passthrough(object));
            }
        };

        let plan = self.plan(&request.query, request.accept.as_deref(), &source)?;
        let target = presize(&plan, &source.metadata)?;
        let vary = plan.list("auto").iter().any(|mode| mode == "format");

        let options = ExecutionOptions {
            default_quality: self.config.default_quality,
            max_dimensions: self.config.max_dimensions(),
        };
        let schema = self.schema;
        let executed = task::spawn_blocking(move || {
            execute(&source, &plan, target, &options, schema)
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("Processing task failed: {}", e)))?;

        let response = match executed {
            Ok(processed) => {
                info!(
                    key = %request.key,
                    format = %processed.format,
                    width = processed.output_size.0,
                    height = processed.output_size.1,
                    original_bytes = object.content_length,
                    output_bytes = processed.data.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Image processed"
                );
                ImageResponse::new(200, Bytes::from(processed.data), processed.content_type)
                    .with_header("Cache-Control", self.config.cache_control.clone())
            }
            Err(err) => {
                warn!(
                    key = %request.key,
                    error = %err,
                    "Edit could not be applied, returning original"
                );
                self.passthrough(object)
            }
        };

        Ok(if vary {
            response.with_header("Vary", vary_header())
        } else {
            response
        })
    }

    fn passthrough(&self, object: StoredObject) -> ImageResponse {
        let content_type = object
            .content_type
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
        ImageResponse::new(200, object.body, content_type)
            .with_header("Cache-Control", self.config.cache_control.clone())
    }
}
