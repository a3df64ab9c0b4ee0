//! HTTP repository client

use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, LINK};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use contracts::{FixityReport, RepositoryConfig, ResourceDescription, ResourceFetcher, RouterError};

use crate::jsonld;

const JSON_LD: &str = "application/ld+json";
const LDP_NON_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#NonRDFSource";

/// Repository client over HTTP.
///
/// `describe` reads the resource's JSON-LD and `Link: rel="type"` headers;
/// `check_fixity` reads the PREMIS report at `{resource}/fcr:fixity`.
#[derive(Debug, Clone)]
pub struct HttpRepositoryClient {
    client: reqwest::Client,
    username: String,
    password: String,
    binary_type: String,
}

impl HttpRepositoryClient {
    /// Build a client from the repository section of the blueprint.
    ///
    /// # Errors
    /// `Configuration` when the HTTP client cannot be constructed.
    pub fn new(config: &RepositoryConfig) -> Result<Self, RouterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RouterError::configuration("repository", e.to_string()))?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
            binary_type: config.binary_type.clone(),
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url).header(ACCEPT, JSON_LD);
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }

    async fn send(&self, identifier: &str, url: &str) -> Result<Response, RouterError> {
        debug!(url = %url, "repository request");
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| RouterError::fetch(identifier, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "repository request failed");
            return Err(RouterError::fetch_status(identifier, status.as_u16()));
        }
        Ok(response)
    }

    fn link_types(&self, headers: &HeaderMap) -> BTreeSet<String> {
        let mut types: BTreeSet<String> = headers
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter(|link| link.contains("rel=\"type\"") || link.contains("rel=type"))
            .filter_map(|link| {
                let start = link.find('<')? + 1;
                let end = link[start..].find('>')? + start;
                Some(link[start..end].to_string())
            })
            .collect();

        if types.contains(LDP_NON_RDF_SOURCE) {
            types.insert(self.binary_type.clone());
        }
        types
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"))
}

fn resource_url(base_url: &str, identifier: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        identifier.trim_start_matches('/')
    )
}

async fn read_json(identifier: &str, response: Response) -> Result<Value, RouterError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| RouterError::fetch(identifier, format!("unreadable response: {e}")))
}

impl ResourceFetcher for HttpRepositoryClient {
    #[instrument(name = "repository_describe", skip(self, base_url), fields(identifier = %identifier))]
    async fn describe(
        &self,
        base_url: &str,
        identifier: &str,
    ) -> Result<ResourceDescription, RouterError> {
        let url = resource_url(base_url, identifier);
        let response = self.send(identifier, &url).await?;

        let mut types = self.link_types(response.headers());
        if is_json(response.headers()) {
            let doc = read_json(identifier, response).await?;
            types.extend(jsonld::subject_types(&doc, &url));
        }

        debug!(types = types.len(), "resource described");
        Ok(ResourceDescription {
            identifier: identifier.to_string(),
            types,
        })
    }

    #[instrument(name = "repository_check_fixity", skip(self, base_url), fields(identifier = %identifier))]
    async fn check_fixity(
        &self,
        base_url: &str,
        identifier: &str,
    ) -> Result<FixityReport, RouterError> {
        let url = format!("{}/fcr:fixity", resource_url(base_url, identifier));
        let response = self.send(identifier, &url).await?;
        let doc = read_json(identifier, response).await?;

        let outcome = jsonld::find_literal(&doc, "hasEventOutcome").unwrap_or_else(|| {
            warn!("fixity report carries no outcome");
            String::new()
        });

        Ok(FixityReport {
            outcome,
            digest: jsonld::find_literal(&doc, "hasMessageDigest"),
            size: jsonld::find_literal(&doc, "hasSize").and_then(|s| s.parse().ok()),
        })
    }
}
