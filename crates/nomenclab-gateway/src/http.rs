//! reqwest-backed implementation of [`CatalogGateway`].
//!
//! Follows one shape for every call: build the request, attach identity
//! headers when the call mutates, send, then map the outcome into the
//! [`RemoteError`] taxonomy. Connection-level failures become
//! [`RemoteError::Network`], non-2xx statuses split into client/server by
//! status class, and body parse failures become [`RemoteError::Decode`].
//!
//! Sub-resource mutations (`PUT .../nbu`, determination attach/detach,
//! synonym and abbreviation edits) carry the last-observed
//! `entityVersion` as a query parameter; the body is the referenced id or
//! id list, matching the remote contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use nomenclab_core::{
    Analysis, Determination, EntityId, Nbu, NomenclatureVersion, Page, RemoteError, Result,
    SampleType, SortSpec, WorksheetSetting,
};
use nomenclab_session::SessionContext;

use crate::config::GatewayConfig;
use crate::gateway::CatalogGateway;

/// HTTP gateway to the remote catalog store.
pub struct HttpCatalogGateway {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl HttpCatalogGateway {
    /// Build a gateway from a configuration and a session context.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Network`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &GatewayConfig, session: Arc<SessionContext>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RemoteError::network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Start a request; mutating calls get the identity headers.
    fn request(&self, method: reqwest::Method, url: &str, mutating: bool) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url);
        if mutating
            && let Some(identity) = self.session.identity()
        {
            req = req.header("X-User", identity.user);
            if let Some(token) = identity.bearer {
                req = req.bearer_auth(token);
            }
        }
        req.header("Accept", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let resp = req.send().await.map_err(map_send_error)?;
        handle_response(resp).await
    }

    async fn send_unit(&self, req: reqwest::RequestBuilder) -> Result<()> {
        let resp = req.send().await.map_err(map_send_error)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "remote call rejected");
        Err(RemoteError::from_status(status.as_u16(), error_detail(&body)))
    }
}

fn map_send_error(err: reqwest::Error) -> RemoteError {
    RemoteError::network(err.to_string())
}

/// Pull a human-readable detail out of an error body.
///
/// The remote store answers errors with `{"message": "..."}`; fall back to
/// the raw body when it does not.
fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body)
        && let Some(message) = json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(Value::as_str)
    {
        return message.to_string();
    }
    body.to_string()
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await.map_err(map_send_error)?;

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "remote call rejected");
        return Err(RemoteError::from_status(status.as_u16(), error_detail(&body)));
    }

    serde_json::from_str(&body).map_err(|e| RemoteError::decode(e.to_string()))
}

fn require_version(entity: &'static str, entity_version: Option<i64>) -> Result<i64> {
    entity_version.ok_or(RemoteError::MissingEntityVersion { entity })
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    async fn analysis_page(
        &self,
        page: u32,
        size: u32,
        sort: &SortSpec,
        filters: &[(String, String)],
    ) -> Result<Page<Analysis>> {
        let url = self.url("analysis/page");
        let req = self
            .request(reqwest::Method::GET, &url, false)
            .query(&[
                ("page", page.to_string()),
                ("size", size.to_string()),
                ("sortBy", sort.sort_by.clone()),
                ("isAscending", sort.ascending.to_string()),
            ])
            .query(filters);
        self.send(req).await
    }

    async fn analysis_by_id(&self, id: EntityId) -> Result<Analysis> {
        let url = self.url(&format!("analysis/{id}"));
        self.send(self.request(reqwest::Method::GET, &url, false)).await
    }

    async fn patch_analysis(&self, analysis: &Analysis) -> Result<Analysis> {
        require_version("Analysis", analysis.entity_version)?;
        let url = self.url(&format!("analysis/{}", analysis.id));
        let req = self
            .request(reqwest::Method::PATCH, &url, true)
            .json(analysis);
        self.send(req).await
    }

    async fn set_analysis_nbu(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        nbu_id: EntityId,
    ) -> Result<Analysis> {
        let url = self.url(&format!("analysis/{analysis_id}/nbu"));
        let req = self
            .request(reqwest::Method::PUT, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&nbu_id);
        self.send(req).await
    }

    async fn set_analysis_sample_type(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        sample_type_id: EntityId,
    ) -> Result<Analysis> {
        let url = self.url(&format!("analysis/{analysis_id}/sample_type"));
        let req = self
            .request(reqwest::Method::PUT, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&sample_type_id);
        self.send(req).await
    }

    async fn set_analysis_worksheet_setting(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        worksheet_setting_id: EntityId,
    ) -> Result<Analysis> {
        let url = self.url(&format!("analysis/{analysis_id}/worksheet_setting"));
        let req = self
            .request(reqwest::Method::PUT, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&worksheet_setting_id);
        self.send(req).await
    }

    async fn add_determinations(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        determination_ids: &[EntityId],
    ) -> Result<Analysis> {
        let url = self.url(&format!("analysis/{analysis_id}/determinations"));
        let req = self
            .request(reqwest::Method::POST, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&determination_ids);
        self.send(req).await
    }

    async fn remove_determinations(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        determination_ids: &[EntityId],
    ) -> Result<Analysis> {
        let url = self.url(&format!("analysis/{analysis_id}/determinations"));
        let req = self
            .request(reqwest::Method::DELETE, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&determination_ids);
        self.send(req).await
    }

    async fn determinations(&self) -> Result<Vec<Determination>> {
        let url = self.url("determinations");
        self.send(self.request(reqwest::Method::GET, &url, false)).await
    }

    async fn upsert_determination(&self, determination: &Determination) -> Result<Determination> {
        let url = self.url("determinations");
        let req = self
            .request(reqwest::Method::PUT, &url, true)
            .json(determination);
        self.send(req).await
    }

    async fn upsert_sample_type(&self, sample_type: &SampleType) -> Result<SampleType> {
        let url = self.url("sample_types");
        let req = self
            .request(reqwest::Method::PUT, &url, true)
            .json(sample_type);
        self.send(req).await
    }

    async fn upsert_worksheet_setting(
        &self,
        worksheet_setting: &WorksheetSetting,
    ) -> Result<WorksheetSetting> {
        let url = self.url("worksheet_settings");
        let req = self
            .request(reqwest::Method::PUT, &url, true)
            .json(worksheet_setting);
        self.send(req).await
    }

    async fn nomenclature_versions(&self) -> Result<Vec<NomenclatureVersion>> {
        let url = self.url("analysis/nbu/versions");
        self.send(self.request(reqwest::Method::GET, &url, false)).await
    }

    async fn upsert_nomenclature_version(
        &self,
        version: &NomenclatureVersion,
    ) -> Result<NomenclatureVersion> {
        if version.id.is_some() {
            require_version("NomenclatureVersion", version.entity_version)?;
        }
        let url = self.url("analysis/nbu/versions/version");
        let req = self
            .request(reqwest::Method::PUT, &url, true)
            .json(version);
        self.send(req).await
    }

    async fn versions_with_nbus(&self) -> Result<Vec<NomenclatureVersion>> {
        let url = self.url("analysis/nbu/versions/nbu_detail");
        self.send(self.request(reqwest::Method::GET, &url, false)).await
    }

    async fn associate_nbu(&self, nbu_id: EntityId, version_id: EntityId, ub: f64) -> Result<()> {
        let url = self.url(&format!("nbu/{nbu_id}/version/{version_id}"));
        let req = self.request(reqwest::Method::PUT, &url, true).json(&ub);
        self.send_unit(req).await
    }

    async fn disassociate_nbu(&self, nbu_id: EntityId, version_id: EntityId) -> Result<()> {
        let url = self.url(&format!("nbu/{nbu_id}/version/{version_id}"));
        self.send_unit(self.request(reqwest::Method::DELETE, &url, true))
            .await
    }

    async fn patch_nbu(&self, nbu: &Nbu) -> Result<Nbu> {
        require_version("Nbu", nbu.entity_version)?;
        let url = self.url(&format!("nbu/{}", nbu.id));
        let req = self.request(reqwest::Method::PATCH, &url, true).json(nbu);
        self.send(req).await
    }

    async fn add_nbu_synonyms(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu> {
        let url = self.url(&format!("nbu/{nbu_id}/synonyms"));
        let req = self
            .request(reqwest::Method::POST, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&values);
        self.send(req).await
    }

    async fn remove_nbu_synonyms(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu> {
        let url = self.url(&format!("nbu/{nbu_id}/synonyms"));
        let req = self
            .request(reqwest::Method::DELETE, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&values);
        self.send(req).await
    }

    async fn add_nbu_abbreviations(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu> {
        let url = self.url(&format!("nbu/{nbu_id}/abbreviations"));
        let req = self
            .request(reqwest::Method::POST, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&values);
        self.send(req).await
    }

    async fn remove_nbu_abbreviations(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu> {
        let url = self.url(&format!("nbu/{nbu_id}/abbreviations"));
        let req = self
            .request(reqwest::Method::DELETE, &url, true)
            .query(&[("entityVersion", entity_version)])
            .json(&values);
        self.send(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_message_field() {
        assert_eq!(error_detail(r#"{"message": "stale version"}"#), "stale version");
        assert_eq!(error_detail(r#"{"error": "nope"}"#), "nope");
        assert_eq!(error_detail("plain text"), "plain text");
    }

    #[test]
    fn require_version_rejects_absent() {
        assert_eq!(require_version("Analysis", Some(4)).unwrap(), 4);
        let err = require_version("Analysis", None).unwrap_err();
        assert!(matches!(err, RemoteError::MissingEntityVersion { entity: "Analysis" }));
    }
}
