use crate::core::entity::{Candidate, NaturalKey};
use crate::domain::model::{
    Course, CourseDraft, EntityId, EntityKind, SchoolYear, SchoolYearDraft, Subject, SubjectDraft,
};
use crate::domain::ports::{CatalogStore, ConfigProvider};
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

const SCHOOL_YEARS: &str = "school-years";
const SUBJECTS: &str = "subjects";
const COURSES: &str = "courses";

/// REST client for the school catalog service.
///
/// HTTP 409 is the service's "already exists" signal and maps to
/// `ConflictError`; every other non-2xx status maps to `TransientError`.
/// Request timeouts come from the client and surface as `ApiError`.
#[derive(Debug, Clone)]
pub struct HttpCatalogStore {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpCatalogStore {
    pub fn new(base_url: &str, timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| ProvisionError::InvalidConfigValueError {
            field: "api.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            Duration::from_secs(config.request_timeout_seconds()),
            config.auth_token().map(str::to_string),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ProvisionError::ConfigError {
                message: format!("cannot build endpoint '{}': {}", path, e),
            })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post<D, T>(&self, kind: EntityKind, collection: &str, draft: &D) -> Result<T>
    where
        D: Candidate + Serialize,
        T: DeserializeOwned,
    {
        let url = self.endpoint(collection)?;
        tracing::debug!("POST {} ({})", url, draft.label());
        let response = self.authorize(self.client.post(url)).json(draft).send().await?;
        read_response(response, kind, draft.natural_key(), None).await
    }

    async fn put<D, T>(&self, kind: EntityKind, collection: &str, id: EntityId, draft: &D) -> Result<T>
    where
        D: Candidate + Serialize,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("{}/{}", collection, id))?;
        tracing::debug!("PUT {} ({})", url, draft.label());
        let response = self.authorize(self.client.put(url)).json(draft).send().await?;
        read_response(response, kind, draft.natural_key(), Some(id)).await
    }

    async fn get_all<T: DeserializeOwned>(&self, kind: EntityKind, collection: &str) -> Result<Vec<T>> {
        let url = self.endpoint(collection)?;
        tracing::debug!("GET {}", url);
        let response = self.authorize(self.client.get(url)).send().await?;
        read_response(response, kind, None, None).await
    }
}

async fn read_response<T: DeserializeOwned>(
    response: Response,
    kind: EntityKind,
    key: Option<NaturalKey>,
    id: Option<EntityId>,
) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    tracing::debug!("{} request failed with {}: {}", kind, status, body);

    match (status, id) {
        (StatusCode::CONFLICT, _) => Err(ProvisionError::conflict(
            kind.as_str(),
            key.map(|k| k.to_string()).unwrap_or_else(|| body.to_string()),
        )),
        (StatusCode::NOT_FOUND, Some(id)) => Err(ProvisionError::NotFoundError {
            kind: kind.to_string(),
            id,
        }),
        _ if body.is_empty() => Err(ProvisionError::transient(format!("HTTP {}", status))),
        _ => Err(ProvisionError::transient(format!("HTTP {}: {}", status, body))),
    }
}

#[async_trait]
impl CatalogStore for HttpCatalogStore {
    async fn create_school_year(&self, draft: &SchoolYearDraft) -> Result<SchoolYear> {
        self.post(EntityKind::SchoolYear, SCHOOL_YEARS, draft).await
    }

    async fn create_subject(&self, draft: &SubjectDraft) -> Result<Subject> {
        self.post(EntityKind::Subject, SUBJECTS, draft).await
    }

    async fn create_course(&self, draft: &CourseDraft) -> Result<Course> {
        self.post(EntityKind::Course, COURSES, draft).await
    }

    async fn update_school_year(&self, id: EntityId, draft: &SchoolYearDraft) -> Result<SchoolYear> {
        self.put(EntityKind::SchoolYear, SCHOOL_YEARS, id, draft).await
    }

    async fn update_subject(&self, id: EntityId, draft: &SubjectDraft) -> Result<Subject> {
        self.put(EntityKind::Subject, SUBJECTS, id, draft).await
    }

    async fn update_course(&self, id: EntityId, draft: &CourseDraft) -> Result<Course> {
        self.put(EntityKind::Course, COURSES, id, draft).await
    }

    async fn list_school_years(&self) -> Result<Vec<SchoolYear>> {
        self.get_all(EntityKind::SchoolYear, SCHOOL_YEARS).await
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.get_all(EntityKind::Subject, SUBJECTS).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        self.get_all(EntityKind::Course, COURSES).await
    }
}
