//! HTTP client for a Supabase (PostgREST) backend

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::auth::BackendKeyManager;
use super::error::SyncError;
use super::record::{ExamResult, ProgressRecord, StoreOutcome};
use super::remote::RemoteStore;

/// Remote store backed by the `progress` and `exam_results` tables
pub struct SupabaseStore {
    /// HTTP client
    client: Client,
    /// Project URL without trailing slash
    base_url: String,
    /// Anonymous API key
    api_key: String,
}

impl SupabaseStore {
    /// Columns the upsert conflicts on
    const PROGRESS_CONFLICT: &'static str = "user_id,course_id";
    /// Request timeout
    const TIMEOUT_SECS: u64 = 10;

    /// Create a client for the project at `base_url`
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(Self::TIMEOUT_SECS))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url, api_key: api_key.into() })
    }

    /// Connect using the configured URL and the stored backend key
    pub fn connect(backend_url: Option<String>) -> Result<Self, SyncError> {
        let url = backend_url.ok_or(SyncError::NotConfigured)?;
        let key = match BackendKeyManager::get_key() {
            Ok(key) => key,
            Err(SyncError::KeyNotFound) => return Err(SyncError::NotConfigured),
            Err(e) => return Err(e),
        };
        Self::new(url, key)
    }

    /// REST endpoint for a table
    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the key headers every request needs
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Turn a non-2xx response into an error
    async fn check_status(response: Response) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(SyncError::ApiError { status: status.as_u16(), message })
    }

    /// GET rows from a table with PostgREST query parameters
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SyncError> {
        let response =
            self.authorized(self.client.get(self.table_url(table))).query(query).send().await?;
        let response = Self::check_status(response).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn try_fetch_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<ProgressRecord>, SyncError> {
        let rows: Vec<ProgressRecord> = self
            .select(
                "progress",
                &[
                    ("user_id", format!("eq.{}", user_id)),
                    ("course_id", format!("eq.{}", course_id)),
                    ("select", "*".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn try_upsert_progress(&self, record: &ProgressRecord) -> Result<(), SyncError> {
        let response = self
            .authorized(self.client.post(self.table_url("progress")))
            .query(&[("on_conflict", Self::PROGRESS_CONFLICT)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn try_fetch_exam_results(&self, user_id: &str) -> Result<Vec<ExamResult>, SyncError> {
        self.select(
            "exam_results",
            &[
                ("user_id", format!("eq.{}", user_id)),
                ("select", "user_id,score,max_score".to_string()),
            ],
        )
        .await
    }
}

/// Convert an error into a failure outcome, pointing at the key when the
/// backend rejected it
fn failure<T>(operation: &str, error: SyncError) -> StoreOutcome<T> {
    if error.requires_reauth() {
        tracing::warn!("Backend rejected the key during {}", operation);
        StoreOutcome::Failure(format!("{}; check the key with `ilmos backend-key`", error))
    } else if error.is_transient() {
        tracing::debug!("Temporary backend failure during {}: {}", operation, error);
        StoreOutcome::Failure(format!("{} (temporary)", error))
    } else {
        StoreOutcome::Failure(error.to_string())
    }
}

#[async_trait]
impl RemoteStore for SupabaseStore {
    async fn fetch_progress(&self, user_id: &str, course_id: &str) -> StoreOutcome<ProgressRecord> {
        match self.try_fetch_progress(user_id, course_id).await {
            Ok(Some(record)) => StoreOutcome::Success(record),
            Ok(None) => StoreOutcome::NotFound,
            Err(e) => failure("progress fetch", e),
        }
    }

    async fn upsert_progress(&self, record: &ProgressRecord) -> StoreOutcome<()> {
        match self.try_upsert_progress(record).await {
            Ok(()) => StoreOutcome::Success(()),
            Err(e) => failure("progress upsert", e),
        }
    }

    async fn fetch_exam_results(&self, user_id: &str) -> StoreOutcome<Vec<ExamResult>> {
        match self.try_fetch_exam_results(user_id).await {
            Ok(results) => StoreOutcome::Success(results),
            Err(e) => failure("exam results fetch", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_strips_trailing_slash() {
        let store = SupabaseStore::new("https://demo.supabase.co/", "anon-key").unwrap();
        assert_eq!(store.base_url, "https://demo.supabase.co");
        assert_eq!(store.table_url("progress"), "https://demo.supabase.co/rest/v1/progress");
    }

    #[test]
    fn requests_carry_key_headers() {
        let store = SupabaseStore::new("https://demo.supabase.co", "anon-key").unwrap();
        let request = store
            .authorized(store.client.get(store.table_url("exam_results")))
            .query(&[("user_id", "eq.u-1")])
            .build()
            .unwrap();

        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["Authorization"], "Bearer anon-key");
        assert_eq!(request.url().query(), Some("user_id=eq.u-1"));
    }

    #[test]
    fn missing_url_is_not_configured() {
        assert!(matches!(SupabaseStore::connect(None), Err(SyncError::NotConfigured)));
    }

    #[test]
    fn rejected_key_failure_points_at_backend_key() {
        let error = SyncError::ApiError { status: 401, message: "JWT expired".into() };
        let StoreOutcome::Failure(reason) = failure::<()>("progress upsert", error) else {
            panic!("expected failure");
        };
        assert!(reason.contains("ilmos backend-key"));
    }

    #[test]
    fn server_errors_are_marked_temporary() {
        let error = SyncError::ApiError { status: 503, message: "unavailable".into() };
        assert_eq!(
            failure::<()>("progress fetch", error),
            StoreOutcome::Failure("Backend error (503): unavailable (temporary)".into())
        );

        let error = SyncError::ApiError { status: 400, message: "bad column".into() };
        assert_eq!(
            failure::<()>("progress fetch", error),
            StoreOutcome::Failure("Backend error (400): bad column".into())
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_failure_outcome() {
        // Port 9 (discard) on localhost is not serving HTTP
        let store = SupabaseStore::new("http://127.0.0.1:9", "anon-key").unwrap();
        let outcome = store.fetch_progress("u-1", "usool").await;
        assert!(outcome.is_failure());
    }
}
