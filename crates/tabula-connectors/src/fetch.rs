//! The remote fetcher: issues paginated requests against one endpoint and
//! accumulates raw records in arrival order.

use std::time::{Duration, Instant};

use tabula_core::QueryError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::http::{HttpClient, HttpMethod};

/// A raw record as returned by the backing service, field names untouched.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Where the translated filter payload travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPlacement {
    /// Flattened into URL query parameters.
    QueryParams,
    /// Merged into the JSON request body.
    JsonBody,
}

/// Pagination dialect of one endpoint.
#[derive(Debug, Clone)]
pub struct PageSpec {
    /// Parameter carrying the per-page record count, if the service has one.
    pub size_param: Option<String>,
    /// Parameter carrying the absolute record offset. Without it the
    /// endpoint is single-shot: only the first page can be requested.
    pub offset_param: Option<String>,
    /// Records requested per page.
    pub page_size: usize,
    /// Hard cap on pages per fetch; exceeding it is an error, not a
    /// truncation.
    pub max_pages: u32,
}

impl PageSpec {
    pub fn single_shot(size_param: Option<&str>, page_size: usize) -> Self {
        Self {
            size_param: size_param.map(String::from),
            offset_param: None,
            page_size,
            max_pages: 1,
        }
    }

    pub fn offset_based(size_param: &str, offset_param: &str, page_size: usize, max_pages: u32) -> Self {
        Self {
            size_param: Some(size_param.to_string()),
            offset_param: Some(offset_param.to_string()),
            page_size,
            max_pages,
        }
    }

    /// Whether the service can start a page at an arbitrary offset, which
    /// is what remote LIMIT/OFFSET enforcement requires.
    pub fn supports_offset(&self) -> bool {
        self.offset_param.is_some()
    }
}

/// Where records live inside the response envelope.
#[derive(Debug, Clone)]
pub struct RecordsLocation {
    /// JSON pointer to the record array ("" means the body root).
    pub pointer: String,
    /// JSON pointer to the service-reported total record count, if any.
    pub total_pointer: Option<String>,
    /// The value at `pointer` is itself a JSON-encoded string holding the
    /// record array, and needs a second parse.
    pub json_encoded: bool,
}

impl RecordsLocation {
    pub fn at_root() -> Self {
        Self {
            pointer: String::new(),
            total_pointer: None,
            json_encoded: false,
        }
    }

    pub fn at(pointer: &str) -> Self {
        Self {
            pointer: pointer.to_string(),
            total_pointer: None,
            json_encoded: false,
        }
    }

    pub fn with_total(mut self, pointer: &str) -> Self {
        self.total_pointer = Some(pointer.to_string());
        self
    }

    pub fn json_encoded(mut self) -> Self {
        self.json_encoded = true;
        self
    }
}

/// Full description of a table's backing endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub method: HttpMethod,
    pub path: String,
    pub placement: PayloadPlacement,
    /// Parameters sent with every request (scoping, flags).
    pub base_params: Vec<(String, String)>,
    pub page: PageSpec,
    pub records: RecordsLocation,
}

/// Caller-supplied abort and deadline handles, shared across every page
/// request of one query.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub deadline: Option<Instant>,
    pub cancel: CancellationToken,
}

impl FetchContext {
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            deadline: None,
            cancel,
        }
    }

    /// Time left until the deadline, saturating at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Fetch records from `endpoint`, paginating until the service reports the
/// end of its list or `target` records (counted from `start`) have arrived.
///
/// `target = None` fetches the complete list, bounded only by the page cap.
/// Cancellation mid-pagination discards everything fetched so far.
pub async fn fetch(
    client: &dyn HttpClient,
    endpoint: &EndpointSpec,
    payload: &serde_json::Value,
    start: usize,
    target: Option<usize>,
    ctx: &FetchContext,
) -> Result<Vec<RawRecord>, QueryError> {
    let mut fetched: Vec<RawRecord> = Vec::new();
    let mut pages: u32 = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        if pages >= endpoint.page.max_pages {
            return Err(QueryError::PaginationLimitExceeded { pages });
        }

        let want = match target {
            Some(t) if t > fetched.len() => Some(t - fetched.len()),
            Some(_) => Some(0),
            None => None,
        };
        let request_size = want.map_or(endpoint.page.page_size, |w| w.min(endpoint.page.page_size));
        let (params, body) = build_request(endpoint, payload, start + fetched.len(), request_size)?;

        let response = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(QueryError::Cancelled),
            r = client.request(
                endpoint.method,
                &endpoint.path,
                &params,
                body.as_ref(),
                ctx.remaining(),
            ) => r?,
        };
        pages += 1;

        if !response.is_success() {
            return Err(QueryError::RemoteRequest {
                status: Some(response.status),
                body: response.body,
            });
        }

        let envelope: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|e| {
                QueryError::invalid_record(format!("response is not valid JSON: {}", e))
            })?;
        let records = extract_records(&envelope, &endpoint.records)?;
        let total = extract_total(&envelope, &endpoint.records);
        let received = records.len();
        fetched.extend(records);

        debug!(
            "page {}: {} records ({} accumulated, total reported: {:?})",
            pages,
            received,
            fetched.len(),
            total
        );

        if let Some(t) = target {
            if fetched.len() >= t {
                fetched.truncate(t);
                break;
            }
        }
        if received == 0 {
            break;
        }
        if let Some(total) = total {
            if fetched.len() >= total {
                break;
            }
        }
        if !endpoint.page.supports_offset() {
            break;
        }
        if received < request_size {
            break;
        }
    }

    Ok(fetched)
}

/// Assemble query parameters and body for one page request.
fn build_request(
    endpoint: &EndpointSpec,
    payload: &serde_json::Value,
    offset: usize,
    size: usize,
) -> Result<(Vec<(String, String)>, Option<serde_json::Value>), QueryError> {
    let mut params = endpoint.base_params.clone();
    let mut body: Option<serde_json::Map<String, serde_json::Value>> = None;

    match endpoint.placement {
        PayloadPlacement::QueryParams => {
            match payload {
                serde_json::Value::Null => {}
                serde_json::Value::Object(map) => {
                    for (name, value) in map {
                        params.push((name.clone(), param_string(value)));
                    }
                }
                other => {
                    return Err(QueryError::invalid_record(format!(
                        "query-parameter payload must be an object, got {}",
                        other
                    )));
                }
            }
            if let Some(ref size_param) = endpoint.page.size_param {
                params.push((size_param.clone(), size.to_string()));
            }
            if let Some(ref offset_param) = endpoint.page.offset_param {
                params.push((offset_param.clone(), offset.to_string()));
            }
        }
        PayloadPlacement::JsonBody => {
            let mut map = match payload {
                serde_json::Value::Null => serde_json::Map::new(),
                serde_json::Value::Object(map) => map.clone(),
                other => {
                    return Err(QueryError::invalid_record(format!(
                        "body payload must be an object, got {}",
                        other
                    )));
                }
            };
            if let Some(ref size_param) = endpoint.page.size_param {
                map.insert(size_param.clone(), serde_json::json!(size));
            }
            if let Some(ref offset_param) = endpoint.page.offset_param {
                map.insert(offset_param.clone(), serde_json::json!(offset));
            }
            body = Some(map);
        }
    }

    Ok((params, body.map(serde_json::Value::Object)))
}

fn param_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_records(
    envelope: &serde_json::Value,
    location: &RecordsLocation,
) -> Result<Vec<RawRecord>, QueryError> {
    let at_pointer = if location.pointer.is_empty() {
        envelope
    } else {
        envelope.pointer(&location.pointer).ok_or_else(|| {
            QueryError::invalid_record(format!(
                "response has no value at pointer '{}'",
                location.pointer
            ))
        })?
    };

    let decoded;
    let array_holder = if location.json_encoded {
        let text = at_pointer.as_str().ok_or_else(|| {
            QueryError::invalid_record(format!(
                "expected JSON-encoded string at pointer '{}'",
                location.pointer
            ))
        })?;
        decoded = serde_json::from_str::<serde_json::Value>(text).map_err(|e| {
            QueryError::invalid_record(format!("inner JSON failed to parse: {}", e))
        })?;
        &decoded
    } else {
        at_pointer
    };

    let array = array_holder.as_array().ok_or_else(|| {
        QueryError::invalid_record(format!(
            "expected a record array at pointer '{}'",
            location.pointer
        ))
    })?;

    array
        .iter()
        .map(|item| {
            item.as_object().cloned().ok_or_else(|| {
                QueryError::invalid_record("record array contains a non-object entry".to_string())
            })
        })
        .collect()
}

fn extract_total(envelope: &serde_json::Value, location: &RecordsLocation) -> Option<usize> {
    let pointer = location.total_pointer.as_deref()?;
    envelope.pointer(pointer)?.as_u64().map(|n| n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves `records` in pages, honouring size/offset parameters and
    /// wrapping the page in a context-store style envelope.
    struct PagedService {
        records: Vec<serde_json::Value>,
        calls: AtomicUsize,
        requests: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl PagedService {
        fn new(n: usize) -> Self {
            let records = (0..n)
                .map(|i| serde_json::json!({"id": i.to_string(), "name": format!("r{}", i)}))
                .collect();
            Self {
                records,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn param(params: &[(String, String)], name: &str) -> Option<usize> {
            params
                .iter()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse().ok())
        }
    }

    #[async_trait]
    impl HttpClient for PagedService {
        async fn request(
            &self,
            _method: HttpMethod,
            _path: &str,
            params: &[(String, String)],
            _json_body: Option<&serde_json::Value>,
            _timeout: Option<Duration>,
        ) -> Result<HttpResponse, QueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(params.to_vec());
            let size = Self::param(params, "maxResultCount").unwrap_or(self.records.len());
            let offset = Self::param(params, "skipCount").unwrap_or(0);
            let page: Vec<_> = self.records.iter().skip(offset).take(size).cloned().collect();
            let body = serde_json::json!({
                "result": {"items": page, "totalCount": self.records.len()}
            });
            Ok(HttpResponse {
                status: 200,
                body: body.to_string(),
            })
        }
    }

    fn paged_endpoint(page_size: usize, max_pages: u32) -> EndpointSpec {
        EndpointSpec {
            method: HttpMethod::Get,
            path: "Context/GetContexts".to_string(),
            placement: PayloadPlacement::QueryParams,
            base_params: vec![],
            page: PageSpec::offset_based("maxResultCount", "skipCount", page_size, max_pages),
            records: RecordsLocation::at("/result/items").with_total("/result/totalCount"),
        }
    }

    #[tokio::test]
    async fn test_pagination_returns_all_records_in_expected_calls() {
        let service = PagedService::new(5);
        let endpoint = paged_endpoint(2, 100);
        let records = fetch(
            &service,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::unbounded(),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 5);
        // ceil(5 / 2)
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        // order preserved across pages
        let ids: Vec<_> = records.iter().map(|r| r["id"].as_str().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_pagination_exact_multiple_stops_on_total() {
        let service = PagedService::new(6);
        let endpoint = paged_endpoint(3, 100);
        let records = fetch(
            &service,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::unbounded(),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_honours_target() {
        let service = PagedService::new(10);
        let endpoint = paged_endpoint(4, 100);
        let records = fetch(
            &service,
            &endpoint,
            &serde_json::Value::Null,
            0,
            Some(5),
            &FetchContext::unbounded(),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_starts_at_offset() {
        let service = PagedService::new(10);
        let endpoint = paged_endpoint(4, 100);
        let records = fetch(
            &service,
            &endpoint,
            &serde_json::Value::Null,
            6,
            Some(2),
            &FetchContext::unbounded(),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "6");
        assert_eq!(records[1]["id"], "7");
    }

    #[tokio::test]
    async fn test_page_cap_is_an_error_not_truncation() {
        /// Always returns a full page and never a total, simulating a
        /// service whose pagination never converges.
        struct BottomlessService;

        #[async_trait]
        impl HttpClient for BottomlessService {
            async fn request(
                &self,
                _method: HttpMethod,
                _path: &str,
                params: &[(String, String)],
                _json_body: Option<&serde_json::Value>,
                _timeout: Option<Duration>,
            ) -> Result<HttpResponse, QueryError> {
                let size = PagedService::param(params, "maxResultCount").unwrap_or(2);
                let page: Vec<_> = (0..size).map(|i| serde_json::json!({"id": i})).collect();
                Ok(HttpResponse {
                    status: 200,
                    body: serde_json::json!({"result": {"items": page}}).to_string(),
                })
            }
        }

        let mut endpoint = paged_endpoint(2, 4);
        endpoint.records.total_pointer = None;
        let err = fetch(
            &BottomlessService,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::unbounded(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QueryError::PaginationLimitExceeded { pages: 4 }));
    }

    #[tokio::test]
    async fn test_single_shot_endpoint_makes_one_call() {
        let service = PagedService::new(5);
        let endpoint = EndpointSpec {
            method: HttpMethod::Get,
            path: "instances/1/products".to_string(),
            placement: PayloadPlacement::QueryParams,
            base_params: vec![],
            page: PageSpec::single_shot(Some("maxResultCount"), 3),
            records: RecordsLocation::at("/result/items"),
        };
        let records = fetch(
            &service,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::unbounded(),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_status_and_body() {
        struct FailingService;

        #[async_trait]
        impl HttpClient for FailingService {
            async fn request(
                &self,
                _method: HttpMethod,
                _path: &str,
                _params: &[(String, String)],
                _json_body: Option<&serde_json::Value>,
                _timeout: Option<Duration>,
            ) -> Result<HttpResponse, QueryError> {
                Ok(HttpResponse {
                    status: 403,
                    body: "token expired".to_string(),
                })
            }
        }

        let endpoint = paged_endpoint(2, 10);
        let err = fetch(
            &FailingService,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::unbounded(),
        )
        .await
        .unwrap_err();
        match err {
            QueryError::RemoteRequest { status, body } => {
                assert_eq!(status, Some(403));
                assert_eq!(body, "token expired");
            }
            other => panic!("expected RemoteRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let service = PagedService::new(5);
        let endpoint = paged_endpoint(2, 10);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetch(
            &service,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::with_cancel(cancel),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_mid_pagination_discards_partial_pages() {
        /// Cancels the shared token while serving the second page.
        struct CancellingService {
            inner: PagedService,
            cancel: CancellationToken,
        }

        #[async_trait]
        impl HttpClient for CancellingService {
            async fn request(
                &self,
                method: HttpMethod,
                path: &str,
                params: &[(String, String)],
                json_body: Option<&serde_json::Value>,
                timeout: Option<Duration>,
            ) -> Result<HttpResponse, QueryError> {
                if self.inner.calls.load(Ordering::SeqCst) == 1 {
                    self.cancel.cancel();
                }
                self.inner.request(method, path, params, json_body, timeout).await
            }
        }

        let cancel = CancellationToken::new();
        let service = CancellingService {
            inner: PagedService::new(10),
            cancel: cancel.clone(),
        };
        let endpoint = paged_endpoint(2, 100);
        let err = fetch(
            &service,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::with_cancel(cancel),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
    }

    #[tokio::test]
    async fn test_json_encoded_record_array() {
        struct EncodedService;

        #[async_trait]
        impl HttpClient for EncodedService {
            async fn request(
                &self,
                _method: HttpMethod,
                _path: &str,
                _params: &[(String, String)],
                _json_body: Option<&serde_json::Value>,
                _timeout: Option<Duration>,
            ) -> Result<HttpResponse, QueryError> {
                let inner = serde_json::json!([{"Name": "lead-1"}, {"Name": "lead-2"}]);
                let body = serde_json::json!({"jsonValue": inner.to_string()});
                Ok(HttpResponse {
                    status: 200,
                    body: body.to_string(),
                })
            }
        }

        let endpoint = EndpointSpec {
            method: HttpMethod::Post,
            path: "api/EntityService/leads/query_expansion".to_string(),
            placement: PayloadPlacement::JsonBody,
            base_params: vec![],
            page: PageSpec::single_shot(Some("limit"), 100),
            records: RecordsLocation::at("/jsonValue").json_encoded(),
        };
        let records = fetch(
            &EncodedService,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::unbounded(),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Name"], "lead-1");
    }

    #[tokio::test]
    async fn test_body_payload_merged_with_page_fields() {
        struct CapturingService {
            bodies: Mutex<Vec<serde_json::Value>>,
        }

        #[async_trait]
        impl HttpClient for CapturingService {
            async fn request(
                &self,
                _method: HttpMethod,
                _path: &str,
                _params: &[(String, String)],
                json_body: Option<&serde_json::Value>,
                _timeout: Option<Duration>,
            ) -> Result<HttpResponse, QueryError> {
                self.bodies.lock().unwrap().push(json_body.cloned().unwrap());
                Ok(HttpResponse {
                    status: 200,
                    body: serde_json::json!([]).to_string(),
                })
            }
        }

        let service = CapturingService {
            bodies: Mutex::new(Vec::new()),
        };
        let endpoint = EndpointSpec {
            method: HttpMethod::Post,
            path: "api/EntityService/orders/query_expansion".to_string(),
            placement: PayloadPlacement::JsonBody,
            base_params: vec![],
            page: PageSpec::offset_based("limit", "start", 50, 10),
            records: RecordsLocation::at_root(),
        };
        let payload = serde_json::json!({"filterGroup": {"logicalOperator": 0}});
        fetch(&service, &endpoint, &payload, 20, Some(10), &FetchContext::unbounded())
            .await
            .unwrap();
        let bodies = service.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["start"], 20);
        assert_eq!(bodies[0]["limit"], 10);
        assert!(bodies[0]["filterGroup"].is_object());
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_invalid_record() {
        struct BadService;

        #[async_trait]
        impl HttpClient for BadService {
            async fn request(
                &self,
                _method: HttpMethod,
                _path: &str,
                _params: &[(String, String)],
                _json_body: Option<&serde_json::Value>,
                _timeout: Option<Duration>,
            ) -> Result<HttpResponse, QueryError> {
                Ok(HttpResponse {
                    status: 200,
                    body: "<html>not json</html>".to_string(),
                })
            }
        }

        let endpoint = paged_endpoint(2, 10);
        let err = fetch(
            &BadService,
            &endpoint,
            &serde_json::Value::Null,
            0,
            None,
            &FetchContext::unbounded(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidRecord { .. }));
    }
}
