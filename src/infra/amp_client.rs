use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::WorkspaceQuery;
use crate::error::{CardinalityError, Result};

/// Query timestamps sit this far in the past so the samples being counted
/// have already landed in the workspace.
const QUERY_LOOKBACK_SECONDS: f64 = 20.0;

/// Managed Prometheus queries are signed for this service name.
const SIGNING_SERVICE: &str = "aps";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Prometheus-compatible query API client for one Managed Prometheus
/// workspace. Every request is a SigV4-signed GET with credentials resolved
/// freshly per call, since session tokens expire.
pub struct AmpClient {
    http: reqwest::Client,
    credentials: SharedCredentialsProvider,
    region: String,
    endpoint: String,
}

impl AmpClient {
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        workspace_id: &str,
        region: &str,
    ) -> Result<Self> {
        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            CardinalityError::Config("no AWS credentials provider available".to_owned())
        })?;
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http,
            credentials,
            region: region.to_owned(),
            endpoint: workspace_endpoint(region, workspace_id),
        })
    }

    async fn fetch_metric_names(&self) -> Result<Vec<String>> {
        let window = current_window();
        let mut url = self.api_url("label/__name__/values")?;
        url.query_pairs_mut()
            .append_pair("end", &window)
            .append_pair("start", &window);

        let body = self.signed_get(url).await?;
        let decoded: LabelValuesResponse = serde_json::from_str(&body)?;
        if decoded.status != "success" {
            return Err(CardinalityError::Query(format!(
                "label values query returned status {}",
                decoded.status
            )));
        }
        Ok(decoded.data)
    }

    async fn fetch_cardinality(&self, name: &str) -> Result<u64> {
        let window = current_window();
        let mut url = self.api_url("query")?;
        url.query_pairs_mut()
            .append_pair("end", &window)
            .append_pair("start", &window)
            .append_pair("query", &cardinality_query(name));

        let body = self.signed_get(url).await?;
        let decoded: QueryResponse = serde_json::from_str(&body)?;
        cardinality_from_response(&decoded, name)
    }

    fn api_url(&self, path: &str) -> Result<reqwest::Url> {
        reqwest::Url::parse(&format!("{}/api/v1/{path}", self.endpoint))
            .map_err(|err| CardinalityError::Query(err.to_string()))
    }

    async fn signed_get(&self, url: reqwest::Url) -> Result<String> {
        debug!(url = %url, "querying workspace");

        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|err| CardinalityError::Query(err.to_string()))?;
        let identity = credentials.into();

        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|err| CardinalityError::Query(err.to_string()))?
            .into();

        let signable = SignableRequest::new(
            "GET",
            url.as_str(),
            std::iter::empty(),
            SignableBody::Bytes(&[]),
        )
        .map_err(|err| CardinalityError::Query(err.to_string()))?;

        let (instructions, _signature) = sign(signable, &signing_params)
            .map_err(|err| CardinalityError::Query(err.to_string()))?
            .into_parts();

        let mut request = http::Request::builder()
            .method(http::Method::GET)
            .uri(url.as_str())
            .body(String::new())
            .map_err(|err| CardinalityError::Query(err.to_string()))?;
        instructions.apply_to_request_http1x(&mut request);

        let response = self.http.execute(reqwest::Request::try_from(request)?).await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CardinalityError::Query(format!(
                "workspace API returned {status}: {body}"
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl WorkspaceQuery for AmpClient {
    async fn metric_names(&self) -> std::result::Result<Vec<String>, String> {
        self.fetch_metric_names().await.map_err(|err| err.to_string())
    }

    async fn metric_cardinality(&self, name: &str) -> std::result::Result<u64, String> {
        self.fetch_cardinality(name).await.map_err(|err| err.to_string())
    }
}

pub fn workspace_endpoint(region: &str, workspace_id: &str) -> String {
    format!("https://aps-workspaces.{region}.amazonaws.com/workspaces/{workspace_id}")
}

/// Instant-vector query counting the series behind one metric name.
fn cardinality_query(name: &str) -> String {
    format!("count by (__name__) ({{__name__=\"{name}\"}})")
}

fn current_window() -> String {
    format_window(Utc::now().timestamp_millis())
}

fn format_window(now_millis: i64) -> String {
    format!("{:.6}", now_millis as f64 / 1000.0 - QUERY_LOOKBACK_SECONDS)
}

/// `/api/v1/label/__name__/values` response.
#[derive(Debug, Deserialize)]
struct LabelValuesResponse {
    status: String,
    #[serde(default)]
    data: Vec<String>,
}

/// Subset of the `/api/v1/query` response this pipeline reads.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: QueryData,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    /// `[<timestamp>, "<count>"]` pair; the count arrives as a string.
    #[serde(default)]
    pub value: Option<(f64, String)>,
}

/// Pulls the series count out of an instant-vector response.
fn cardinality_from_response(response: &QueryResponse, name: &str) -> Result<u64> {
    if response.status != "success" {
        return Err(CardinalityError::Query(format!(
            "failed getting cardinality for {name}"
        )));
    }
    let value = response
        .data
        .result
        .first()
        .and_then(|sample| sample.value.as_ref())
        .ok_or_else(|| CardinalityError::Query(format!("empty result for {name}")))?;
    value.1.parse::<u64>().map_err(|_| {
        CardinalityError::Query(format!("count {:?} for {name} is not an integer", value.1))
    })
}
