use crate::{
    error::ApiErrorDocument,
    ApiErrorObject,
    ApiFuture,
    ClientError,
    ListUsersOptions,
    ListUsersResponse,
    PagerdutyApi,
    Report,
    ServiceMetricReportParams,
};
use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        ACCEPT,
        AUTHORIZATION,
        CONTENT_TYPE,
    },
    Method,
    RequestBuilder,
    Response,
};
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use std::time::Duration;
use strum::{
    Display,
    EnumString,
};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.pagerduty.com";

const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";
const ANALYTICS_SERVICES_PATH: &str = "/analytics/metrics/incidents/services";
const USERS_PATH: &str = "/users";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How the API token is presented to PagerDuty.
#[derive(Debug, Default, Clone, Copy, Display, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthMode {
    /// Account or user API token: `Authorization: Token token=<token>`.
    #[default]
    Token,
    /// OAuth access token: `Authorization: Bearer <token>`.
    OAuth,
}

impl AuthMode {
    fn header_value(&self, token: &str) -> String {
        match self {
            AuthMode::Token => format!("Token token={token}"),
            AuthMode::OAuth => format!("Bearer {token}"),
        }
    }
}

#[derive(Clone, derive_more::Debug)]
pub struct PagerdutyClient {
    #[debug(skip)]
    http: reqwest::Client,
    api_url: Url,
    #[debug(skip)]
    auth_token: String,
    auth_mode: AuthMode,
}

impl PagerdutyClient {
    pub fn new(auth_token: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url: Url::parse(DEFAULT_API_URL)?,
            auth_token: auth_token.into(),
            auth_mode: AuthMode::default(),
        })
    }

    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.api_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V2));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(self
            .http
            .request(method, self.endpoint(path)?)
            .headers(headers)
            .header(AUTHORIZATION, self.auth_mode.header_value(&self.auth_token)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let response = check_response(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn query_metric_report(&self, params: &ServiceMetricReportParams) -> Result<Report, ClientError> {
        debug!(
            start = %params.filters.created_at_start.format(),
            end = %params.filters.created_at_end.format(),
            "querying service analytics report"
        );

        let request = self
            .request(Method::POST, ANALYTICS_SERVICES_PATH)?
            .header("X-EARLY-ACCESS", "analytics-v2")
            .json(params);

        self.send(request).await
    }

    pub async fn list_users(&self, options: &ListUsersOptions) -> Result<ListUsersResponse, ClientError> {
        debug!(limit = options.limit, offset = options.offset, "listing users");

        let request = self.request(Method::GET, USERS_PATH)?.query(options);

        self.send(request).await
    }
}

impl PagerdutyApi for PagerdutyClient {
    fn query_metric_report(&self, params: ServiceMetricReportParams) -> ApiFuture<'_, Report> {
        Box::pin(async move { PagerdutyClient::query_metric_report(self, &params).await })
    }

    fn list_users(&self, options: ListUsersOptions) -> ApiFuture<'_, ListUsersResponse> {
        Box::pin(async move { PagerdutyClient::list_users(self, &options).await })
    }
}

/// Turn non-2xx responses into [`ClientError::Api`], decoding PagerDuty's
/// error document when the response claims to be JSON.
async fn check_response(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let error = if is_json {
        match response.json::<ApiErrorDocument>().await {
            Ok(document) => document.error,
            Err(e) => {
                debug!(error = %e, %status, "could not decode PagerDuty error document");
                ApiErrorObject::default()
            }
        }
    } else {
        ApiErrorObject::default()
    };

    Err(ClientError::Api { status, error })
}
