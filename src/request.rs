use log::warn;
use serde_json::{Map, Value};

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::http::HttpRequest;
use crate::response::Response;

/// Backend endpoint templates. Concrete calls append path segments and
/// query parameters at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Authenticate,
    Account,
    AccountSettings,
    AccountActivity,
    User,
    Channel,
    Channels,
}

impl Route {
    pub fn template(&self) -> &'static str {
        match self {
            Route::Authenticate => "authenticate",
            Route::Account => "account",
            Route::AccountSettings => "account/settings",
            Route::AccountActivity => "account/activity",
            Route::User => "user",
            Route::Channel => "channel",
            Route::Channels => "channels",
        }
    }

    pub fn builder(self) -> RequestBuilder {
        RequestBuilder::new(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    /// Structured fields, serialized as a JSON object.
    Json(Map<String, Value>),
    /// A pre-serialized payload sent as-is.
    Raw(Vec<u8>),
}

/// An outgoing call: route, path segments, query, headers, body.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct Request {
    route: Route,
    path: Vec<String>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: RequestBody,
    requires_authentication: bool,
}

impl Request {
    pub fn route(&self) -> Route {
        self.route
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }

    /// Assembles the full URL: `{base}/{template}/{seg}...?{k}={v}&...`.
    pub fn url(&self, base: &str) -> String {
        let mut url = format!("{}/{}", base.trim_end_matches('/'), self.route.template());
        for segment in &self.path {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        for (i, (key, value)) in self.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }
}

pub struct RequestBuilder {
    route: Route,
    path: Vec<String>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    fields: Map<String, Value>,
    raw: Option<Vec<u8>>,
    requires_authentication: bool,
}

impl RequestBuilder {
    fn new(route: Route) -> Self {
        Self {
            route,
            path: Vec::new(),
            query: Vec::new(),
            headers: Vec::new(),
            fields: Map::new(),
            raw: None,
            requires_authentication: true,
        }
    }

    /// Marks the request as not needing a token (the authenticate route).
    pub fn unauthenticated(mut self) -> Self {
        self.requires_authentication = false;
        self
    }

    pub fn path(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Replaces any structured fields with a raw payload.
    pub fn raw_body(mut self, bytes: Vec<u8>) -> Self {
        self.raw = Some(bytes);
        self
    }

    pub fn build(self) -> Request {
        let body = match self.raw {
            Some(bytes) => RequestBody::Raw(bytes),
            None if self.fields.is_empty() => RequestBody::Empty,
            None => RequestBody::Json(self.fields),
        };
        Request {
            route: self.route,
            path: self.path,
            query: self.query,
            headers: self.headers,
            body,
            requires_authentication: self.requires_authentication,
        }
    }
}

impl ApiClient {
    pub async fn get(&self, request: Request) -> Result<Response, ClientError> {
        self.request(request, Method::Get).await
    }

    pub async fn post(&self, request: Request) -> Result<Response, ClientError> {
        self.request(request, Method::Post).await
    }

    pub async fn patch(&self, request: Request) -> Result<Response, ClientError> {
        self.request(request, Method::Patch).await
    }

    pub async fn delete(&self, request: Request) -> Result<Response, ClientError> {
        self.request(request, Method::Delete).await
    }

    /// Executes a request against the backend.
    ///
    /// Transport failures resolve to the client-error sentinel response;
    /// the only immediate failure is the pre-flight rejection of an
    /// auth-required request while no token is held, which performs no
    /// network call at all.
    pub async fn request(&self, request: Request, method: Method) -> Result<Response, ClientError> {
        let token = self.token().await;
        if request.requires_authentication() && token.is_none() {
            return Err(ClientError::NotAuthenticated);
        }

        let url = request.url(self.config.base_url());
        let mut http_request = HttpRequest::new(method.as_str(), &url)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json");
        if let Some(token) = token {
            http_request = http_request.with_header("Authorization", token);
        }
        for (key, value) in request.headers() {
            http_request = http_request.with_header(key.clone(), value.clone());
        }
        match request.body() {
            RequestBody::Empty => {}
            RequestBody::Json(fields) => {
                let body = Value::Object(fields.clone()).to_string().into_bytes();
                http_request = http_request.with_body(body);
            }
            RequestBody::Raw(bytes) => {
                http_request = http_request.with_body(bytes.clone());
            }
        }

        self.log_detailed(&format!("--> {} {url}", method.as_str()));
        match self.http.execute(http_request).await {
            Ok(reply) => {
                self.log_detailed(&format!("<-- {} {url}", reply.status_code));
                Ok(Response::new(reply.status_code, reply.headers, reply.body))
            }
            Err(e) => {
                warn!(target: "api", "request to {url} failed: {e}");
                Ok(Response::client_error())
            }
        }
    }
}
