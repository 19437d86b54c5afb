//! Request context with typed parameters.

use std::collections::{BTreeMap, HashMap};

use http::Method;
use url::form_urlencoded;

use crate::config::Environment;
use crate::routing::{normalize_path, RouteParams};

/// Query keys that select a dispatch path rather than page content.
pub const RESERVED_QUERY_KEYS: [&str; 4] = ["_esi", "module", "fragment", "service"];

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded query string parameters.
///
/// A key given without a value (`?_esi`) maps to an empty string.
pub type QueryParams = BTreeMap<String, String>;

/// HTTP headers, keyed by lowercase name.
pub type Headers = HashMap<String, String>;

/// Read-only view of one request, shared by every component that handles it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// `http` or `https`.
    pub scheme: String,
    /// Host the request was addressed to.
    pub host: String,
    /// Request path as received.
    pub path: String,
    /// Query string parameters.
    pub query: QueryParams,
    /// HTTP headers.
    pub headers: Headers,
    /// Variables extracted by the matched rule.
    pub url_vars: RouteParams,
    /// Deployment environment.
    pub env: Environment,
    /// Root path the project is mounted under.
    pub root: String,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            method,
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            path: path.into(),
            query: QueryParams::new(),
            headers: Headers::new(),
            url_vars: RouteParams::new(),
            env: Environment::default(),
            root: "/".to_string(),
        }
    }

    /// Build a context from an HTTP request.
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        let uri = request.uri();
        let headers: Headers = request
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let host = uri
            .authority()
            .map(|a| a.host().to_string())
            .or_else(|| headers.get("host").map(|h| strip_port(h).to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        let request_id = headers
            .get("x-request-id")
            .map(RequestId::from_string)
            .unwrap_or_else(RequestId::generate);

        let mut ctx = Self::new(request.method().clone(), uri.path());
        ctx.request_id = request_id;
        ctx.scheme = uri.scheme_str().unwrap_or("http").to_string();
        ctx.host = host;
        ctx.query = parse_query(uri.query().unwrap_or_default());
        ctx.headers = headers;
        ctx
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Replace the query parameters from a raw query string.
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = parse_query(query);
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set the variables extracted by the matched rule.
    pub fn with_url_vars(mut self, vars: RouteParams) -> Self {
        self.url_vars = vars;
        self
    }

    /// Set the environment.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Set the root path.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Get a URL variable by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.url_vars.get(name).map(|s| s.as_str())
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn referer(&self) -> Option<&str> {
        self.header("referer")
    }

    /// Path plus query string, as the client sent it.
    pub fn request_uri(&self) -> String {
        match self.query_string(|_| true) {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Absolute base URL of the project.
    pub fn base(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.root)
    }

    /// Name identifying this URL's content in the module cache.
    pub fn cache_name(&self) -> String {
        let path = normalize_path(&self.path);
        match self.query_string(|key| !RESERVED_QUERY_KEYS.contains(&key)) {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        }
    }

    fn query_string(&self, keep: impl Fn(&str) -> bool) -> Option<String> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (key, value) in self.query.iter().filter(|(k, _)| keep(k)) {
            serializer.append_pair(key, value);
            any = true;
        }
        any.then(|| serializer.finish())
    }
}

/// Decode a raw query string.
pub fn parse_query(query: &str) -> QueryParams {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn strip_port(host: &str) -> &str {
    host.rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map(|(h, _)| h)
        .unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http() {
        let request = http::Request::builder()
            .uri("/articles/42?page=2&_esi")
            .header("Host", "example.com:8080")
            .header("Referer", "https://example.com/")
            .header("X-Request-ID", "req-1")
            .body(())
            .unwrap();

        let ctx = RequestContext::from_http(&request);
        assert_eq!(ctx.host, "example.com");
        assert_eq!(ctx.path, "/articles/42");
        assert_eq!(ctx.query_param("page"), Some("2"));
        assert_eq!(ctx.query_param("_esi"), Some(""));
        assert_eq!(ctx.query_param("module"), None);
        assert_eq!(ctx.referer(), Some("https://example.com/"));
        assert_eq!(ctx.header("x-request-id"), Some("req-1"));
        assert_eq!(ctx.request_id.as_str(), "req-1");
    }

    #[test]
    fn test_absolute_uri_host() {
        let request = http::Request::builder()
            .uri("https://shop.example.org/a")
            .body(())
            .unwrap();
        let ctx = RequestContext::from_http(&request);
        assert_eq!(ctx.host, "shop.example.org");
        assert_eq!(ctx.scheme, "https");
        assert_eq!(ctx.base(), "https://shop.example.org/");
    }

    #[test]
    fn test_cache_name_ignores_dispatch_keys() {
        let ctx = RequestContext::new(Method::GET, "/articles/42/")
            .with_query("b=2&a=1&_esi=headline&service=x");
        assert_eq!(ctx.cache_name(), "/articles/42?a=1&b=2");

        let bare = RequestContext::new(Method::GET, "/").with_query("_esi");
        assert_eq!(bare.cache_name(), "/");
    }

    #[test]
    fn test_request_uri() {
        let ctx = RequestContext::new(Method::GET, "/search").with_query("q=rust+lang");
        assert_eq!(ctx.request_uri(), "/search?q=rust+lang");
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }
}
