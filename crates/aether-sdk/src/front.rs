//! HTTP front controller.

use std::time::{Duration, Instant};

use aether_cache::{header_names, should_include_debug_headers};
use aether_core::{AetherError, Environment, QueryParams, RequestContext, RequestId};
use aether_executor::{DispatchMode, ProviderCatalog, RenderedPage, SESSION_OPTION};
use aether_response::{DrawTarget, ResponseEnvelope, ResponseError, ResponseSink};
use http::StatusCode;
use tracing::Instrument;

use crate::app::Aether;

/// Service name that asks a fragment for its plain run output.
pub const ESI_KEY: &str = "_esi";

const PLAIN_TEXT: &str = "text/plain; charset=UTF-8";

/// What a request asks for, decided from its query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestRoute {
    /// Render the page.
    Page,
    /// `?module=X&service=Y`
    Service { module: String, service: String },
    /// `?fragment=X&service=Y`; `service=_esi` asks for the run output.
    Fragment {
        fragment: String,
        service: Option<String>,
    },
    /// `?_esi`
    Catalog,
    /// `?_esi=name`
    Provider(String),
}

impl RequestRoute {
    pub fn from_query(query: &QueryParams) -> Self {
        if let (Some(module), Some(service)) = (param(query, "module"), param(query, "service")) {
            return Self::Service {
                module: module.to_string(),
                service: service.to_string(),
            };
        }
        if let (Some(fragment), Some(service)) = (param(query, "fragment"), param(query, "service")) {
            return Self::Fragment {
                fragment: fragment.to_string(),
                service: (service != ESI_KEY).then(|| service.to_string()),
            };
        }
        match param(query, ESI_KEY) {
            Some("") => Self::Catalog,
            Some(name) => Self::Provider(name.to_string()),
            None => Self::Page,
        }
    }
}

fn param<'a>(query: &'a QueryParams, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str)
}

/// A successful outcome before it is written.
enum Reply {
    Page(RenderedPage),
    Envelope(ResponseEnvelope),
}

impl Aether {
    /// Handle one request. Never fails: errors become error responses.
    pub async fn handle<B>(&self, request: http::Request<B>) -> http::Response<Vec<u8>> {
        self.handle_context(RequestContext::from_http(&request)).await
    }

    /// Handle a request that is already decoded.
    pub async fn handle_context(&self, request: RequestContext) -> http::Response<Vec<u8>> {
        let start = Instant::now();
        let env = self.config().app.env;
        let request = request.with_env(env);
        let request_id = request.request_id.clone();
        let debug_headers = should_include_debug_headers(&request);
        let route = RequestRoute::from_query(&request.query);

        let span = tracing::info_span!("request", request_id = %request_id, path = %request.path);
        let reply = self.respond(route, request).instrument(span).await;

        if let Err(error) = &reply {
            if error.status_code().is_server_error() {
                tracing::error!(request_id = %request_id, kind = error.kind(), error = %error, "request failed");
            } else {
                tracing::warn!(request_id = %request_id, kind = error.kind(), error = %error, "request rejected");
            }
        }

        let mut sink = ResponseSink::new();
        if let Err(error) = write_reply(&mut sink, &request_id, reply, env, debug_headers, start.elapsed()) {
            tracing::error!(request_id = %request_id, error = %error, "failed to write response");
            sink = fallback_response(&request_id);
        }
        sink.complete();
        sink.into_response()
    }

    async fn respond(&self, route: RequestRoute, request: RequestContext) -> Result<Reply, AetherError> {
        let (request, plan) = self.pipeline.resolve(request)?;

        match route {
            RequestRoute::Page => {
                if plan.base_options.is_on(SESSION_OPTION) {
                    if let Some(session) = &self.session {
                        session.start(&request);
                    }
                }
                self.pipeline.render_plan(request, &plan).await.map(Reply::Page)
            }
            RequestRoute::Service { module, service } => self
                .dispatcher
                .dispatch(request, &plan, &module, Some(&service), DispatchMode::Normal)
                .await
                .map(Reply::Envelope),
            RequestRoute::Fragment { fragment, service } => self
                .dispatcher
                .dispatch(request, &plan, &fragment, service.as_deref(), DispatchMode::Fragment)
                .await
                .map(Reply::Envelope),
            RequestRoute::Catalog => ProviderCatalog::from_plan(&plan).to_envelope().map(Reply::Envelope),
            RequestRoute::Provider(name) => self
                .pipeline
                .render_provider(request, &plan, &name)
                .await
                .map(Reply::Page),
        }
    }
}

fn write_reply(
    sink: &mut ResponseSink,
    request_id: &RequestId,
    reply: Result<Reply, AetherError>,
    env: Environment,
    debug_headers: bool,
    elapsed: Duration,
) -> Result<(), ResponseError> {
    sink.set_header(header_names::X_REQUEST_ID, request_id.as_str())?;
    if env == Environment::Local {
        let millis = format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0);
        sink.set_header(header_names::X_RENDER_TIME, &millis)?;
    }

    match reply {
        Ok(Reply::Page(page)) => {
            if debug_headers {
                for (name, value) in page.explain.to_headers() {
                    sink.set_header(&name, &value)?;
                }
            }
            page.draw(sink)
        }
        Ok(Reply::Envelope(envelope)) => envelope.draw(sink),
        Err(error) => {
            sink.set_status(error.status_code())?;
            error_envelope(&error, env).draw(sink)
        }
    }
}

/// Error body: detailed in local and development, generic elsewhere.
pub fn error_envelope(error: &AetherError, env: Environment) -> ResponseEnvelope {
    let status = error.status_code();
    let headline = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let body = if env.shows_error_details() {
        format!("{}\n\n{}: {}\n", headline, error.kind(), error)
    } else {
        format!("{}\n", headline)
    };
    ResponseEnvelope::text(body).with_content_type(PLAIN_TEXT)
}

fn fallback_response(request_id: &RequestId) -> ResponseSink {
    let mut sink = ResponseSink::new();
    // A fresh sink accepts these; failures leave a bare 500.
    let _ = sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    let _ = sink.set_header(header_names::X_REQUEST_ID, request_id.as_str());
    let _ = sink.write_body(b"500 Internal Server Error\n");
    sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::parse_query;

    // === RequestRoute Tests ===

    #[test]
    fn test_route_from_query() {
        let route = |q: &str| RequestRoute::from_query(&parse_query(q));

        assert_eq!(route(""), RequestRoute::Page);
        assert_eq!(route("page=2"), RequestRoute::Page);
        assert_eq!(route("_esi"), RequestRoute::Catalog);
        assert_eq!(route("_esi="), RequestRoute::Catalog);
        assert_eq!(route("_esi=headline"), RequestRoute::Provider("headline".into()));
        assert_eq!(
            route("module=Weather&service=forecast"),
            RequestRoute::Service {
                module: "Weather".into(),
                service: "forecast".into()
            }
        );
        assert_eq!(
            route("fragment=comments&service=_esi"),
            RequestRoute::Fragment {
                fragment: "comments".into(),
                service: None
            }
        );
        // A module without a service is a page request.
        assert_eq!(route("module=Weather"), RequestRoute::Page);
    }

    #[test]
    fn test_service_takes_precedence_over_esi() {
        let route = RequestRoute::from_query(&parse_query("_esi&module=M&service=s"));
        assert!(matches!(route, RequestRoute::Service { .. }));
    }

    // === Error Body Tests ===

    #[test]
    fn test_error_body_by_environment() {
        let error = AetherError::ServiceNotFound("module 'M' has no service 'x'".into());

        let detailed = error_envelope(&error, Environment::Development).get().unwrap();
        assert!(detailed.starts_with("404 Not Found"));
        assert!(detailed.contains("service_not_found"));

        let generic = error_envelope(&error, Environment::Production).get().unwrap();
        assert_eq!(generic, "404 Not Found\n");
    }
}
