//! idgate-server: forward-auth service validating OpenID Connect ID tokens
//!
//! Lightweight HTTP server using hyper. A reverse proxy sends each inbound
//! request's `Authorization` header to `GET /validate`; a 200 means the
//! bearer ID token is trusted. Uses a single-threaded tokio runtime with a
//! `LocalSet` (compatible with core's !Send async traits).

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{error, info, warn};

use idgate_core::config::Config;
use idgate_core::error::{ErrorResponse, OpenIdError};
use idgate_core::oidc::{
    validate_providers, IdTokenValidator, JwkDecoder, JwksKeyResolver, JwtParser, StaticProviders,
};
use idgate_core::request::{extract_bearer_token, RequestContext, User};

mod platform;

use platform::{MokaCache, ProcessEnv, ReqwestHttpClient, SystemClock};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state
struct AppState {
    cache: MokaCache,
    http: ReqwestHttpClient,
    clock: SystemClock,
    providers: StaticProviders,
    config: Config,
    next_request: Cell<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()
        .expect("PORT must be a number");

    let config = Config::from_env(&ProcessEnv).expect("invalid idgate configuration");
    validate_providers(&config.providers).expect("invalid provider registry");
    let http = ReqwestHttpClient::new(UPSTREAM_TIMEOUT).expect("failed to create HTTP client");

    info!(
        providers = config.providers.len(),
        algorithms = ?config.allowed_algorithms,
        "idgate configured"
    );

    let state = Rc::new(AppState {
        cache: MokaCache::new(config.key_cache_ttl_secs),
        http,
        clock: SystemClock,
        providers: StaticProviders(config.providers.clone()),
        config,
        next_request: Cell::new(0),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("failed to bind");

    info!(port, "idgate-server listening");

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                };
                let state = Rc::clone(&state);

                tokio::task::spawn_local(async move {
                    let io = hyper_util::rt::TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let state = Rc::clone(&state);
                        async move { handle_request(req, &state).await }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        warn!(error = %e, "connection error");
                    }
                });
            }
        })
        .await;
}

type HyperResponse = Response<Full<Bytes>>;

async fn handle_request(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<HyperResponse, std::convert::Infallible> {
    let result = route_request(req, state).await;
    Ok(result)
}

async fn route_request(req: Request<Incoming>, state: &AppState) -> HyperResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::GET, "/") => handle_health(),
        (Method::GET, "/validate") => handle_validate(req.headers(), state).await,
        _ => json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "not_found"})),
    }
}

fn handle_health() -> HyperResponse {
    json_response(StatusCode::OK, &serde_json::json!({"name": "idgate"}))
}

async fn handle_validate(headers: &HeaderMap, state: &AppState) -> HyperResponse {
    let ctx = RequestContext::new(request_id(headers, &state.next_request));

    match authenticate(headers, &ctx, state).await {
        Ok(user) => {
            info!(request_id = %ctx.request_id, issuer = %user.issuer, subject = %user.subject, "token accepted");
            let mut response = json_response(StatusCode::OK, &user);
            set_identity_headers(response.headers_mut(), &user);
            response
        }
        Err(e) => {
            info!(request_id = %ctx.request_id, code = e.code(), error = %e, "token rejected");
            error_response(&e)
        }
    }
}

/// Validate the bearer ID token on the request
async fn authenticate(
    headers: &HeaderMap,
    ctx: &RequestContext,
    state: &AppState,
) -> Result<User, OpenIdError> {
    let authorization = match headers.get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            OpenIdError::invalid_authorization("invalid Authorization header encoding")
        })?),
        None => None,
    };
    let token = extract_bearer_token(authorization)?;

    let keys = JwksKeyResolver::new(&state.cache, &state.http, state.config.key_cache_ttl_secs);
    let parser = JwtParser::new(
        &state.clock,
        state.config.allowed_algorithms.clone(),
        state.config.clock_leeway_secs,
    );
    let validator = IdTokenValidator::new(&state.providers, &parser, &keys, &JwkDecoder);

    let verified = validator.validate(ctx, token).await?;
    User::from_token(&verified)
}

/// Use the proxy's request id when present, otherwise number requests locally
fn request_id(headers: &HeaderMap, next: &Cell<u64>) -> String {
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        return id.to_string();
    }

    let n = next.get();
    next.set(n.wrapping_add(1));
    format!("idgate-{}", n)
}

/// Identity headers a forward-auth proxy can copy onto the upstream request
fn set_identity_headers(headers: &mut HeaderMap, user: &User) {
    if let Ok(value) = HeaderValue::from_str(&user.subject) {
        headers.insert("x-auth-subject", value);
    }
    if let Ok(value) = HeaderValue::from_str(&user.issuer) {
        headers.insert("x-auth-issuer", value);
    }
}

fn error_response(err: &OpenIdError) -> HyperResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::from(err);
    let mut response = json_response(status, &body);

    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer error=\"invalid_token\""),
        );
    }

    response
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> HyperResponse {
    let json = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
