//! CORS Configuration
//!
//! Defaults, merging of user options, and construction of the `tower-http`
//! [`CorsLayer`]. Header matching and preflight handling belong to
//! `tower-http`; this module only decides what it is given.
//!
//! ## Examples
//! ```rust
//! use platform::cors::{CorsOptions, build_layer};
//! use std::time::Duration;
//!
//! let layer = build_layer(
//!     CorsOptions::default()
//!         .allow_origins(["https://app.example.com"])
//!         .allow_credentials(true)
//!         .max_age(Duration::from_secs(600)),
//! );
//! # let _ = layer;
//! ```

use std::time::Duration;

use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

/// List entry meaning "any"
pub const WILDCARD: &str = "*";

/// Preflight cache lifetime when none is configured (12 hours)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(12 * 3600);

// ============================================================================
// Configuration types
// ============================================================================

/// Fully resolved CORS configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins, `["*"]` for any
    pub allow_origins: Vec<String>,
    /// Allowed methods, `["*"]` for any
    pub allow_methods: Vec<String>,
    /// Allowed request headers, `["*"]` for any
    pub allow_headers: Vec<String>,
    /// Response headers readable by scripts, `["*"]` for all
    pub expose_headers: Vec<String>,
    /// Whether cookies / authorization headers may be sent
    pub allow_credentials: bool,
    /// Preflight cache lifetime
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        default_config()
    }
}

/// User-supplied CORS options
///
/// Empty lists and `None` mean "unset": [`merge`] replaces them with the
/// defaults. `CorsOptions::default()` sets nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct CorsOptions {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: Option<bool>,
    /// A zero duration counts as unset
    pub max_age: Option<Duration>,
}

impl CorsOptions {
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expose_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = Some(allow);
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

impl From<CorsConfig> for CorsOptions {
    fn from(config: CorsConfig) -> Self {
        Self {
            allow_origins: config.allow_origins,
            allow_methods: config.allow_methods,
            allow_headers: config.allow_headers,
            expose_headers: config.expose_headers,
            allow_credentials: Some(config.allow_credentials),
            max_age: Some(config.max_age),
        }
    }
}

// ============================================================================
// Defaults and merge
// ============================================================================

/// Allow-everything defaults, no credentials, 12 hour preflight cache
pub fn default_config() -> CorsConfig {
    CorsConfig {
        allow_origins: vec![WILDCARD.to_string()],
        allow_methods: vec![WILDCARD.to_string()],
        allow_headers: vec![WILDCARD.to_string()],
        expose_headers: vec![WILDCARD.to_string()],
        allow_credentials: false,
        max_age: DEFAULT_MAX_AGE,
    }
}

/// Overlay user options on [`default_config`]
///
/// Lists replace the default only when non-empty, `max_age` only when
/// strictly positive. Credentials take the user's value whenever one is
/// given, `true` or `false`.
pub fn merge(user: CorsOptions) -> CorsConfig {
    let mut config = default_config();

    if !user.allow_origins.is_empty() {
        config.allow_origins = user.allow_origins;
    }
    if !user.allow_methods.is_empty() {
        config.allow_methods = user.allow_methods;
    }
    if !user.allow_headers.is_empty() {
        config.allow_headers = user.allow_headers;
    }
    if !user.expose_headers.is_empty() {
        config.expose_headers = user.expose_headers;
    }
    if let Some(max_age) = user.max_age.filter(|d| !d.is_zero()) {
        config.max_age = max_age;
    }
    if let Some(allow) = user.allow_credentials {
        config.allow_credentials = allow;
    }

    config
}

// ============================================================================
// Layer construction
// ============================================================================

/// The `{build-handler}` capability: turns a merged config into middleware
pub trait CorsLayerFactory {
    type Layer;

    fn build(&self, config: &CorsConfig) -> Self::Layer;
}

/// Builds `tower-http` [`CorsLayer`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct TowerHttpCors;

impl CorsLayerFactory for TowerHttpCors {
    type Layer = CorsLayer;

    fn build(&self, config: &CorsConfig) -> CorsLayer {
        layer_from_config(config)
    }
}

/// Merge `user` and hand the result to `factory`
pub fn build_layer_with<F: CorsLayerFactory>(factory: &F, user: CorsOptions) -> F::Layer {
    let config = merge(user);

    tracing::debug!(
        allow_origins = ?config.allow_origins,
        allow_methods = ?config.allow_methods,
        allow_headers = ?config.allow_headers,
        expose_headers = ?config.expose_headers,
        allow_credentials = config.allow_credentials,
        max_age_secs = config.max_age.as_secs(),
        "Building CORS layer"
    );

    factory.build(&config)
}

/// Merge `user` over the defaults and build a [`CorsLayer`]
pub fn build_layer(user: CorsOptions) -> CorsLayer {
    build_layer_with(&TowerHttpCors, user)
}

/// [`build_layer`] over [`default_config`]
pub fn default_layer() -> CorsLayer {
    build_layer(default_config().into())
}

/// Translate a resolved config into a [`CorsLayer`]
///
/// `tower-http` refuses wildcards together with credentials, as browsers do.
/// A wildcard origin keeps `*` and drops the credentials header. With a
/// concrete origin list and credentials, wildcard methods and headers mirror
/// the request and a wildcard expose list is left out.
pub fn layer_from_config(config: &CorsConfig) -> CorsLayer {
    let any_origin = is_wildcard(&config.allow_origins);
    let credentials = config.allow_credentials && !any_origin;

    if config.allow_credentials && any_origin {
        tracing::warn!("Wildcard origin cannot be combined with credentials; credentials disabled");
    }

    let mut layer = CorsLayer::new()
        .allow_origin(allow_origin(&config.allow_origins))
        .allow_methods(allow_methods(&config.allow_methods, credentials))
        .allow_headers(allow_headers(&config.allow_headers, credentials))
        .allow_credentials(credentials)
        .max_age(config.max_age);

    if let Some(expose) = expose_headers(&config.expose_headers, credentials) {
        layer = layer.expose_headers(expose);
    }

    layer
}

fn allow_origin(origins: &[String]) -> AllowOrigin {
    if is_wildcard(origins) {
        return AllowOrigin::any();
    }
    AllowOrigin::list(parse_entries(origins, "origin", |o| {
        HeaderValue::from_str(o).ok()
    }))
}

fn allow_methods(methods: &[String], credentials: bool) -> AllowMethods {
    match (is_wildcard(methods), credentials) {
        (true, false) => AllowMethods::any(),
        (true, true) => {
            tracing::warn!("Wildcard methods with credentials; mirroring requested method");
            AllowMethods::mirror_request()
        }
        (false, _) => AllowMethods::list(parse_entries(methods, "method", |m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok()
        })),
    }
}

fn allow_headers(headers: &[String], credentials: bool) -> AllowHeaders {
    match (is_wildcard(headers), credentials) {
        (true, false) => AllowHeaders::any(),
        (true, true) => {
            tracing::warn!("Wildcard headers with credentials; mirroring requested headers");
            AllowHeaders::mirror_request()
        }
        (false, _) => AllowHeaders::list(parse_entries(headers, "header", |h| {
            HeaderName::from_bytes(h.as_bytes()).ok()
        })),
    }
}

fn expose_headers(headers: &[String], credentials: bool) -> Option<ExposeHeaders> {
    match (is_wildcard(headers), credentials) {
        (true, false) => Some(ExposeHeaders::any()),
        (true, true) => {
            tracing::warn!("Wildcard expose headers with credentials; not exposing any");
            None
        }
        (false, _) => Some(ExposeHeaders::list(parse_entries(
            headers,
            "expose header",
            |h| HeaderName::from_bytes(h.as_bytes()).ok(),
        ))),
    }
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v.trim() == WILDCARD)
}

/// Parse each non-blank entry, skipping (and logging) the ones that fail
fn parse_entries<T>(
    values: &[String],
    kind: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Vec<T> {
    values
        .iter()
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .filter_map(|raw| {
            let parsed = parse(raw);
            if parsed.is_none() {
                tracing::warn!(kind, value = raw, "Skipping invalid CORS entry");
            }
            parsed
        })
        .collect()
}
