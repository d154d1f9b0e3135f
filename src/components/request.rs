use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

const FALLBACK_BASE_URL: &str = "http://localhost/";

fn target_segments(url: &Url) -> Vec<String> {
    if let Some((_, route)) = url.query_pairs().find(|(key, _)| *key == "route") {
        return route
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// The incoming request as seen by the kernel.
pub trait Request: Send + Sync {
    /// `controller/action` portion of the request, possibly empty.
    fn route(&self) -> String;

    /// Positional parameters following the route.
    fn params(&self) -> Vec<String>;

    /// Builds a URL for `route` with `params` appended as path segments.
    fn create_url(&self, route: &str, params: &[String], absolute: bool) -> String;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "RequestConfig::default_base_url")]
    pub base_url: String,

    /// Raw request target, e.g. `/blog/show/42?route=...`
    pub uri: Option<String>,

    /// Explicit route; takes precedence over `uri`
    pub route: Option<String>,

    #[serde(default)]
    pub params: Vec<String>,
}

impl RequestConfig {
    fn default_base_url() -> String {
        FALLBACK_BASE_URL.to_string()
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            uri: None,
            route: None,
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    base_url: String,
    route: String,
    params: Vec<String>,
}

impl HttpRequest {
    pub const CLASS: &'static str = "app_kernel::components::HttpRequest";

    pub fn new(config: RequestConfig) -> Self {
        match (config.route, config.uri) {
            (Some(route), _) => Self {
                base_url: config.base_url,
                route: route.trim_matches('/').to_string(),
                params: config.params,
            },
            (None, Some(uri)) => {
                let mut request = Self::from_uri(config.base_url, &uri);
                request.params.extend(config.params);
                request
            }
            (None, None) => Self {
                base_url: config.base_url,
                route: String::new(),
                params: config.params,
            },
        }
    }

    /// Parses a request target against `base_url`.
    ///
    /// A `route` query parameter wins over the path. The first two segments
    /// form the route; the remaining segments become parameters. Segments
    /// are percent-decoded.
    pub fn from_uri(base_url: impl Into<String>, uri: &str) -> Self {
        let base_url = base_url.into();
        let segments = match Url::parse(&base_url)
            .or_else(|_| Url::parse(FALLBACK_BASE_URL))
            .and_then(|base| base.join(uri))
        {
            Ok(url) => target_segments(&url),
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "unparsable request target");
                Vec::new()
            }
        };

        let split = segments.len().min(2);
        Self {
            base_url,
            route: segments[..split].join("/"),
            params: segments[split..].to_vec(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new(RequestConfig::default())
    }
}

impl Request for HttpRequest {
    fn route(&self) -> String {
        self.route.clone()
    }

    fn params(&self) -> Vec<String> {
        self.params.clone()
    }

    fn create_url(&self, route: &str, params: &[String], absolute: bool) -> String {
        let mut url = route.trim_start_matches('/').to_string();
        for param in params {
            url.push('/');
            url.push_str(param);
        }

        if absolute {
            format!("{}{}", self.base_url, url)
        } else {
            url
        }
    }
}
