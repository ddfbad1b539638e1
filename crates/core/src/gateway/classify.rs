//! Request classification by URL path.
//!
//! Precedence is static-asset, then api-call, then navigable-page. Matching
//! is a plain substring/suffix test on the path, so a page slug that happens
//! to contain `/static/` is treated as a static asset.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Build-output static directory segment.
pub const BUILD_STATIC_SEGMENT: &str = "/_next/static/";

/// Generic static directory segment.
pub const STATIC_SEGMENT: &str = "/static/";

/// API path segment.
pub const API_SEGMENT: &str = "/api/";

/// File extensions treated as immutable web assets.
pub const STATIC_EXTENSIONS: &[&str] = &["js", "css", "png", "jpg", "jpeg", "gif", "svg", "woff", "woff2"];

static STATIC_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        "({}|{}|\\.({})$)",
        regex::escape(BUILD_STATIC_SEGMENT),
        regex::escape(STATIC_SEGMENT),
        STATIC_EXTENSIONS.join("|")
    );
    Regex::new(&pattern).expect("static asset pattern is valid")
});

/// Caching class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    /// Content-hashed assets: cache-first.
    StaticAsset,
    /// Dynamic API calls: network-first with an offline fallback.
    ApiCall,
    /// Everything else: stale-while-revalidate.
    NavigablePage,
}

impl RequestClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticAsset => "static-asset",
            Self::ApiCall => "api-call",
            Self::NavigablePage => "navigable-page",
        }
    }

    /// Name of the strategy applied to this class.
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::StaticAsset => "cache-first",
            Self::ApiCall => "network-first",
            Self::NavigablePage => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a path. First match wins.
pub fn classify_path(path: &str) -> RequestClass {
    if STATIC_ASSET.is_match(path) {
        RequestClass::StaticAsset
    } else if path.contains(API_SEGMENT) {
        RequestClass::ApiCall
    } else {
        RequestClass::NavigablePage
    }
}

/// Classify a URL by its path; query and fragment are ignored.
pub fn classify(url: &Url) -> RequestClass {
    classify_path(url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(url: &str) -> RequestClass {
        classify(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_build_output_is_static() {
        assert_eq!(
            class_of("http://localhost:3000/_next/static/chunks/main-abc123"),
            RequestClass::StaticAsset
        );
    }

    #[test]
    fn test_static_dir_is_static() {
        assert_eq!(class_of("http://localhost:3000/static/logo"), RequestClass::StaticAsset);
    }

    #[test]
    fn test_every_extension_is_static() {
        for ext in STATIC_EXTENSIONS {
            let url = format!("http://localhost:3000/assets/file.{ext}");
            assert_eq!(class_of(&url), RequestClass::StaticAsset, "{url}");
        }
    }

    #[test]
    fn test_extension_must_end_path() {
        assert_eq!(class_of("http://localhost:3000/tools/app.js.map"), RequestClass::NavigablePage);
        assert_eq!(class_of("http://localhost:3000/file.json"), RequestClass::NavigablePage);
    }

    #[test]
    fn test_query_does_not_affect_class() {
        assert_eq!(class_of("http://localhost:3000/app.css?v=3"), RequestClass::StaticAsset);
        assert_eq!(class_of("http://localhost:3000/tools?file=a.png"), RequestClass::NavigablePage);
    }

    #[test]
    fn test_api_path() {
        assert_eq!(class_of("http://localhost:3000/api/currency/rates"), RequestClass::ApiCall);
        assert_eq!(class_of("http://localhost:3000/v2/api/convert?from=usd"), RequestClass::ApiCall);
    }

    #[test]
    fn test_static_beats_api() {
        assert_eq!(class_of("http://localhost:3000/api/avatar.png"), RequestClass::StaticAsset);
        assert_eq!(class_of("http://localhost:3000/api/static/config"), RequestClass::StaticAsset);
    }

    #[test]
    fn test_page_default() {
        assert_eq!(class_of("http://localhost:3000/"), RequestClass::NavigablePage);
        assert_eq!(class_of("http://localhost:3000/tools/pdf-merge"), RequestClass::NavigablePage);
        assert_eq!(class_of("http://localhost:3000/api"), RequestClass::NavigablePage);
    }

    #[test]
    fn test_page_slug_with_static_segment_is_misclassified() {
        // Known edge: substring matching wins over intent.
        assert_eq!(class_of("http://localhost:3000/blog/static/electricity"), RequestClass::StaticAsset);
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        assert_eq!(class_of("http://localhost:3000/photo.PNG"), RequestClass::NavigablePage);
    }

    #[test]
    fn test_class_serde_names() {
        assert_eq!(serde_json::to_string(&RequestClass::StaticAsset).unwrap(), "\"static-asset\"");
        assert_eq!(RequestClass::ApiCall.to_string(), "api-call");
        assert_eq!(RequestClass::NavigablePage.strategy(), "stale-while-revalidate");
    }
}
