//! HTTP cache control module
//!
//! Maps a file extension to an asset class and each class to its
//! `Cache-Control` policy. Both mappings are static tables: adding an
//! extension or changing a directive means editing one line here.

use hyper::header::{HeaderName, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};

/// Asset class a file extension belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Style,
    Script,
    Image,
    Markup,
    Default,
}

/// Extension (lower-case, no dot) to class
const EXTENSION_CLASSES: &[(&str, AssetClass)] = &[
    ("css", AssetClass::Style),
    ("js", AssetClass::Script),
    ("png", AssetClass::Image),
    ("jpg", AssetClass::Image),
    ("jpeg", AssetClass::Image),
    ("gif", AssetClass::Image),
    ("html", AssetClass::Markup),
];

impl AssetClass {
    /// Classify an extension, case-insensitively
    ///
    /// # Examples
    /// ```
    /// use asset_server::http::cache::AssetClass;
    /// assert_eq!(AssetClass::from_extension(Some("PNG")), AssetClass::Image);
    /// assert_eq!(AssetClass::from_extension(Some("txt")), AssetClass::Default);
    /// assert_eq!(AssetClass::from_extension(None), AssetClass::Default);
    /// ```
    pub fn from_extension(extension: Option<&str>) -> Self {
        let Some(ext) = extension else {
            return Self::Default;
        };
        EXTENSION_CLASSES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
            .map_or(Self::Default, |(_, class)| *class)
    }

    pub const fn policy(self) -> CachePolicy {
        match self {
            Self::Style | Self::Script | Self::Default => CachePolicy::Public(3600),
            Self::Image => CachePolicy::Public(86_400),
            Self::Markup => CachePolicy::NoStore,
        }
    }
}

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// Never cache, revalidate every time
    NoStore,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoStore => "no-cache, no-store, must-revalidate".to_string(),
        }
    }

    /// All headers this policy contributes, in emission order
    ///
    /// `NoStore` also carries the HTTP/1.0 `Pragma` and `Expires` equivalents.
    pub fn headers(self) -> Vec<(HeaderName, HeaderValue)> {
        let cache_control = HeaderValue::from_str(&self.to_header_value())
            .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));
        let mut headers = vec![(CACHE_CONTROL, cache_control)];
        if self == Self::NoStore {
            headers.push((PRAGMA, HeaderValue::from_static("no-cache")));
            headers.push((EXPIRES, HeaderValue::from_static("0")));
        }
        headers
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Public(3600) // 1 hour
    }
}
