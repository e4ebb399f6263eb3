//! Access log lines
//!
//! `common` and `combined` follow the Apache/Nginx layouts, `json` emits one
//! object per request, and anything else is a `$variable` template.

use std::net::SocketAddr;

use chrono::{DateTime, Local};
use serde_json::json;

/// Layout of one access log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Common,
    Combined,
    Json,
    /// Template with `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$status`,
    /// `$body_bytes_sent`, `$http_referer`, `$http_user_agent` and
    /// `$request_time` (seconds, millisecond precision)
    Custom(String),
}

impl LogFormat {
    pub fn parse(name: &str) -> Self {
        match name {
            "common" => Self::Common,
            "combined" => Self::Combined,
            "json" => Self::Json,
            template => Self::Custom(template.to_string()),
        }
    }
}

/// What the access log knows about one finished request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: SocketAddr,
    /// When the request arrived
    pub time: DateTime<Local>,
    pub method: String,
    /// Request target as received, query string included
    pub path: String,
    pub http_version: String,
    pub status: u16,
    /// Bytes the response body carries; 0 for HEAD
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    pub fn new(remote_addr: SocketAddr, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    pub fn format(&self, format: &LogFormat) -> String {
        match format {
            LogFormat::Common => self.common_line(),
            LogFormat::Combined => format!(
                "{} \"{}\" \"{}\"",
                self.common_line(),
                dash_if_none(self.referer.as_deref()),
                dash_if_none(self.user_agent.as_deref()),
            ),
            LogFormat::Json => self.json_line(),
            LogFormat::Custom(template) => self.expand(template),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.path, self.http_version)
    }

    fn time_local(&self) -> String {
        self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()
    }

    fn common_line(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time_local(),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn json_line(&self) -> String {
        json!({
            "remote_addr": self.remote_addr.to_string(),
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    fn expand(&self, template: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let seconds = self.request_time_us as f64 / 1_000_000.0;

        // $request is a prefix of $request_time and friends, so it goes last
        let vars: [(&str, String); 11] = [
            ("$remote_addr", self.remote_addr.to_string()),
            ("$time_local", self.time_local()),
            ("$time_iso8601", self.time.to_rfc3339()),
            ("$request_time", format!("{seconds:.3}")),
            ("$request_method", self.method.clone()),
            ("$request_uri", self.path.clone()),
            ("$request", self.request_line()),
            ("$status", self.status.to_string()),
            ("$body_bytes_sent", self.body_bytes.to_string()),
            ("$http_referer", dash_if_none(self.referer.as_deref()).to_string()),
            ("$http_user_agent", dash_if_none(self.user_agent.as_deref()).to_string()),
        ];

        vars.iter()
            .fold(template.to_string(), |line, (name, value)| line.replace(name, value))
    }
}

fn dash_if_none(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1:51234".parse().unwrap(),
            "GET".to_string(),
            "/style.css?v=1".to_string(),
        );
        entry.body_bytes = 1234;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 12_345;
        entry
    }

    #[test]
    fn test_parse_format_names() {
        assert_eq!(LogFormat::parse("common"), LogFormat::Common);
        assert_eq!(LogFormat::parse("combined"), LogFormat::Combined);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(
            LogFormat::parse("$status"),
            LogFormat::Custom("$status".to_string())
        );
    }

    #[test]
    fn test_common_line() {
        let line = entry().format(&LogFormat::Common);
        assert!(line.starts_with("192.168.1.1:51234 - - ["));
        assert!(line.ends_with("\"GET /style.css?v=1 HTTP/1.1\" 200 1234"));
    }

    #[test]
    fn test_combined_line() {
        let line = entry().format(&LogFormat::Combined);
        assert!(line.contains("\"GET /style.css?v=1 HTTP/1.1\" 200 1234"));
        assert!(line.ends_with("\"https://example.com\" \"Mozilla/5.0\""));

        let mut bare = entry();
        bare.referer = None;
        bare.user_agent = None;
        assert!(bare.format(&LogFormat::Combined).ends_with("\"-\" \"-\""));
    }

    #[test]
    fn test_json_line() {
        let mut entry = entry();
        entry.path = "/a\"b".to_string();
        entry.referer = None;

        let value: serde_json::Value =
            serde_json::from_str(&entry.format(&LogFormat::Json)).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1:51234");
        assert_eq!(value["path"], "/a\"b");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 1234);
        assert!(value["referer"].is_null());
    }

    #[test]
    fn test_custom_template() {
        let template = LogFormat::parse("$request_method $request_uri -> $status in $request_time");
        assert_eq!(entry().format(&template), "GET /style.css?v=1 -> 200 in 0.012");
    }

    #[test]
    fn test_custom_template_request_line() {
        let template = LogFormat::parse("[$request] $http_referer");
        assert_eq!(
            entry().format(&template),
            "[GET /style.css?v=1 HTTP/1.1] https://example.com"
        );
    }
}
