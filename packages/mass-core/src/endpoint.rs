//! Server endpoint handling and URL building.
//!
//! The server advertises a plain HTTP(S) base URL. The websocket API lives at
//! the same host under [`WS_PATH`] with the scheme swapped, and artwork that
//! is not reachable from the client is fetched through the image proxy.

use std::fmt;

use crate::error::{ClientError, ClientResult};
use crate::protocol_constants::{IMAGE_PROXY_PATH, WS_PATH};

/// Whether the endpoint uses TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Security {
    Plain,
    Tls,
}

/// A parsed server base URL.
///
/// Holds everything after the scheme (host, port, optional path prefix)
/// with trailing slashes and a trailing `/ws` removed, so both the HTTP and
/// the websocket form can be rebuilt from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    security: Security,
    authority_and_path: String,
}

impl ServerEndpoint {
    /// Parses a server URL.
    ///
    /// Accepts `http://`, `https://`, `ws://` and `wss://`. A websocket URL
    /// may carry the `/ws` suffix; it is stripped and re-added by
    /// [`ws_url`](Self::ws_url).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidEndpoint`] for other schemes or an
    /// empty host.
    pub fn parse(url: &str) -> ClientResult<Self> {
        let trimmed = url.trim();
        let (security, rest) = if let Some(rest) = strip_scheme(trimmed, "https://") {
            (Security::Tls, rest)
        } else if let Some(rest) = strip_scheme(trimmed, "wss://") {
            (Security::Tls, rest)
        } else if let Some(rest) = strip_scheme(trimmed, "http://") {
            (Security::Plain, rest)
        } else if let Some(rest) = strip_scheme(trimmed, "ws://") {
            (Security::Plain, rest)
        } else {
            return Err(ClientError::InvalidEndpoint(format!(
                "unsupported scheme in {url:?} (expected http, https, ws or wss)"
            )));
        };

        let mut rest = rest.trim_end_matches('/');
        if let Some(stripped) = rest.strip_suffix(WS_PATH) {
            rest = stripped.trim_end_matches('/');
        }

        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(ClientError::InvalidEndpoint(format!(
                "missing host in {url:?}"
            )));
        }

        Ok(Self {
            security,
            authority_and_path: rest.to_string(),
        })
    }

    /// Returns the websocket API URL (`ws://<host>/ws` or `wss://<host>/ws`).
    #[must_use]
    pub fn ws_url(&self) -> String {
        let scheme = match self.security {
            Security::Plain => "ws",
            Security::Tls => "wss",
        };
        format!("{scheme}://{}{WS_PATH}", self.authority_and_path)
    }

    /// Returns the HTTP(S) base URL without a trailing slash.
    #[must_use]
    pub fn http_url(&self) -> String {
        let scheme = match self.security {
            Security::Plain => "http",
            Security::Tls => "https",
        };
        format!("{scheme}://{}", self.authority_and_path)
    }

    /// Returns true if the endpoint uses TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.security == Security::Tls
    }

    /// Builds an image proxy URL for a server-local artwork path.
    #[must_use]
    pub fn image_proxy_url(&self, path: &str, provider: &str) -> String {
        format!(
            "{}{IMAGE_PROXY_PATH}?path={}&provider={}",
            self.http_url(),
            urlencoding::encode(path),
            urlencoding::encode(provider)
        )
    }

    /// Resolves the URL a client should load artwork from.
    ///
    /// Absolute `http(s)` paths that the server marks as remotely accessible
    /// are used as is; everything else goes through the image proxy. A blank
    /// path has no image.
    #[must_use]
    pub fn resolve_image_url(
        &self,
        path: &str,
        provider: &str,
        remotely_accessible: bool,
    ) -> Option<String> {
        if path.trim().is_empty() {
            return None;
        }
        if remotely_accessible && path.starts_with("http") {
            Some(path.to_string())
        } else {
            Some(self.image_proxy_url(path, provider))
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.http_url())
    }
}

/// Case-insensitive scheme prefix strip.
fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    match url.get(..scheme.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(scheme) => Some(&url[scheme.len()..]),
        _ => None,
    }
}

/// Turns whatever the caller passed to `connect` into a websocket URL.
pub(crate) fn websocket_url(endpoint: &str) -> ClientResult<String> {
    ServerEndpoint::parse(endpoint).map(|e| e.ws_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_base_url_becomes_ws() {
        let ep = ServerEndpoint::parse("http://h:8095").unwrap();
        assert_eq!(ep.ws_url(), "ws://h:8095/ws");
        assert_eq!(ep.http_url(), "http://h:8095");
        assert!(!ep.is_secure());
    }

    #[test]
    fn https_base_url_becomes_wss() {
        let ep = ServerEndpoint::parse("https://music.example.com/").unwrap();
        assert_eq!(ep.ws_url(), "wss://music.example.com/ws");
        assert!(ep.is_secure());
    }

    #[test]
    fn ws_url_round_trips_without_doubling_path() {
        let ep = ServerEndpoint::parse("ws://10.0.0.2:8095/ws").unwrap();
        assert_eq!(ep.ws_url(), "ws://10.0.0.2:8095/ws");
        assert_eq!(ep.http_url(), "http://10.0.0.2:8095");
    }

    #[test]
    fn path_prefix_is_kept() {
        let ep = ServerEndpoint::parse("https://proxy.local/music/").unwrap();
        assert_eq!(ep.ws_url(), "wss://proxy.local/music/ws");
    }

    #[test]
    fn scheme_match_is_case_insensitive() {
        let ep = ServerEndpoint::parse("HTTP://h:1").unwrap();
        assert_eq!(ep.ws_url(), "ws://h:1/ws");
    }

    #[test]
    fn rejects_unknown_scheme_and_empty_host() {
        assert!(matches!(
            ServerEndpoint::parse("ftp://h"),
            Err(ClientError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            ServerEndpoint::parse("http://"),
            Err(ClientError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            ServerEndpoint::parse("h:8095"),
            Err(ClientError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn image_proxy_url_encodes_components() {
        let ep = ServerEndpoint::parse("http://h:8095").unwrap();
        assert_eq!(
            ep.image_proxy_url("/media/a b.jpg", "file system"),
            "http://h:8095/imageproxy?path=%2Fmedia%2Fa%20b.jpg&provider=file%20system"
        );
    }

    #[test]
    fn resolve_image_url_prefers_remote_paths() {
        let ep = ServerEndpoint::parse("http://h:8095").unwrap();
        assert_eq!(
            ep.resolve_image_url("https://cdn/x.jpg", "spotify", true),
            Some("https://cdn/x.jpg".to_string())
        );
        assert_eq!(
            ep.resolve_image_url("https://cdn/x.jpg", "spotify", false),
            Some("http://h:8095/imageproxy?path=https%3A%2F%2Fcdn%2Fx.jpg&provider=spotify".to_string())
        );
        assert_eq!(ep.resolve_image_url("  ", "spotify", true), None);
    }
}
