//! Bridges persisted profile cookies and the `reqwest` cookie jar.

use std::sync::Arc;

use bisleri_core::StoredCookie;
use chrono::DateTime;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use serde::Deserialize;

use crate::StorefrontError;

const SITE_DOMAIN: &str = "bisleri.com";

/// Builds a jar holding `cookies`, scoped so they are sent to `base`.
///
/// A cookie whose domain does not cover the base host (for example a
/// `.bisleri.com` cookie replayed against a local test server) is installed
/// as a host-only cookie for the base host instead of being dropped.
#[must_use]
pub fn jar_from_cookies(cookies: &[StoredCookie], base: &Url) -> Arc<Jar> {
    let jar = Jar::default();
    let host = base.host_str().unwrap_or_default().to_ascii_lowercase();
    let https = base.scheme() == "https";

    for cookie in cookies {
        if cookie.name.is_empty() {
            continue;
        }
        let mut header = format!("{}={}", cookie.name, cookie.value);
        let domain = cookie.domain.trim().trim_start_matches('.').to_ascii_lowercase();
        if !domain.is_empty() && domain_matches(&host, &domain) {
            header.push_str("; Domain=");
            header.push_str(&domain);
        }
        let path = if cookie.path.trim().is_empty() {
            "/"
        } else {
            cookie.path.trim()
        };
        header.push_str("; Path=");
        header.push_str(path);
        if cookie.secure && https {
            header.push_str("; Secure");
        }
        if cookie.http_only {
            header.push_str("; HttpOnly");
        }
        if cookie.expires > 0 {
            if let Some(at) = DateTime::from_timestamp(cookie.expires, 0) {
                header.push_str("; Expires=");
                header.push_str(&at.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
            }
        }
        jar.add_cookie_str(&header, base);
    }
    Arc::new(jar)
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Reads back every cookie the jar would send to `base`.
///
/// The jar only exposes name/value pairs, so the domain is normalised to
/// `.bisleri.com` for the real site (or the bare host otherwise) and the
/// path to `/`.
#[must_use]
pub fn export_cookies(jar: &Jar, base: &Url) -> Vec<StoredCookie> {
    let Some(header) = jar.cookies(base) else {
        return Vec::new();
    };
    let Ok(header) = header.to_str() else {
        return Vec::new();
    };
    let host = base.host_str().unwrap_or_default().to_ascii_lowercase();
    let domain = if domain_matches(&host, SITE_DOMAIN) {
        format!(".{SITE_DOMAIN}")
    } else {
        host
    };

    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| StoredCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.clone(),
            path: "/".to_string(),
            ..StoredCookie::default()
        })
        .collect()
}

/// Cookie shape accepted from an external browser export. Both the
/// persisted field names and the common extension names are understood.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportedCookie {
    name: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    path: String,
    #[serde(default, alias = "expirationDate")]
    expires: Option<f64>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    http_only: bool,
    #[serde(default)]
    same_site: Option<String>,
}

/// Parses a browser cookie export, keeping only unexpired site cookies.
///
/// # Errors
///
/// Returns [`StorefrontError::Login`] if the document is not a JSON array
/// of cookies or contains no usable site cookie.
#[allow(clippy::cast_possible_truncation)]
pub fn import_cookie_export(json: &str, now_unix: i64) -> Result<Vec<StoredCookie>, StorefrontError> {
    let exported: Vec<ExportedCookie> = serde_json::from_str(json)
        .map_err(|e| StorefrontError::Login(format!("invalid cookie export: {e}")))?;

    let cookies: Vec<StoredCookie> = exported
        .into_iter()
        .filter(|c| c.domain.to_ascii_lowercase().contains(SITE_DOMAIN))
        .map(|c| StoredCookie {
            name: c.name,
            value: c.value,
            domain: c.domain,
            path: if c.path.is_empty() { "/".into() } else { c.path },
            expires: c.expires.map_or(0, |e| e.trunc() as i64),
            secure: c.secure,
            http_only: c.http_only,
            same_site: c.same_site.unwrap_or_default(),
        })
        .filter(|c| !c.is_expired_at(now_unix))
        .collect();

    if cookies.is_empty() {
        return Err(StorefrontError::Login(
            "no Bisleri cookies captured; are you logged in?".into(),
        ));
    }
    Ok(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str, value: &str, domain: &str) -> StoredCookie {
        StoredCookie {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".into(),
            ..StoredCookie::default()
        }
    }

    #[test]
    fn site_cookies_reach_the_site_and_export_with_dot_domain() {
        let base = Url::parse("https://www.bisleri.com").unwrap();
        let jar = jar_from_cookies(&[cookie("dwsid", "abc", ".bisleri.com")], &base);
        let exported = export_cookies(&jar, &base);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].name, "dwsid");
        assert_eq!(exported[0].value, "abc");
        assert_eq!(exported[0].domain, ".bisleri.com");
        assert_eq!(exported[0].path, "/");
    }

    #[test]
    fn foreign_domain_cookies_are_rehomed_to_base_host() {
        let base = Url::parse("http://127.0.0.1:8080").unwrap();
        let mut secure = cookie("dwsid", "abc", ".bisleri.com");
        secure.secure = true;
        let jar = jar_from_cookies(&[secure], &base);
        let header = jar.cookies(&base).unwrap();
        assert_eq!(header.to_str().unwrap(), "dwsid=abc");
    }

    #[test]
    fn expired_cookies_are_not_sent() {
        let base = Url::parse("https://www.bisleri.com").unwrap();
        let mut stale = cookie("old", "1", ".bisleri.com");
        stale.expires = 1_000_000;
        let jar = jar_from_cookies(&[stale, cookie("fresh", "2", ".bisleri.com")], &base);
        let names: Vec<String> = export_cookies(&jar, &base)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["fresh".to_string()]);
    }

    #[test]
    fn import_filters_foreign_and_expired() {
        let json = r#"[
            {"name":"dwsid","value":"a","domain":".bisleri.com","path":"/","expirationDate":4102444800.5,"httpOnly":true},
            {"name":"_ga","value":"b","domain":".google.com"},
            {"name":"stale","value":"c","domain":"www.bisleri.com","expires":100}
        ]"#;
        let cookies = import_cookie_export(json, 1_700_000_000).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "dwsid");
        assert_eq!(cookies[0].expires, 4_102_444_800);
        assert!(cookies[0].http_only);
    }

    #[test]
    fn import_without_site_cookies_fails() {
        let err = import_cookie_export(r#"[{"name":"x","domain":"example.com"}]"#, 0).unwrap_err();
        assert!(err.to_string().contains("no Bisleri cookies"));
        assert!(import_cookie_export("{}", 0).is_err());
    }
}
