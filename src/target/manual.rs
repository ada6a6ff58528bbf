// src/target/manual.rs
// =============================================================================
// Parses the operator's manual target list (--domains).
//
// Tokens are whitespace separated, each one of:
//   DOMAIN            example.com
//   DOMAIN:IP         example.com:10.0.0.5
//   DOMAIN:PORT       example.com:8080
//   DOMAIN:IP:PORT    example.com:10.0.0.5:8443
// where DOMAIN can also be a full http(s):// URL with a path.
//
// One bad token fails the whole list, and the error names that token.
// =============================================================================

use super::{is_valid_hostname, DomainTarget, TargetError};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<domain>[A-Za-z0-9_.-]{2,350}\.[A-Za-z0-9]{2,63}",
            r"|https?://[A-Za-z0-9_.-]{2,350}\.[A-Za-z0-9]{2,63}[!-~]*?)",
            r"(?::(?P<ip>\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}))?",
            r"(?::(?P<port>\d{2,5}))?$",
        ))
        .unwrap()
    })
}

pub fn parse_manual_list(list: &str) -> Result<Vec<DomainTarget>, TargetError> {
    list.split_whitespace().map(parse_token).collect()
}

fn parse_token(token: &str) -> Result<DomainTarget, TargetError> {
    let malformed = || TargetError::MalformedManualTarget { token: token.to_string() };

    let caps = token_pattern().captures(token).ok_or_else(malformed)?;
    let domain = caps.name("domain").map(|m| m.as_str()).ok_or_else(malformed)?;
    let ip = caps.name("ip").map(|m| m.as_str());
    let port = match caps.name("port") {
        Some(m) => Some(m.as_str().parse::<u16>().map_err(|_| malformed())?),
        None => None,
    };

    let mut url = if domain.starts_with("http://") || domain.starts_with("https://") {
        Url::parse(domain).map_err(|_| malformed())?
    } else {
        // No scheme given: 443 means https, anything else http
        let scheme = if port == Some(443) { "https" } else { "http" };
        Url::parse(&format!("{}://{}/", scheme, domain)).map_err(|_| malformed())?
    };

    if !url.host_str().map_or(false, is_valid_hostname) {
        return Err(malformed());
    }

    if port.is_some() {
        url.set_port(port).map_err(|_| malformed())?;
    }

    DomainTarget::new(url.as_str(), ip).map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(list: &str) -> Vec<String> {
        parse_manual_list(list)
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn test_plain_domains() {
        assert_eq!(
            parsed("example.com  other.org\n\tthird.net"),
            vec!["http://example.com/", "http://other.org/", "http://third.net/"]
        );
    }

    #[test]
    fn test_domain_ip_port() {
        assert_eq!(parsed("example.com:10.0.0.5"), vec!["http://example.com/ (10.0.0.5)"]);
        assert_eq!(parsed("example.com:8080"), vec!["http://example.com:8080/"]);
        assert_eq!(parsed("example.com:443"), vec!["https://example.com/"]);
        assert_eq!(
            parsed("example.com:10.0.0.5:8443"),
            vec!["http://example.com:8443/ (10.0.0.5)"]
        );
    }

    #[test]
    fn test_urls() {
        assert_eq!(parsed("https://example.com/shop"), vec!["https://example.com/shop"]);
        assert_eq!(
            parsed("https://example.com/shop:10.0.0.5:8443"),
            vec!["https://example.com:8443/shop (10.0.0.5)"]
        );
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_manual_list("   \n ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_tokens_named() {
        for bad in ["bad..domain", "site.com:999.999.1.1", "localhost", "site.com:99999", "ftp://site.com"] {
            let err = parse_manual_list(&format!("good.example.com {}", bad)).unwrap_err();
            match err {
                TargetError::MalformedManualTarget { token } => assert_eq!(token, bad),
                other => panic!("expected MalformedManualTarget for {}, got {:?}", bad, other),
            }
        }
    }
}
