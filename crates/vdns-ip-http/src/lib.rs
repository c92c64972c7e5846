// # HTTP IP Source
//
// This crate provides HTTP-based public-address sources for the reconciler.
//
// ## Purpose
//
// Each [`HttpIpSource`] asks one "what is my IP" endpoint (ipify,
// icanhazip, ident.me, ...) for the address the outside world sees. The
// endpoints answer with a bare address in the body.
//
// ## Architecture
//
// One source per endpoint and family. Chaining, ordering and fallback are
// owned by `AddressResolver` in `vdns-core`; [`resolver_from_config`]
// builds that chain from the configured URL lists.

use vdns_core::config::DiscoveryConfig;
use vdns_core::{AddressFamily, AddressResolver, Error, IpSource, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Upper bound on a response body that can still hold an address
const MAX_BODY_LEN: usize = 256;

/// HTTP-based public address source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch the address from
    url: String,

    /// Family this endpoint reports
    family: AddressFamily,

    /// HTTP client (carries the request timeout)
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint answering with a bare address (e.g. "https://api.ipify.org")
    /// - `family`: Family the endpoint reports
    /// - `timeout`: Bound on the whole request
    pub fn new(url: impl Into<String>, family: AddressFamily, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vdns/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(url, family, client))
    }

    /// Create a source sharing an existing client
    pub fn with_client(url: impl Into<String>, family: AddressFamily, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            family,
            client,
        }
    }

    /// The endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the body, giving up as soon as it exceeds `MAX_BODY_LEN`
    async fn read_bounded(&self, mut response: reqwest::Response) -> Result<String> {
        let too_large = |len: u64| {
            Error::invalid_input(format!(
                "{} returned a body that is not an address ({} bytes)",
                self.url, len
            ))
        };

        if let Some(len) = response.content_length()
            && len > MAX_BODY_LEN as u64
        {
            return Err(too_large(len));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::http(format!("Failed to read response from {}: {}", self.url, e)))?
        {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_BODY_LEN {
                return Err(too_large(body.len() as u64));
            }
        }

        String::from_utf8(body)
            .map_err(|_| Error::invalid_input(format!("{} returned a non-UTF-8 body", self.url)))
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(format!("{}: {}", self.url, e))
            } else {
                Error::http(format!("Request to {} failed: {}", self.url, e))
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::http(format!(
                "{} answered with HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body = self.read_bounded(response).await?;

        let text = body.trim();
        if text.is_empty() {
            return Err(Error::invalid_input(format!(
                "{} returned an empty body",
                self.url
            )));
        }

        let ip: IpAddr = text
            .parse()
            .map_err(|_| Error::invalid_input(format!("Invalid IP address from {}: {}", self.url, text)))?;

        if !self.family.matches(&ip) {
            return Err(Error::invalid_input(format!(
                "Expected {} from {}, got: {}",
                self.family, self.url, ip
            )));
        }

        tracing::debug!("{} reported {}", self.url, text);
        Ok(text.to_string())
    }

    fn family(&self) -> AddressFamily {
        self.family
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// Build an [`AddressResolver`] from the configured source lists
///
/// One client is shared by every source; the configured HTTP timeout bounds
/// each request.
pub fn resolver_from_config(config: &DiscoveryConfig) -> Result<AddressResolver> {
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(concat!("vdns/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

    let mut resolver = AddressResolver::new();
    for family in AddressFamily::ALL {
        for url in config.sources(family) {
            resolver.add_source(Box::new(HttpIpSource::with_client(
                url.clone(),
                family,
                client.clone(),
            )));
        }
        tracing::info!(
            "{} discovery chain: {} source(s)",
            family,
            config.sources(family).len()
        );
    }

    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn source(server: &MockServer, path: &str, family: AddressFamily) -> HttpIpSource {
        HttpIpSource::new(server.url(path), family, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_trimmed_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ip");
                then.status(200).body("203.0.113.7\n");
            })
            .await;

        let address = source(&server, "/ip", AddressFamily::V4).fetch().await.unwrap();

        assert_eq!(address, "203.0.113.7");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ipv6_casing_preserved() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ip6");
                then.status(200).body("2001:DB8::1");
            })
            .await;

        let address = source(&server, "/ip6", AddressFamily::V6).fetch().await.unwrap();

        assert_eq!(address, "2001:DB8::1");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ip");
                then.status(503).body("203.0.113.7");
            })
            .await;

        let result = source(&server, "/ip", AddressFamily::V4).fetch().await;

        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ip");
                then.status(200).body("<html>rate limited</html>");
            })
            .await;

        let result = source(&server, "/ip", AddressFamily::V4).fetch().await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_oversized_body_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ip");
                then.status(200).body(format!("203.0.113.7{}", " ".repeat(4096)));
            })
            .await;

        let result = source(&server, "/ip", AddressFamily::V4).fetch().await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_wrong_family_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ip");
                then.status(200).body("2001:db8::1");
            })
            .await;

        let result = source(&server, "/ip", AddressFamily::V4).fetch().await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let source = HttpIpSource::new(
            "http://127.0.0.1:9/ip",
            AddressFamily::V4,
            Duration::from_secs(2),
        )
        .unwrap();

        assert!(source.fetch().await.is_err());
    }

    #[tokio::test]
    async fn test_resolver_falls_back_over_http() {
        let server = MockServer::start_async().await;
        let broken = server
            .mock_async(|when, then| {
                when.method(GET).path("/primary");
                then.status(500);
            })
            .await;
        let healthy = server
            .mock_async(|when, then| {
                when.method(GET).path("/fallback");
                then.status(200).body("198.51.100.4");
            })
            .await;

        let config = DiscoveryConfig {
            ipv4_sources: vec![server.url("/primary"), server.url("/fallback")],
            ipv6_sources: Vec::new(),
            http_timeout_secs: 5,
        };
        let resolver = resolver_from_config(&config).unwrap();

        let discovery = resolver.resolve_all().await;

        assert_eq!(discovery.v4.value.as_deref(), Some("198.51.100.4"));
        assert!(discovery.v6.is_absent());
        broken.assert_async().await;
        healthy.assert_async().await;
    }

    #[test]
    fn test_resolver_chain_sizes_follow_config() {
        let resolver = resolver_from_config(&DiscoveryConfig::default()).unwrap();

        assert_eq!(
            resolver.source_count(AddressFamily::V4),
            vdns_core::config::DEFAULT_IPV4_SOURCES.len()
        );
        assert_eq!(
            resolver.source_count(AddressFamily::V6),
            vdns_core::config::DEFAULT_IPV6_SOURCES.len()
        );
    }
}
