//! RDAP request building.
//!
//! A [`Request`] is one RDAP query (RFC 9082): a domain, IP network, AS
//! number, entity, nameserver, help or search request. Domain, IP, AS number
//! and tagged entity requests can be bootstrapped; every other kind needs a
//! server given explicitly with [`Request::with_server`].
//!
//! ```
//! use rdap_bootstrap_lib::{RegistryType, Request};
//!
//! let request = Request::auto("AS5400");
//! assert_eq!(request.bootstrap_type(), Some(RegistryType::Asn));
//!
//! let server = url::Url::parse("https://rdap.db.ripe.net/").unwrap();
//! let request = request.with_server(&server).unwrap();
//! assert_eq!(
//!     request.url().map(|u| u.as_str()),
//!     Some("https://rdap.db.ripe.net/autnum/5400")
//! );
//! ```

use crate::bootstrap::asn::parse_asn;
use crate::error::BootstrapError;
use crate::types::RegistryType;
use ip_network::IpNetwork;
use std::fmt;
use std::net::IpAddr;
use url::form_urlencoded;
use url::Url;

/// RDAP search kinds, each a path plus one query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
    /// `domains?name=example*.com`
    DomainSearch,
    /// `domains?nsLdhName=ns1.example*.com`
    DomainSearchByNameserver,
    /// `domains?nsIp=192.0.2.0`
    DomainSearchByNameserverIp,
    /// `nameservers?name=ns1.example*.com`
    NameserverSearch,
    /// `nameservers?ip=2001:db8::`
    NameserverSearchByNameserverIp,
    /// `entities?fn=Bobby%20Joe*`
    EntitySearch,
    /// `entities?handle=CID-40*`
    EntitySearchByHandle,
}

impl SearchType {
    fn path_and_param(self) -> (&'static str, &'static str) {
        match self {
            SearchType::DomainSearch => ("domains", "name"),
            SearchType::DomainSearchByNameserver => ("domains", "nsLdhName"),
            SearchType::DomainSearchByNameserverIp => ("domains", "nsIp"),
            SearchType::NameserverSearch => ("nameservers", "name"),
            SearchType::NameserverSearchByNameserverIp => ("nameservers", "ip"),
            SearchType::EntitySearch => ("entities", "fn"),
            SearchType::EntitySearchByHandle => ("entities", "handle"),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchType::DomainSearch => "domain-search",
            SearchType::DomainSearchByNameserver => "domain-search-by-nameserver",
            SearchType::DomainSearchByNameserverIp => "domain-search-by-nameserver-ip",
            SearchType::NameserverSearch => "nameserver-search",
            SearchType::NameserverSearchByNameserverIp => "nameserver-search-by-ip",
            SearchType::EntitySearch => "entity-search",
            SearchType::EntitySearchByHandle => "entity-search-by-handle",
        };
        write!(f, "{}", s)
    }
}

/// The kind of an RDAP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Domain,
    Ip,
    Autnum,
    Entity,
    Nameserver,
    Help,
    /// A fully specified RDAP URL.
    Url,
    Search(SearchType),
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestType::Domain => write!(f, "domain"),
            RequestType::Ip => write!(f, "ip"),
            RequestType::Autnum => write!(f, "autnum"),
            RequestType::Entity => write!(f, "entity"),
            RequestType::Nameserver => write!(f, "nameserver"),
            RequestType::Help => write!(f, "help"),
            RequestType::Url => write!(f, "url"),
            RequestType::Search(search) => write!(f, "{}", search),
        }
    }
}

/// An RDAP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    request_type: RequestType,

    /// The object queried: domain name, IP network, AS number, handle or
    /// search pattern. Empty for help and URL requests.
    text: String,

    /// Path relative to the server's base URL.
    path: String,

    /// Search parameter, form-encoded into the query string.
    param: Option<(&'static str, String)>,

    /// Address family of an IP request.
    family: Option<u8>,

    /// Set once the server is known.
    url: Option<Url>,
}

impl Request {
    fn new(request_type: RequestType, text: String, path: String) -> Self {
        Self {
            request_type,
            text,
            path,
            param: None,
            family: None,
            url: None,
        }
    }

    /// A domain request, e.g. "example.cz".
    pub fn domain(name: &str) -> Self {
        Self::new(
            RequestType::Domain,
            name.to_string(),
            format!("domain/{}", escape_path(name)),
        )
    }

    /// An IP address request.
    pub fn ip(addr: IpAddr) -> Self {
        let text = addr.to_string();
        let mut request = Self::new(RequestType::Ip, text.clone(), format!("ip/{}", text));
        request.family = Some(family_of(addr));
        request
    }

    /// An IP network request, e.g. 192.0.2.0/24.
    pub fn ip_network(network: IpNetwork) -> Self {
        let text = network.to_string();
        let mut request = Self::new(RequestType::Ip, text.clone(), format!("ip/{}", text));
        request.family = Some(family_of(network.network_address()));
        request
    }

    /// An Autonomous System number request.
    pub fn autnum(asn: u32) -> Self {
        Self::new(RequestType::Autnum, asn.to_string(), format!("autnum/{}", asn))
    }

    /// An entity request. Only handles carrying a service provider tag
    /// ("86413629~VRSN") can be bootstrapped.
    pub fn entity(handle: &str) -> Self {
        Self::new(
            RequestType::Entity,
            handle.to_string(),
            format!("entity/{}", escape_path(handle)),
        )
    }

    pub fn nameserver(name: &str) -> Self {
        Self::new(
            RequestType::Nameserver,
            name.to_string(),
            format!("nameserver/{}", escape_path(name)),
        )
    }

    pub fn help() -> Self {
        Self::new(RequestType::Help, String::new(), "help".to_string())
    }

    /// A request for a known RDAP URL.
    pub fn from_url(url: Url) -> Self {
        let mut request = Self::new(RequestType::Url, String::new(), String::new());
        request.url = Some(url);
        request
    }

    /// A search request for `pattern` (see RFC 9082 section 3.2).
    pub fn search(search_type: SearchType, pattern: &str) -> Self {
        let (path, param) = search_type.path_and_param();
        let mut request = Self::new(
            RequestType::Search(search_type),
            pattern.to_string(),
            path.to_string(),
        );
        request.param = Some((param, pattern.to_string()));
        request
    }

    /// Guess the request kind from free text.
    ///
    /// - `https://example.com`, `http://example.com/`: domain request for
    ///   the host
    /// - any other http(s) URL: URL request
    /// - `192.0.2.1`, `2001:db8::`: IP request
    /// - `192.0.2.0/24`: IP network request
    /// - `AS5400`, `as5400`, `5400`: AS number request
    /// - text containing ".": domain request
    /// - anything else: entity request
    pub fn auto(text: &str) -> Self {
        if let Ok(url) = Url::parse(text) {
            if url.scheme() == "http" || url.scheme() == "https" {
                if url.path().is_empty() || url.path() == "/" {
                    if let Some(host) = url.host_str() {
                        return Self::domain(host);
                    }
                }
                return Self::from_url(url);
            }
        }

        if let Ok(addr) = text.parse::<IpAddr>() {
            return Self::ip(addr);
        }

        if let Some(network) = parse_network(text) {
            return Self::ip_network(network);
        }

        if let Ok(asn) = parse_asn(text) {
            return Self::autnum(asn);
        }

        if text.contains('.') {
            return Self::domain(text);
        }

        Self::entity(text)
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// The object queried, see [`Request::auto`] for examples.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The full query URL, once a server is set.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn has_server(&self) -> bool {
        self.url.is_some()
    }

    /// The bootstrap registry able to find a server for this request, if any.
    pub fn bootstrap_type(&self) -> Option<RegistryType> {
        match self.request_type {
            RequestType::Domain => Some(RegistryType::Dns),
            RequestType::Autnum => Some(RegistryType::Asn),
            RequestType::Entity => Some(RegistryType::ServiceProvider),
            RequestType::Ip => match self.family {
                Some(4) => Some(RegistryType::Ipv4),
                Some(6) => Some(RegistryType::Ipv6),
                _ => None,
            },
            _ => None,
        }
    }

    /// Path and query string, relative to a server's base URL.
    pub fn request_uri(&self) -> String {
        match &self.param {
            Some((key, value)) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(key, value)
                    .finish();
                format!("{}?{}", self.path, query)
            }
            None => self.path.clone(),
        }
    }

    /// A copy of this request directed at `server`.
    ///
    /// The server's query string and fragment are dropped and a trailing "/"
    /// added if missing, so "https://rdap.nic.cz" and
    /// "https://rdap.nic.cz/" are equivalent.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::InvalidRequest`] if the request already has a
    /// server.
    pub fn with_server(&self, server: &Url) -> Result<Self, BootstrapError> {
        if self.has_server() {
            return Err(BootstrapError::InvalidRequest {
                message: "request server already set".to_string(),
            });
        }

        let mut base = server.clone();
        base.set_query(None);
        base.set_fragment(None);

        let mut url = base.to_string();
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&self.request_uri());

        let url = Url::parse(&url).map_err(|e| BootstrapError::InvalidRequest {
            message: format!("invalid request URL '{}': {}", url, e),
        })?;

        Ok(Self {
            url: Some(url),
            ..self.clone()
        })
    }
}

fn family_of(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 6,
    }
}

fn parse_network(text: &str) -> Option<IpNetwork> {
    let (addr, len) = text.split_once('/')?;
    let addr: IpAddr = addr.parse().ok()?;
    let len: u8 = len.parse().ok()?;
    IpNetwork::new_truncate(addr, len).ok()
}

/// Percent-encode everything except ASCII letters, digits and
/// `- _ . ~ $ & + : = @`.
fn escape_path(text: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut escaped = String::with_capacity(text.len());
    for b in text.bytes() {
        if b.is_ascii_alphanumeric() || b"-_.~$&+:=@".contains(&b) {
            escaped.push(char::from(b));
        } else {
            escaped.push('%');
            escaped.push(char::from(HEX[usize::from(b >> 4)]));
            escaped.push(char::from(HEX[usize::from(b & 0xF)]));
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    fn full_url(request: &Request, base: &str) -> String {
        request
            .with_server(&server(base))
            .unwrap()
            .url()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_auto_detection() {
        let cases = [
            ("example.cz", RequestType::Domain, "example.cz"),
            ("https://example.cz", RequestType::Domain, "example.cz"),
            ("http://example.cz/", RequestType::Domain, "example.cz"),
            ("https://rdap.nic.cz/domain/example.cz", RequestType::Url, ""),
            ("192.0.2.1", RequestType::Ip, "192.0.2.1"),
            ("2001:db8::1", RequestType::Ip, "2001:db8::1"),
            ("192.0.2.77/24", RequestType::Ip, "192.0.2.0/24"),
            ("AS5400", RequestType::Autnum, "5400"),
            ("as5400", RequestType::Autnum, "5400"),
            ("5400", RequestType::Autnum, "5400"),
            ("TEST-NET-1", RequestType::Entity, "TEST-NET-1"),
            ("86413629~VRSN", RequestType::Entity, "86413629~VRSN"),
        ];

        for (text, request_type, query_text) in cases {
            let request = Request::auto(text);
            assert_eq!(request.request_type(), request_type, "type for {text:?}");
            assert_eq!(request.text(), query_text, "text for {text:?}");
        }

        assert!(Request::auto("https://rdap.nic.cz/domain/example.cz").has_server());
    }

    #[test]
    fn test_bootstrap_type() {
        assert_eq!(Request::auto("example.cz").bootstrap_type(), Some(RegistryType::Dns));
        assert_eq!(Request::auto("192.0.2.1").bootstrap_type(), Some(RegistryType::Ipv4));
        assert_eq!(Request::auto("2001:db8::/32").bootstrap_type(), Some(RegistryType::Ipv6));
        assert_eq!(Request::auto("AS1").bootstrap_type(), Some(RegistryType::Asn));
        assert_eq!(
            Request::auto("1~VRSN").bootstrap_type(),
            Some(RegistryType::ServiceProvider)
        );

        assert_eq!(Request::help().bootstrap_type(), None);
        assert_eq!(Request::nameserver("a.ns.nic.cz").bootstrap_type(), None);
        assert_eq!(
            Request::search(SearchType::DomainSearch, "exa*.cz").bootstrap_type(),
            None
        );
    }

    #[test]
    fn test_with_server() {
        let request = Request::domain("example.cz");
        assert_eq!(
            full_url(&request, "https://rdap.nic.cz"),
            "https://rdap.nic.cz/domain/example.cz"
        );
        assert_eq!(
            full_url(&request, "https://rdap.nic.cz/rdap/?x=1#frag"),
            "https://rdap.nic.cz/rdap/domain/example.cz"
        );

        assert_eq!(
            full_url(&Request::autnum(5400), "https://rdap.db.ripe.net/"),
            "https://rdap.db.ripe.net/autnum/5400"
        );
        assert_eq!(
            full_url(&Request::auto("2001:db8::/32"), "https://rdap.arin.net/registry/"),
            "https://rdap.arin.net/registry/ip/2001:db8::/32"
        );
        assert_eq!(
            full_url(&Request::help(), "https://rdap.example/"),
            "https://rdap.example/help"
        );

        // The original request is untouched, and a server can only be set once.
        assert!(!request.has_server());
        let directed = request.with_server(&server("https://rdap.nic.cz")).unwrap();
        assert!(directed.with_server(&server("https://other.example")).is_err());
        assert_eq!(directed.text(), "example.cz");
    }

    #[test]
    fn test_path_escaping() {
        assert_eq!(escape_path("example.cz"), "example.cz");
        assert_eq!(escape_path("a-b_c.d~e$f&g+h:i=j@k"), "a-b_c.d~e$f&g+h:i=j@k");
        assert_eq!(escape_path("a b/c?d#e%"), "a%20b%2Fc%3Fd%23e%25");
        assert_eq!(escape_path("ž"), "%C5%BE");

        assert_eq!(
            full_url(&Request::entity("A B/C"), "https://rdap.example/"),
            "https://rdap.example/entity/A%20B%2FC"
        );
    }

    #[test]
    fn test_search_requests() {
        let cases = [
            (SearchType::DomainSearch, "domains?name=exa*.cz"),
            (SearchType::DomainSearchByNameserver, "domains?nsLdhName=exa*.cz"),
            (SearchType::DomainSearchByNameserverIp, "domains?nsIp=exa*.cz"),
            (SearchType::NameserverSearch, "nameservers?name=exa*.cz"),
            (SearchType::NameserverSearchByNameserverIp, "nameservers?ip=exa*.cz"),
            (SearchType::EntitySearch, "entities?fn=exa*.cz"),
            (SearchType::EntitySearchByHandle, "entities?handle=exa*.cz"),
        ];

        for (search_type, uri) in cases {
            assert_eq!(Request::search(search_type, "exa*.cz").request_uri(), uri);
        }

        assert_eq!(
            Request::search(SearchType::EntitySearch, "Bobby Joe*").request_uri(),
            "entities?fn=Bobby+Joe*"
        );
    }

    #[test]
    fn test_request_type_names() {
        assert_eq!(RequestType::Domain.to_string(), "domain");
        assert_eq!(
            RequestType::Search(SearchType::NameserverSearchByNameserverIp).to_string(),
            "nameserver-search-by-ip"
        );
    }
}
