//! `Connection` — a bearer handle owned by the dispatcher. An ordinary
//! value, not a reference-counted object: tasks hold the owning
//! dispatcher's connection id rather than a pointer to it.

use std::net::IpAddr;

/// `Connection.state`: forward-only, `Failed`/`Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Opening,
    Open,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Whether `self -> next` is a legal transition: no backward edge, and no transition out
    /// of a terminal state.
    pub fn can_advance_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Opening, Open | Failed | Closed) => true,
            (Open, Closed | Failed) => true,
            (Failed, _) | (Closed, _) => false,
            (a, b) if a == b => false,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub imsi: String,
    pub mmsc_url: String,
    /// `host:port`, or empty when no proxy is configured.
    pub mmsproxy: String,
    pub netif: String,
    pub local_address: Option<IpAddr>,
    state: ConnectionState,
}

impl Connection {
    pub fn new(imsi: impl Into<String>, mmsc_url: impl Into<String>, mmsproxy: impl Into<String>, netif: impl Into<String>) -> Self {
        Self {
            imsi: imsi.into(),
            mmsc_url: mmsc_url.into(),
            mmsproxy: mmsproxy.into(),
            netif: netif.into(),
            local_address: None,
            state: ConnectionState::Opening,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Advances to `next`, returning `false` (and leaving state
    /// unchanged) if the transition would regress, per the invariant
    /// "a connection may advance state but never regress".
    pub fn advance(&mut self, next: ConnectionState) -> bool {
        if !self.state.can_advance_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn matches_imsi(&self, imsi: &str) -> bool {
        self.imsi == imsi
    }

    /// Proxy host with any octet's leading zeros stripped: without this,
    /// `192.168.094.023` would otherwise be read as octal.
    pub fn normalised_proxy_host(&self) -> String {
        normalise_proxy_host(&self.mmsproxy)
    }
}

/// Strips leading zeros from each dotted-quad octet of a `host[:port]`
/// string, leaving non-numeric hosts untouched.
pub fn normalise_proxy_host(host_port: &str) -> String {
    let (host, port) = match host_port.split_once(':') {
        Some((h, p)) => (h, Some(p)),
        None => (host_port, None),
    };
    let octets: Vec<&str> = host.split('.').collect();
    let is_dotted_quad = octets.len() == 4 && octets.iter().all(|o| !o.is_empty() && o.bytes().all(|b| b.is_ascii_digit()));
    let normalised_host = if is_dotted_quad {
        octets
            .iter()
            .map(|o| o.trim_start_matches('0'))
            .map(|o| if o.is_empty() { "0" } else { o })
            .collect::<Vec<_>>()
            .join(".")
    } else {
        host.to_string()
    };
    match port {
        Some(p) => format!("{normalised_host}:{p}"),
        None => normalised_host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_never_regresses() {
        let mut conn = Connection::new("imsi1", "http://mmsc", "", "rmnet0");
        assert!(conn.advance(ConnectionState::Open));
        assert!(!conn.advance(ConnectionState::Opening));
        assert!(conn.advance(ConnectionState::Closed));
        assert!(!conn.advance(ConnectionState::Open));
    }

    #[test]
    fn proxy_leading_zeros_stripped() {
        assert_eq!(normalise_proxy_host("192.168.094.023"), "192.168.94.23");
        assert_eq!(normalise_proxy_host("192.168.094.023:8080"), "192.168.94.23:8080");
    }

    #[test]
    fn non_dotted_quad_host_untouched() {
        assert_eq!(normalise_proxy_host("mmsproxy.example.net:80"), "mmsproxy.example.net:80");
    }

    #[test]
    fn all_zero_octet_collapses_to_zero() {
        assert_eq!(normalise_proxy_host("10.0.00.1"), "10.0.0.1");
    }
}
