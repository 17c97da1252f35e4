use std::fmt;

/// DtlsSessionState tracks the lifecycle of a single `DtlsSession`.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdtlstransport-state
///
/// Initial state is `Closed`; terminal state is `Closed`. Transitions are
/// monotone: `Closed -> Connecting -> Connected -> Closed`. Unlike the full
/// W3C enum this crate has no separate `Failed` state — a failed handshake
/// returns the session straight to `Closed` (spec §4.2: "any handshake error
/// ... leaves the session CLOSED").
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsSessionState {
    Closed,
    Connecting,
    Connected,
}

const CLOSED_STR: &str = "closed";
const CONNECTING_STR: &str = "connecting";
const CONNECTED_STR: &str = "connected";

impl fmt::Display for DtlsSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DtlsSessionState::Closed => CLOSED_STR,
            DtlsSessionState::Connecting => CONNECTING_STR,
            DtlsSessionState::Connected => CONNECTED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_expected_strings() {
        assert_eq!(DtlsSessionState::Closed.to_string(), "closed");
        assert_eq!(DtlsSessionState::Connecting.to_string(), "connecting");
        assert_eq!(DtlsSessionState::Connected.to_string(), "connected");
    }
}
