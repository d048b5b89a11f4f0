use std::fmt;

/// A `(host, port)` pair identifying a single cluster node.
///
/// This is the key type used everywhere the coordinator tracks per-node
/// state: the `nodes` map, the `up`/`queue_full` sets and the master set
/// derived from the slot map are all keyed by [`Addr`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Addr {
    pub host: String,
    pub port: u16,
}

impl Addr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Addr {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<(&str, u16)> for Addr {
    fn from((host, port): (&str, u16)) -> Self {
        Addr::new(host, port)
    }
}

impl From<(String, u16)> for Addr {
    fn from((host, port): (String, u16)) -> Self {
        Addr::new(host, port)
    }
}
