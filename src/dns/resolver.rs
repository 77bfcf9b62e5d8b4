use std::cell::RefCell;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use trust_dns_resolver::Resolver;
use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::proto::rr::RecordType;
use trust_dns_resolver::system_conf;

use super::error::no_records_code;
use super::{DnsError, LookupDns, MxRecord};
use crate::Config;
use crate::cancel::Cancellation;

/// [`LookupDns`] backed by `trust-dns`, talking either to the platform
/// resolvers or to the gateway from [`Config::dns`].
///
/// The underlying resolver is built on the first query, so a call that never
/// reaches the MX layer never reads the system configuration. Each query is
/// bounded by `ConnectionTimeout` and by the time left on the cancellation
/// deadline, whichever is shorter.
pub struct DnsResolver {
    gateway: Option<SocketAddr>,
    timeout: Duration,
    cancellation: Option<Cancellation>,
    // resolver and the query timeout it was built with
    resolver: RefCell<Option<(Duration, Resolver)>>,
}

impl DnsResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            gateway: config.dns(),
            timeout: config.connection_timeout(),
            cancellation: config.cancellation().cloned(),
            resolver: RefCell::new(None),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(Cancellation::is_cancelled)
    }

    fn query_timeout(&self) -> Result<Duration, DnsError> {
        if self.is_cancelled() {
            return Err(DnsError::Cancelled);
        }
        let remaining = self
            .cancellation
            .as_ref()
            .and_then(Cancellation::deadline)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        Ok(match remaining {
            Some(remaining) => self.timeout.min(remaining),
            None => self.timeout,
        })
    }

    /// Runs `lookup` on a resolver whose timeout fits the current budget.
    /// A cancellation that fires while the query is in flight wins over its
    /// answer.
    fn query<T>(
        &self,
        lookup: impl FnOnce(&Resolver) -> Result<T, DnsError>,
    ) -> Result<T, DnsError> {
        let timeout = self.query_timeout()?;
        let mut slot = self.resolver.borrow_mut();
        let (_, resolver) = match slot.take() {
            Some((built_for, resolver)) if built_for <= timeout => {
                slot.insert((built_for, resolver))
            }
            _ => {
                let resolver = build_resolver(self.gateway, timeout).map_err(|err| {
                    tracing::warn!(error = %err, "dns resolver initialization failed");
                    DnsError::resolver_init(err)
                })?;
                slot.insert((timeout, resolver))
            }
        };
        let outcome = lookup(&*resolver);
        if self.is_cancelled() {
            tracing::debug!("dns lookup abandoned after cancellation");
            return Err(DnsError::Cancelled);
        }
        outcome
    }
}

fn build_resolver(gateway: Option<SocketAddr>, timeout: Duration) -> io::Result<Resolver> {
    let (config, mut opts) = match gateway {
        Some(addr) => {
            // UDP only; truncated answers still switch to TCP
            let mut server = NameServerConfig::new(addr, Protocol::Udp);
            server.trust_negative_responses = true;
            (
                ResolverConfig::from_parts(None, Vec::new(), vec![server]),
                ResolverOpts::default(),
            )
        }
        None => {
            let (config, opts) = system_conf::read_system_conf()?;
            (udp_only(&config), opts)
        }
    };
    // retries are driven by the validator, one transport attempt per query
    opts.timeout = timeout;
    opts.attempts = 1;
    Resolver::new(config, opts)
}

/// Drops the TCP twin of every name server so a silent server costs one
/// timeout, not one per protocol.
fn udp_only(config: &ResolverConfig) -> ResolverConfig {
    let servers: Vec<NameServerConfig> = config
        .name_servers()
        .iter()
        .filter(|server| server.protocol == Protocol::Udp)
        .cloned()
        .collect();
    ResolverConfig::from_parts(config.domain().cloned(), config.search().to_vec(), servers)
}

/// Absolute form of `host`, so that search domains never apply.
fn fqdn(host: &str) -> String {
    if host.ends_with('.') {
        host.to_string()
    } else {
        format!("{host}.")
    }
}

impl LookupDns for DnsResolver {
    fn lookup_a(&self, host: &str) -> Result<Vec<String>, DnsError> {
        tracing::trace!(host, "A lookup");
        self.query(|resolver| {
            let lookup = resolver
                .ipv4_lookup(fqdn(host))
                .map_err(|err| DnsError::from_resolve(host, err))?;
            Ok(lookup.iter().map(|addr| addr.to_string()).collect())
        })
    }

    fn lookup_cname(&self, host: &str) -> Result<Option<String>, DnsError> {
        tracing::trace!(host, "CNAME lookup");
        self.query(|resolver| match resolver.lookup(fqdn(host), RecordType::CNAME) {
            Ok(lookup) => Ok(lookup
                .iter()
                .filter(|rdata| rdata.record_type() == RecordType::CNAME)
                .last()
                .map(|rdata| rdata.to_string())),
            // the name exists but is not an alias
            Err(err) if no_records_code(&err) == Some(ResponseCode::NoError) => Ok(None),
            Err(err) => Err(DnsError::from_resolve(host, err)),
        })
    }

    fn lookup_mx(&self, host: &str) -> Result<Vec<MxRecord>, DnsError> {
        tracing::trace!(host, "MX lookup");
        self.query(|resolver| {
            let lookup = resolver
                .mx_lookup(fqdn(host))
                .map_err(|err| DnsError::from_resolve(host, err))?;
            Ok(lookup
                .iter()
                .map(|mx| MxRecord::new(mx.preference(), mx.exchange().to_utf8()))
                .collect())
        })
    }

    fn lookup_ptr(&self, addr: &str) -> Result<Vec<String>, DnsError> {
        tracing::trace!(addr, "PTR lookup");
        let ip: IpAddr = addr.parse().map_err(|_| DnsError::InvalidAddress {
            addr: addr.to_string(),
        })?;
        self.query(|resolver| {
            let lookup = resolver
                .reverse_lookup(ip)
                .map_err(|err| DnsError::from_resolve(addr, err))?;
            Ok(lookup.iter().map(|name| name.to_string()).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::thread;

    use super::*;

    /// Gateway that reads nothing and answers nothing.
    fn silent_gateway() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").expect("bind silent gateway")
    }

    #[test]
    fn fqdn_appends_single_dot() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }

    #[test]
    fn cancelled_config_short_circuits_lookups() {
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let config = Config::builder("verifier@example.com")
            .dns("127.0.0.1:5353")
            .cancellation(cancellation)
            .build()
            .expect("valid config");
        let resolver = DnsResolver::new(&config);
        let err = resolver.lookup_mx("example.com").expect_err("cancelled");
        assert!(matches!(err, DnsError::Cancelled));
        assert!(!err.is_retryable());
    }

    #[test]
    fn ptr_rejects_non_ip_input() {
        let config = Config::builder("verifier@example.com")
            .dns("127.0.0.1")
            .build()
            .expect("valid config");
        let resolver = DnsResolver::new(&config);
        let err = resolver.lookup_ptr("mail.example.com").expect_err("not an ip");
        assert!(matches!(err, DnsError::InvalidAddress { .. }));
    }

    #[test]
    fn deadline_bounds_in_flight_lookup() {
        let gateway = silent_gateway();
        let config = Config::builder("verifier@example.com")
            .dns(gateway.local_addr().expect("addr").to_string())
            .connection_timeout(6)
            .cancellation(Cancellation::with_timeout(Duration::from_millis(300)))
            .build()
            .expect("valid config");
        let resolver = DnsResolver::new(&config);

        let started = Instant::now();
        let err = resolver.lookup_mx("example.com").expect_err("deadline");
        assert!(matches!(err, DnsError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    }

    #[test]
    fn cancel_during_lookup_discards_the_answer() {
        let gateway = silent_gateway();
        let cancellation = Cancellation::new();
        let config = Config::builder("verifier@example.com")
            .dns(gateway.local_addr().expect("addr").to_string())
            .connection_timeout(1)
            .cancellation(cancellation.clone())
            .build()
            .expect("valid config");
        let resolver = DnsResolver::new(&config);

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancellation.cancel();
        });
        let err = resolver.lookup_a("mail.example.com").expect_err("cancelled");
        canceller.join().expect("canceller");
        assert!(matches!(err, DnsError::Cancelled));
    }

    #[test]
    fn silent_gateway_costs_one_timeout() {
        let gateway = silent_gateway();
        let config = Config::builder("verifier@example.com")
            .dns(gateway.local_addr().expect("addr").to_string())
            .connection_timeout(1)
            .build()
            .expect("valid config");
        let resolver = DnsResolver::new(&config);

        let started = Instant::now();
        let err = resolver.lookup_mx("example.com").expect_err("no answer");
        assert!(err.is_retryable());
        assert!(started.elapsed() < Duration::from_millis(1800), "{:?}", started.elapsed());
    }

    #[test]
    fn query_timeout_defaults_to_connection_timeout() {
        let config = Config::builder("verifier@example.com")
            .dns("192.0.2.53")
            .cancellation(Cancellation::new())
            .build()
            .expect("valid config");
        let resolver = DnsResolver::new(&config);
        assert_eq!(
            resolver.query_timeout().expect("not cancelled"),
            config.connection_timeout()
        );
    }

    #[test]
    fn udp_only_drops_tcp_twins() {
        let group = ResolverConfig::from_parts(
            None,
            Vec::new(),
            vec![
                NameServerConfig::new("192.0.2.53:53".parse().unwrap(), Protocol::Udp),
                NameServerConfig::new("192.0.2.53:53".parse().unwrap(), Protocol::Tcp),
            ],
        );
        let servers = udp_only(&group);
        assert_eq!(servers.name_servers().len(), 1);
        assert_eq!(servers.name_servers()[0].protocol, Protocol::Udp);
    }
}
