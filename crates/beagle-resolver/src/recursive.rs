//! Iterative recursive lookup.
//!
//! Resolution walks the delegation chain: answer from cache if possible,
//! otherwise pick a starting nameserver (the deepest cached NS for the
//! name, falling back to the roots in list order) and query iteratively,
//! following referrals and harvesting glue until a conclusive answer.
//! Unglued nameserver names are resolved through the same machinery,
//! bounded by a recursion depth cap.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, instrument, trace, warn};

use beagle_cache::DnsCache;
use beagle_proto::{Packet, PacketBuf, QueryType, Question, Record, ResultCode, PACKET_SIZE};

use crate::retry::RetryPolicy;
use crate::roots::RootServers;
use crate::tracker::TransactionTracker;
use crate::{ResolverConfig, ResolverError, Result};

/// TTL for negative outcomes learned from upstream, seconds.
const NEGATIVE_TTL: u32 = 300;

/// The recursive resolver.
///
/// All state is shared: workers run resolutions concurrently against the
/// same cache, tracker, and root table.
pub struct Resolver {
    config: ResolverConfig,
    cache: Arc<DnsCache>,
    tracker: Arc<TransactionTracker>,
    roots: Arc<RootServers>,
}

impl Resolver {
    /// Creates a resolver.
    pub fn new(
        config: ResolverConfig,
        cache: Arc<DnsCache>,
        tracker: Arc<TransactionTracker>,
        roots: Arc<RootServers>,
    ) -> Self {
        Self {
            config,
            cache,
            tracker,
            roots,
        }
    }

    /// Returns the root server table.
    pub fn roots(&self) -> &RootServers {
        &self.roots
    }

    /// Resolves a question, returning the packet to answer the client
    /// with. NXDOMAIN and SERVFAIL are answers here, not errors.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, qname: &str, qtype: QueryType) -> Result<Packet> {
        self.resolve_at_depth(qname, qtype, 0).await
    }

    /// The iterative lookup state machine.
    ///
    /// `BoxFuture` breaks the infinite future type that direct async
    /// recursion (for unglued nameservers) would otherwise produce.
    fn resolve_at_depth<'a>(
        &'a self,
        qname: &'a str,
        qtype: QueryType,
        depth: u8,
    ) -> BoxFuture<'a, Result<Packet>> {
        async move {
            if depth > self.config.max_depth {
                return Err(ResolverError::MaxDepth {
                    max_depth: self.config.max_depth,
                });
            }

            if let Some(records) = self.cache.lookup(qname, qtype) {
                debug!(qname, %qtype, "cache hit");

                let mut response = Packet::new();
                if records.is_empty() {
                    // an empty list is a cached negative outcome
                    response.header.rescode = ResultCode::NXDomain;
                } else {
                    response.header.rescode = ResultCode::NoError;
                    response.answers = records;
                }
                return Ok(response);
            }

            debug!(qname, %qtype, "cache miss");

            // deepest cached nameserver for the name, one label at a time
            let mut ns: Option<SocketAddr> = None;
            let mut domain = qname;
            loop {
                if let Some(ip) = self.cache.lookup_ns(domain) {
                    debug!(domain, ip = %ip, "ns cache hit");
                    ns = Some(self.ns_addr(ip));
                    break;
                }

                match domain.split_once('.') {
                    Some((_, parent)) => domain = parent,
                    None => break,
                }
            }

            let mut prev_ns_failed = false;

            for root in self.roots.iter() {
                if ns.is_none() || prev_ns_failed {
                    ns = Some(root.addr());
                    info!(
                        root = root.hostname,
                        ip = %root.ipv4,
                        hits = root.hits(),
                        timeouts = root.timeouts(),
                        "starting from root server"
                    );
                }

                loop {
                    let Some(server) = ns else { break };

                    trace!(qname, %qtype, server = %server, "attempting lookup");

                    let retry = RetryPolicy::new(&self.config);
                    let started = Instant::now();

                    let response = match retry.run(|| self.exchange(qname, qtype, server)).await {
                        Ok(response) => {
                            root.record_latency(started.elapsed());
                            response
                        }
                        Err(err) if err.is_timeout() => {
                            root.record_timeout();
                            warn!(
                                root = root.hostname,
                                server = %server,
                                "nameserver timed out after retries"
                            );
                            prev_ns_failed = true;
                            break;
                        }
                        Err(err) if err.is_security() => {
                            warn!(server = %server, error = %err, "rejected response");
                            prev_ns_failed = true;
                            break;
                        }
                        Err(err) => return Err(err),
                    };

                    if !response.answers.is_empty()
                        && response.header.rescode == ResultCode::NoError
                    {
                        self.cache.insert(qname, qtype, &response.answers);
                        return Ok(response);
                    }

                    if response.header.rescode == ResultCode::NXDomain {
                        self.cache
                            .insert_negative(qname, qtype, ResultCode::NXDomain, NEGATIVE_TTL);
                        return Ok(response);
                    }

                    if response.header.rescode == ResultCode::ServFail {
                        self.cache
                            .insert_negative(qname, qtype, ResultCode::ServFail, NEGATIVE_TTL);
                        return Ok(response);
                    }

                    // a referral: remember every glued nameserver
                    for (domain, host) in response.nameservers_for(qname) {
                        for resource in &response.resources {
                            if let Record::A {
                                domain: glue_domain,
                                addr,
                                ttl,
                            } = resource
                            {
                                if glue_domain == host {
                                    self.cache.insert_ns(domain, *addr, *ttl);
                                    debug!(
                                        domain,
                                        ns = host,
                                        ip = %addr,
                                        "cached nameserver from glue"
                                    );
                                }
                            }
                        }
                    }

                    if let Some(ip) = response.resolved_ns(qname) {
                        ns = Some(self.ns_addr(ip));
                        continue;
                    }

                    let unresolved = response.unresolved_ns(qname).map(str::to_string);
                    let Some(host) = unresolved else {
                        // not a referral we can follow; hand back what we got
                        return Ok(response);
                    };

                    trace!(ns = %host, "resolving unglued nameserver");
                    let recursive = self.resolve_at_depth(&host, QueryType::A, depth + 1).await?;

                    match recursive.first_a() {
                        Some(ip) => ns = Some(self.ns_addr(ip)),
                        None => return Ok(response),
                    }
                }
            }

            Err(ResolverError::RootsExhausted)
        }
        .boxed()
    }

    /// Socket address for a nameserver learned from the cache or a
    /// referral.
    fn ns_addr(&self, ip: Ipv4Addr) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(ip), self.config.upstream_port)
    }

    /// One query/response exchange with a nameserver.
    ///
    /// Uses a freshly bound socket with an ephemeral port; the socket is
    /// closed on every exit path. The response must carry our transaction
    /// id, come from the queried address and port, and have the response
    /// bit set.
    async fn exchange(&self, qname: &str, qtype: QueryType, server: SocketAddr) -> Result<Packet> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;

        let id = self.tracker.allocate_id()?;
        self.tracker.register(id, qname, qtype, server);

        let mut query = Packet::new();
        query.header.id = id;
        query.header.recursion_desired = true;
        query
            .questions
            .push(Question::new(qname.to_string(), qtype));

        let mut req = PacketBuf::new();
        query.write(&mut req)?;

        match timeout(
            self.config.send_timeout(),
            socket.send_to(req.as_slice(), server),
        )
        .await
        {
            Ok(sent) => {
                sent?;
            }
            Err(_) => return Err(ResolverError::Timeout),
        }

        let mut buf = [0u8; PACKET_SIZE];
        let (len, src) = match timeout(self.config.recv_timeout(), socket.recv_from(&mut buf)).await
        {
            Ok(received) => received?,
            Err(_) => return Err(ResolverError::Timeout),
        };

        let mut res = PacketBuf::from_bytes(&buf[..len]);
        let response = Packet::from_buffer(&mut res)?;

        if response.header.id != id {
            return Err(ResolverError::IdMismatch {
                sent: id,
                got: response.header.id,
            });
        }

        if src != server {
            return Err(ResolverError::SourceMismatch {
                queried: server,
                got: src,
            });
        }

        if !response.header.response {
            return Err(ResolverError::NotAResponse);
        }

        self.tracker.remove(id);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beagle_cache::CacheConfig;

    fn resolver_with_roots(roots: RootServers) -> Resolver {
        Resolver::new(
            ResolverConfig::default(),
            Arc::new(DnsCache::new(CacheConfig::default())),
            Arc::new(TransactionTracker::new()),
            Arc::new(roots),
        )
    }

    #[tokio::test]
    async fn test_cache_hit_answers_without_network() {
        let resolver = resolver_with_roots(RootServers::from_servers(Vec::new()));

        let records = [Record::A {
            domain: "example.com".to_string(),
            addr: Ipv4Addr::new(93, 184, 216, 34),
            ttl: 300,
        }];
        resolver.cache.insert("example.com", QueryType::A, &records);

        let response = resolver.resolve("example.com", QueryType::A).await.unwrap();
        assert_eq!(response.header.rescode, ResultCode::NoError);
        assert_eq!(response.first_a(), Some(Ipv4Addr::new(93, 184, 216, 34)));
    }

    #[tokio::test]
    async fn test_cached_negative_synthesizes_nxdomain() {
        let resolver = resolver_with_roots(RootServers::from_servers(Vec::new()));

        resolver
            .cache
            .insert_negative("nx.example", QueryType::A, ResultCode::NXDomain, 300);

        let response = resolver.resolve("nx.example", QueryType::A).await.unwrap();
        assert_eq!(response.header.rescode, ResultCode::NXDomain);
        assert!(response.answers.is_empty());
    }

    #[tokio::test]
    async fn test_empty_root_table_fails() {
        let resolver = resolver_with_roots(RootServers::from_servers(Vec::new()));

        let result = resolver.resolve("example.com", QueryType::A).await;
        assert!(matches!(result, Err(ResolverError::RootsExhausted)));
    }
}
