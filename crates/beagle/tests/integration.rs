//! End-to-end tests for the beagle DNS server.
//!
//! Upstream nameservers are mocked with in-process UDP sockets on
//! localhost, so the tests exercise the real resolution path (sockets,
//! timeouts, retries, transaction validation, caching) without touching
//! the network.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time::timeout;

use beagle_cache::{CacheConfig, DnsCache};
use beagle_proto::{Packet, PacketBuf, QueryType, Question, Record, ResultCode};
use beagle_resolver::{Resolver, ResolverConfig, RootServer, RootServers, TransactionTracker};
use beagle_server::{RateLimitConfig, RateLimiter, ServerConfig, ServerStats, UdpServer};

// ============================================================================
// Test Helpers
// ============================================================================

/// A mocked upstream nameserver: parses each query and answers with
/// whatever the behavior closure builds. Returning `None` keeps the mock
/// silent, which the resolver experiences as a timeout.
struct MockUpstream {
    addr: SocketAddr,
    queries: Arc<AtomicU64>,
}

impl MockUpstream {
    async fn serve<F>(behavior: F) -> Self
    where
        F: Fn(&Packet) -> Option<Packet> + Send + Sync + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let queries = Arc::new(AtomicU64::new(0));

        let counter = queries.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut req = PacketBuf::from_bytes(&buf[..len]);
                let Ok(query) = Packet::from_buffer(&mut req) else {
                    continue;
                };

                if let Some(mut response) = behavior(&query) {
                    let mut out = PacketBuf::new();
                    if response.write(&mut out).is_ok() {
                        let _ = socket.send_to(out.as_slice(), src).await;
                    }
                }
            }
        });

        Self { addr, queries }
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn as_root(&self, name: &'static str) -> RootServer {
        let IpAddr::V4(ip) = self.addr.ip() else {
            panic!("mock upstream must be IPv4");
        };
        RootServer::new(name, ip, self.addr.port())
    }
}

/// Builds a response echoing the query's id and question.
fn response_to(query: &Packet) -> Packet {
    let mut response = Packet::new();
    response.header.id = query.header.id;
    response.header.response = true;
    response.header.recursion_available = true;
    if let Some(question) = query.questions.first() {
        response.questions.push(question.clone());
    }
    response
}

/// Builds an answer carrying a single A record for the queried name.
fn a_answer(query: &Packet, addr: Ipv4Addr, ttl: u32) -> Packet {
    let mut response = response_to(query);
    let qname = query
        .questions
        .first()
        .map(|q| q.name.clone())
        .unwrap_or_default();
    response.answers.push(Record::A {
        domain: qname,
        addr,
        ttl,
    });
    response
}

fn fast_config(upstream_port: u16) -> ResolverConfig {
    ResolverConfig {
        recv_timeout_ms: 100,
        send_timeout_ms: 500,
        max_retries: 2,
        initial_retry_delay_ms: 10,
        backoff_multiplier: 2.0,
        upstream_port,
        ..ResolverConfig::default()
    }
}

fn build_resolver(config: ResolverConfig, roots: RootServers) -> (Resolver, Arc<DnsCache>) {
    let cache = Arc::new(DnsCache::new(CacheConfig::default()));
    let resolver = Resolver::new(
        config,
        cache.clone(),
        Arc::new(TransactionTracker::new()),
        Arc::new(roots),
    );
    (resolver, cache)
}

/// Sends a query to a running server and awaits the response.
async fn query_server(server: SocketAddr, packet: &mut Packet) -> Option<Packet> {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut buf = PacketBuf::new();
    packet.write(&mut buf).unwrap();
    socket.send_to(buf.as_slice(), server).await.unwrap();

    let mut rbuf = [0u8; 512];
    let received = timeout(Duration::from_secs(2), socket.recv_from(&mut rbuf)).await;
    match received {
        Ok(Ok((len, _))) => {
            let mut res = PacketBuf::from_bytes(&rbuf[..len]);
            Some(Packet::from_buffer(&mut res).unwrap())
        }
        _ => None,
    }
}

// ============================================================================
// Wire Format
// ============================================================================

/// A captured response for `yahoo.com A` as served by a public resolver:
/// three A records, compression pointers back to the question name.
const YAHOO_RESPONSE: &[u8] = &[
    0x86, 0x2a, // id
    0x81, 0x80, // QR=1 RD=1 RA=1 rcode=0
    0x00, 0x01, // 1 question
    0x00, 0x03, // 3 answers
    0x00, 0x00, // 0 authorities
    0x00, 0x00, // 0 additionals
    // question: yahoo.com A IN
    0x05, b'y', b'a', b'h', b'o', b'o', 0x03, b'c', b'o', b'm', 0x00, 0x00, 0x01, 0x00, 0x01,
    // answer 1: yahoo.com A 98.137.11.163, ttl 1165
    0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x04, 0x8D, 0x00, 0x04, 0x62, 0x89, 0x0B,
    0xA3,
    // answer 2: yahoo.com A 98.137.11.164
    0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x04, 0x8D, 0x00, 0x04, 0x62, 0x89, 0x0B,
    0xA4,
    // answer 3: yahoo.com A 74.6.143.25
    0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x04, 0x8D, 0x00, 0x04, 0x4A, 0x06, 0x8F,
    0x19,
];

#[test]
fn test_parse_golden_response() {
    let mut buf = PacketBuf::from_bytes(YAHOO_RESPONSE);
    let packet = Packet::from_buffer(&mut buf).unwrap();

    assert!(packet.header.response);
    assert_eq!(packet.header.rescode, ResultCode::NoError);
    assert!(packet.header.answers >= 1);

    assert_eq!(packet.questions.len(), 1);
    assert_eq!(packet.questions[0].name, "yahoo.com");

    match &packet.answers[0] {
        Record::A { domain, addr, ttl } => {
            assert_eq!(domain, "yahoo.com");
            assert_eq!(*addr, Ipv4Addr::new(98, 137, 11, 163));
            assert!(*ttl > 0);
        }
        other => panic!("expected A record, got {:?}", other),
    }
}

#[test]
fn test_encode_then_decode() {
    let mut packet = Packet::new();
    packet.header.id = 9475;
    packet.header.recursion_desired = true;
    packet
        .questions
        .push(Question::new("google.com".to_string(), QueryType::A));

    let mut buf = PacketBuf::new();
    packet.write(&mut buf).unwrap();

    let mut reread = PacketBuf::from_bytes(buf.as_slice());
    let mut parsed = Packet::from_buffer(&mut reread).unwrap();

    assert_eq!(parsed, packet);

    // serializing the parsed packet reproduces the bytes exactly
    let mut rewritten = PacketBuf::new();
    parsed.write(&mut rewritten).unwrap();
    assert_eq!(rewritten.as_slice(), buf.as_slice());
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_resolves_direct_answer_from_root() {
    let upstream = MockUpstream::serve(|query| {
        Some(a_answer(query, Ipv4Addr::new(93, 184, 216, 34), 300))
    })
    .await;

    let roots = RootServers::from_servers(vec![upstream.as_root("mock-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    let response = resolver.resolve("example.com", QueryType::A).await.unwrap();

    assert_eq!(response.header.rescode, ResultCode::NoError);
    assert_eq!(response.first_a(), Some(Ipv4Addr::new(93, 184, 216, 34)));
    assert_eq!(upstream.query_count(), 1);
}

#[tokio::test]
async fn test_second_lookup_served_from_cache() {
    let upstream = MockUpstream::serve(|query| {
        Some(a_answer(query, Ipv4Addr::new(93, 184, 216, 34), 300))
    })
    .await;

    let roots = RootServers::from_servers(vec![upstream.as_root("mock-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    resolver.resolve("example.com", QueryType::A).await.unwrap();
    let second = resolver.resolve("example.com", QueryType::A).await.unwrap();

    assert_eq!(second.first_a(), Some(Ipv4Addr::new(93, 184, 216, 34)));
    // no further network traffic for the cached answer
    assert_eq!(upstream.query_count(), 1);
}

#[tokio::test]
async fn test_negative_caching_avoids_network() {
    let upstream = MockUpstream::serve(|query| {
        let mut response = response_to(query);
        response.header.rescode = ResultCode::NXDomain;
        Some(response)
    })
    .await;

    let roots = RootServers::from_servers(vec![upstream.as_root("mock-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    let first = resolver.resolve("nx.example", QueryType::A).await.unwrap();
    assert_eq!(first.header.rescode, ResultCode::NXDomain);
    assert_eq!(upstream.query_count(), 1);

    let second = resolver.resolve("nx.example", QueryType::A).await.unwrap();
    assert_eq!(second.header.rescode, ResultCode::NXDomain);
    assert!(second.answers.is_empty());
    // answered from the negative cache without any I/O
    assert_eq!(upstream.query_count(), 1);
}

#[tokio::test]
async fn test_root_failover_and_referral_with_glue() {
    let target = Ipv4Addr::new(192, 0, 2, 77);

    // the authoritative server for nictest.com
    let authoritative =
        MockUpstream::serve(move |query| Some(a_answer(query, target, 600))).await;

    // the live root refers the resolver to ns1.nictest.com with glue
    let glue_ip = Ipv4Addr::new(127, 0, 0, 1);
    let live_root = MockUpstream::serve(move |query| {
        let mut response = response_to(query);
        response.authorities.push(Record::Ns {
            domain: "nictest.com".to_string(),
            host: "ns1.nictest.com".to_string(),
            ttl: 600,
        });
        response.resources.push(Record::A {
            domain: "ns1.nictest.com".to_string(),
            addr: glue_ip,
            ttl: 600,
        });
        Some(response)
    })
    .await;

    // three dead roots that never answer
    let dead1 = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let dead2 = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let dead3 = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let dead_root = |socket: &UdpSocket, name: &'static str| {
        let addr = socket.local_addr().unwrap();
        let IpAddr::V4(ip) = addr.ip() else {
            panic!("mock root must be IPv4");
        };
        RootServer::new(name, ip, addr.port())
    };

    let roots = RootServers::from_servers(vec![
        dead_root(&dead1, "dead-a"),
        dead_root(&dead2, "dead-b"),
        dead_root(&dead3, "dead-c"),
        live_root.as_root("live-d"),
    ]);

    // referred nameservers are queried on the authoritative mock's port
    let config = fast_config(authoritative.addr.port());
    let (resolver, cache) = build_resolver(config, roots);

    let response = resolver
        .resolve("www.nictest.com", QueryType::A)
        .await
        .unwrap();

    assert_eq!(response.first_a(), Some(target));

    // each dead root timed out exactly once after its retries
    let timeouts: Vec<u64> = resolver.roots().iter().map(|r| r.timeouts()).collect();
    assert_eq!(timeouts, vec![1, 1, 1, 0]);
    assert!(resolver.roots().iter().nth(3).unwrap().hits() >= 1);

    // the glue landed in the NS cache
    assert_eq!(cache.lookup_ns("nictest.com"), Some(glue_ip));
}

#[tokio::test]
async fn test_forged_transaction_id_rejected() {
    let forged = MockUpstream::serve(|query| {
        let mut response = a_answer(query, Ipv4Addr::new(6, 6, 6, 6), 300);
        response.header.id = query.header.id.wrapping_add(1);
        Some(response)
    })
    .await;

    let roots = RootServers::from_servers(vec![forged.as_root("forged-a")]);
    let (resolver, cache) = build_resolver(fast_config(53), roots);

    let result = resolver.resolve("example.com", QueryType::A).await;

    assert!(result.is_err());
    assert!(forged.query_count() >= 1);
    // the forged answer never reached the cache
    assert!(cache.lookup("example.com", QueryType::A).is_none());
}

#[tokio::test]
async fn test_matching_transaction_id_accepted() {
    let upstream = MockUpstream::serve(|query| {
        Some(a_answer(query, Ipv4Addr::new(93, 184, 216, 34), 300))
    })
    .await;

    let roots = RootServers::from_servers(vec![upstream.as_root("mock-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    let response = resolver.resolve("example.com", QueryType::A).await.unwrap();
    assert_eq!(response.first_a(), Some(Ipv4Addr::new(93, 184, 216, 34)));
}

#[tokio::test]
async fn test_query_bit_response_rejected() {
    let confused = MockUpstream::serve(|query| {
        let mut response = a_answer(query, Ipv4Addr::new(6, 6, 6, 6), 300);
        response.header.response = false;
        Some(response)
    })
    .await;

    let roots = RootServers::from_servers(vec![confused.as_root("confused-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    let result = resolver.resolve("example.com", QueryType::A).await;
    assert!(result.is_err());
}

// ============================================================================
// Full Service
// ============================================================================

async fn start_server(
    resolver: Arc<Resolver>,
    limiter: Arc<RateLimiter>,
) -> (SocketAddr, broadcast::Sender<()>) {
    let config = ServerConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        workers: 2,
        ..ServerConfig::default()
    };

    let server = UdpServer::bind(config, limiter, resolver, Arc::new(ServerStats::new()))
        .await
        .unwrap();
    let addr = server.local_addr();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move { server.run(shutdown_rx).await });

    (addr, shutdown_tx)
}

#[tokio::test]
async fn test_end_to_end_query_over_udp() {
    let upstream = MockUpstream::serve(|query| {
        Some(a_answer(query, Ipv4Addr::new(203, 0, 113, 9), 300))
    })
    .await;

    let roots = RootServers::from_servers(vec![upstream.as_root("mock-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    let (addr, _shutdown) = start_server(
        Arc::new(resolver),
        Arc::new(RateLimiter::new(RateLimitConfig::default())),
    )
    .await;

    let mut query = Packet::new();
    query.header.id = 4096;
    query.header.recursion_desired = true;
    query
        .questions
        .push(Question::new("example.com".to_string(), QueryType::A));

    let response = query_server(addr, &mut query).await.unwrap();

    assert_eq!(response.header.id, 4096);
    assert!(response.header.response);
    assert!(response.header.recursion_available);
    assert_eq!(response.header.rescode, ResultCode::NoError);
    assert_eq!(response.questions.len(), 1);
    assert_eq!(response.first_a(), Some(Ipv4Addr::new(203, 0, 113, 9)));
}

#[tokio::test]
async fn test_empty_question_gets_formerr() {
    let upstream = MockUpstream::serve(|query| {
        Some(a_answer(query, Ipv4Addr::new(203, 0, 113, 9), 300))
    })
    .await;

    let roots = RootServers::from_servers(vec![upstream.as_root("mock-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    let (addr, _shutdown) = start_server(
        Arc::new(resolver),
        Arc::new(RateLimiter::new(RateLimitConfig::default())),
    )
    .await;

    let mut query = Packet::new();
    query.header.id = 777;

    let response = query_server(addr, &mut query).await.unwrap();

    assert_eq!(response.header.id, 777);
    assert_eq!(response.header.rescode, ResultCode::FormErr);
    assert!(response.questions.is_empty());
}

#[tokio::test]
async fn test_rate_limited_client_gets_no_response() {
    let upstream = MockUpstream::serve(|query| {
        Some(a_answer(query, Ipv4Addr::new(203, 0, 113, 9), 300))
    })
    .await;

    let roots = RootServers::from_servers(vec![upstream.as_root("mock-a")]);
    let (resolver, _cache) = build_resolver(fast_config(53), roots);

    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_queries_per_window: 1,
        window: Duration::from_secs(5),
        ..RateLimitConfig::default()
    }));

    let (addr, _shutdown) = start_server(Arc::new(resolver), limiter).await;

    let mut first = Packet::new();
    first.header.id = 1;
    first
        .questions
        .push(Question::new("example.com".to_string(), QueryType::A));
    assert!(query_server(addr, &mut first).await.is_some());

    // the second query inside the window is silently dropped
    let mut second = Packet::new();
    second.header.id = 2;
    second
        .questions
        .push(Question::new("example.com".to_string(), QueryType::A));
    assert!(query_server(addr, &mut second).await.is_none());
}
