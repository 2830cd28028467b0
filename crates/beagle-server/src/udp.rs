//! The UDP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use socket2::{Domain, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info, trace};

use beagle_proto::PACKET_SIZE;
use beagle_resolver::Resolver;

use crate::limiter::RateLimiter;
use crate::stats::ServerStats;
use crate::worker::{spawn_workers, QueryTask, TaskQueue};
use crate::{Result, ServerConfig};

/// The UDP DNS service.
pub struct UdpServer {
    config: ServerConfig,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    limiter: Arc<RateLimiter>,
    resolver: Arc<Resolver>,
    stats: Arc<ServerStats>,
}

impl UdpServer {
    /// Binds the service socket.
    pub async fn bind(
        config: ServerConfig,
        limiter: Arc<RateLimiter>,
        resolver: Arc<Resolver>,
        stats: Arc<ServerStats>,
    ) -> Result<Self> {
        let domain = if config.listen.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, None)?;
        socket.set_reuse_address(true)?;

        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;
        socket.bind(&config.listen.into())?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)?;
        let local_addr = socket.local_addr()?;

        info!(addr = %local_addr, "udp server listening");

        Ok(Self {
            config,
            socket: Arc::new(socket),
            local_addr,
            limiter,
            resolver,
            stats,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop until shutdown: receive one datagram, admit it
    /// through the rate limiter, and hand it to the worker pool. Denied
    /// queries are dropped without a response.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let (tx, rx) = mpsc::channel::<QueryTask>(self.config.queue_depth);
        let queue: TaskQueue = Arc::new(Mutex::new(rx));

        let workers = self.config.effective_workers();
        let handles = spawn_workers(
            workers,
            queue,
            self.socket.clone(),
            self.resolver.clone(),
            self.stats.clone(),
        );
        info!(workers, "worker pool started");

        let mut buf = [0u8; PACKET_SIZE];
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("shutdown signal received, closing accept loop");
                    break;
                }
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, src)) => {
                            self.stats.inc_query();

                            if !self.limiter.allow(src.ip()) {
                                self.stats.inc_rate_limited();
                                trace!(client = %src, "dropped rate limited query");
                                continue;
                            }

                            let task = QueryTask {
                                data: Bytes::copy_from_slice(&buf[..len]),
                                src,
                            };

                            if tx.send(task).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            error!(error = %err, "error receiving datagram");
                        }
                    }
                }
            }
        }

        // closing the queue releases waiting workers
        drop(tx);
        for handle in handles {
            let _ = handle.await;
        }

        info!("udp server stopped");
        Ok(())
    }
}
