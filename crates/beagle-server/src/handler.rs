//! Per-query handling.
//!
//! A worker takes one received datagram through parse, resolution, and
//! response serialization, then sends the answer back to the original
//! source through the shared service socket.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use beagle_proto::{Packet, PacketBuf, ResultCode};
use beagle_resolver::Resolver;

use crate::stats::ServerStats;
use crate::worker::QueryTask;
use crate::Result;

/// Handles one client query end to end.
pub async fn handle_query(
    socket: &UdpSocket,
    resolver: &Resolver,
    stats: &Arc<ServerStats>,
    task: QueryTask,
) -> Result<()> {
    let mut req = PacketBuf::from_bytes(&task.data);
    let request = match Packet::from_buffer(&mut req) {
        Ok(packet) => packet,
        Err(err) => {
            // nothing trustworthy to echo, not even the id
            stats.inc_parse_error();
            debug!(client = %task.src, error = %err, "dropping unparseable query");
            return Ok(());
        }
    };

    let mut response = Packet::new();
    response.header.id = request.header.id;
    response.header.recursion_desired = true;
    response.header.recursion_available = true;
    response.header.response = true;

    if let Some(question) = request.questions.into_iter().next() {
        info!(client = %task.src, question = %question, "received query");

        match resolver.resolve(&question.name, question.qtype).await {
            Ok(result) => {
                response.header.rescode = result.header.rescode;
                response.questions.push(question);

                for record in result.answers {
                    trace!(answer = %record, "answer");
                    response.answers.push(record);
                }
                for record in result.authorities {
                    trace!(authority = %record, "authority");
                    response.authorities.push(record);
                }
                for record in result.resources {
                    trace!(resource = %record, "resource");
                    response.resources.push(record);
                }
            }
            Err(err) => {
                warn!(client = %task.src, question = %question, error = %err, "lookup failed");
                stats.inc_servfail();
                response.header.rescode = ResultCode::ServFail;
                response.questions.push(question);
            }
        }
    } else {
        response.header.rescode = ResultCode::FormErr;
    }

    let mut res = PacketBuf::new();
    response.write(&mut res)?;

    socket.send_to(res.as_slice(), task.src).await?;
    stats.inc_response();

    Ok(())
}
