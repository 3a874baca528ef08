//! RESP-speaking counter store client (Redis-compatible backends).
//!
//! One TCP connection shared behind a mutex: concurrent callers are
//! request/response serialized, so the connection never sees interleaved
//! commands. On I/O failure or timeout the connection is dropped and the
//! next call re-dials lazily.

use super::resp::{encode_command, try_decode, Reply};
use super::CounterStore;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tally_shared::{BucketKey, StoreError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

/// Live connection state: the stream plus its reply read-ahead buffer.
struct Conn {
    stream: TcpStream,
    buffer: Vec<u8>,
}

/// Network-backed [`CounterStore`] over the RESP protocol.
pub struct RedisCounterStore {
    addr: String,
    op_timeout: Duration,
    conn: Mutex<Option<Conn>>,
}

impl RedisCounterStore {
    /// Create a client for `addr` (host:port). No connection is made
    /// until the first operation.
    pub fn new(addr: impl Into<String>, op_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            op_timeout,
            conn: Mutex::new(None),
        }
    }

    /// Issue one command and read one reply, dialing if needed.
    ///
    /// The whole exchange is bounded by `op_timeout`. Timeout and I/O
    /// failure both drop the connection, so the next call starts from a
    /// clean dial instead of reading a stale half-reply.
    async fn command(&self, op: &'static str, args: &[&str]) -> Result<Reply, StoreError> {
        let mut guard = self.conn.lock().await;
        match tokio::time::timeout(self.op_timeout, Self::exchange(&self.addr, &mut guard, args))
            .await
        {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                *guard = None;
                Err(e)
            }
            Err(_) => {
                *guard = None;
                Err(StoreError::Timeout {
                    op,
                    after: self.op_timeout,
                })
            }
        }
    }

    async fn exchange(
        addr: &str,
        conn: &mut Option<Conn>,
        args: &[&str],
    ) -> Result<Reply, StoreError> {
        if conn.is_none() {
            let stream = TcpStream::connect(addr)
                .await
                .map_err(|e| StoreError::Unavailable(format!("connect {}: {}", addr, e)))?;
            debug!("connected to counter store at {}", addr);
            *conn = Some(Conn {
                stream,
                buffer: Vec::new(),
            });
        }
        let Some(c) = conn.as_mut() else {
            return Err(StoreError::Unavailable(
                "connection missing after dial".to_string(),
            ));
        };

        c.stream
            .write_all(&encode_command(args))
            .await
            .map_err(|e| StoreError::Unavailable(format!("write: {}", e)))?;

        loop {
            if let Some(reply) = try_decode(&mut c.buffer)? {
                return Ok(reply);
            }
            let mut chunk = [0u8; 4096];
            let n = c
                .stream
                .read(&mut chunk)
                .await
                .map_err(|e| StoreError::Unavailable(format!("read: {}", e)))?;
            if n == 0 {
                return Err(StoreError::Unavailable(
                    "connection closed by backend".to_string(),
                ));
            }
            c.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(s).map_err(|e| StoreError::Protocol(format!("bad decimal {:?}: {}", s, e)))
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, bucket: &BucketKey, amount: Decimal) -> Result<Decimal, StoreError> {
        // Fixed-point decimal text, never a binary float rendering.
        let amount = amount.normalize().to_string();
        match self
            .command("INCRBYFLOAT", &["INCRBYFLOAT", bucket.as_str(), &amount])
            .await?
        {
            Reply::Bulk(Some(value)) => parse_decimal(&value),
            Reply::Error(e) => Err(StoreError::Protocol(e)),
            other => Err(StoreError::Protocol(format!(
                "unexpected INCRBYFLOAT reply: {:?}",
                other
            ))),
        }
    }

    async fn refresh_expiry(&self, bucket: &BucketKey, ttl: Duration) -> Result<(), StoreError> {
        let secs = ttl.as_secs().to_string();
        match self
            .command("EXPIRE", &["EXPIRE", bucket.as_str(), &secs])
            .await?
        {
            Reply::Integer(_) => Ok(()),
            Reply::Error(e) => Err(StoreError::Protocol(e)),
            other => Err(StoreError::Protocol(format!(
                "unexpected EXPIRE reply: {:?}",
                other
            ))),
        }
    }

    async fn read(&self, bucket: &BucketKey) -> Result<Option<Decimal>, StoreError> {
        match self.command("GET", &["GET", bucket.as_str()]).await? {
            Reply::Bulk(Some(value)) => Ok(Some(parse_decimal(&value)?)),
            Reply::Bulk(None) => Ok(None),
            Reply::Error(e) => Err(StoreError::Protocol(e)),
            other => Err(StoreError::Protocol(format!(
                "unexpected GET reply: {:?}",
                other
            ))),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self.command("PING", &["PING"]).await? {
            Reply::Simple(s) if s == "PONG" => Ok(()),
            Reply::Error(e) => Err(StoreError::Protocol(e)),
            other => Err(StoreError::Protocol(format!(
                "unexpected PING reply: {:?}",
                other
            ))),
        }
    }
}
