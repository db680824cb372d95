//! Redis Store Module
//!
//! [`KeyValueStore`] over a shared Redis connection supplied by the host.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, Value as RedisValue};

use crate::error::{Result, StoreError};
use crate::store::{Command, CommandOutcome, KeyValueStore, Pipeline, ScanPage};

/// Redis-backed store. Cloning shares the underlying multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(to_store_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(to_store_error)?;
        Ok(Self::new(conn))
    }
}

fn to_store_error(err: RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout(err.to_string())
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Transport(err.to_string())
    } else {
        StoreError::Protocol(err.to_string())
    }
}

fn expire_outcome(reply: &RedisValue) -> CommandOutcome {
    match reply {
        RedisValue::Int(1) => CommandOutcome::Applied,
        RedisValue::Int(0) => CommandOutcome::Missing,
        RedisValue::ServerError(err) => CommandOutcome::Failed(err.to_string()),
        other => CommandOutcome::Failed(format!("unexpected EXPIRE reply: {:?}", other)),
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let mut conn = self.conn.clone();
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(to_store_error)?;
        Ok(ScanPage { cursor, keys })
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(to_store_error)
    }

    async fn cardinality(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        redis::cmd("SCARD")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(to_store_error)
    }

    /// Sends the whole pipeline in one round trip. A command the server
    /// rejects comes back as [`CommandOutcome::Failed`] in its slot; only a
    /// failure of the round trip itself is an `Err`.
    async fn execute(&self, pipeline: &Pipeline) -> Result<Vec<CommandOutcome>> {
        let mut pipe = redis::pipe();
        pipe.ignore_errors();
        for command in pipeline.commands() {
            match command {
                Command::Expire { key, seconds } => {
                    pipe.cmd("EXPIRE").arg(key).arg(*seconds);
                }
            }
        }

        let mut conn = self.conn.clone();
        let replies: Vec<RedisValue> = pipe
            .query_async(&mut conn)
            .await
            .map_err(to_store_error)?;

        if replies.len() != pipeline.len() {
            return Err(StoreError::Protocol(format!(
                "pipeline of {} commands returned {} replies",
                pipeline.len(),
                replies.len()
            )));
        }
        Ok(replies.iter().map(expire_outcome).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use crate::config::Config;
    use crate::ttl::{CollectingSink, RoomTtlRefresher, SweepOutcome};

    // == Fake RESP server ==
    // Answers SCAN with two rooms, rejects any EXPIRE on `Room:bad` and
    // accepts every other EXPIRE. Anything else (connection setup) gets +OK.

    async fn read_command<R: AsyncBufRead + Unpin>(
        reader: &mut R,
    ) -> std::io::Result<Option<Vec<String>>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let count: usize = line.trim_end().trim_start_matches('*').parse().unwrap_or(0);

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            line.clear();
            reader.read_line(&mut line).await?;
            let len: usize = line.trim_end().trim_start_matches('$').parse().unwrap_or(0);
            let mut buf = vec![0; len + 2];
            reader.read_exact(&mut buf).await?;
            buf.truncate(len);
            args.push(String::from_utf8_lossy(&buf).into_owned());
        }
        Ok(Some(args))
    }

    fn reply_to(args: &[String]) -> &'static [u8] {
        let name = args.first().map(|a| a.to_ascii_uppercase());
        match name.as_deref() {
            Some("EXPIRE") if args.get(1).map(String::as_str) == Some("Room:bad") => {
                b"-ERR invalid expire time in 'expire' command\r\n"
            }
            Some("EXPIRE") => b":1\r\n",
            Some("SCAN") => b"*2\r\n$1\r\n0\r\n*2\r\n$8\r\nRoom:bad\r\n$7\r\nRoom:ok\r\n",
            _ => b"+OK\r\n",
        }
    }

    async fn spawn_fake_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (read, mut write) = socket.into_split();
                    let mut reader = BufReader::new(read);
                    while let Ok(Some(args)) = read_command(&mut reader).await {
                        if write.write_all(reply_to(&args)).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        format!("redis://{}", addr)
    }

    // == Reply mapping ==

    #[test]
    fn test_expire_reply_mapping() {
        assert_eq!(expire_outcome(&RedisValue::Int(1)), CommandOutcome::Applied);
        assert_eq!(expire_outcome(&RedisValue::Int(0)), CommandOutcome::Missing);
        assert!(matches!(
            expire_outcome(&RedisValue::Nil),
            CommandOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_server_error_reply_is_a_failed_command() {
        let reply = redis::parse_redis_value(b"-ERR invalid expire time in 'expire' command\r\n")
            .unwrap();
        assert!(matches!(reply, RedisValue::ServerError(_)));

        match expire_outcome(&reply) {
            CommandOutcome::Failed(reason) => assert!(reason.contains("invalid expire time")),
            other => panic!("expected a failed outcome, got {:?}", other),
        }
    }

    // == Round trips ==

    #[tokio::test]
    async fn test_rejected_expire_keeps_its_slot() {
        let url = spawn_fake_server().await;
        let store = RedisStore::connect(&url).await.unwrap();

        let mut pipeline = Pipeline::new();
        pipeline
            .expire("Room:bad", Duration::from_secs(60))
            .expire("Room:ok", Duration::from_secs(60));
        let outcomes = store.execute(&pipeline).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], CommandOutcome::Failed(_)));
        assert_eq!(outcomes[1], CommandOutcome::Applied);
    }

    #[tokio::test]
    async fn test_sweep_survives_rejected_expire() {
        let url = spawn_fake_server().await;
        let store = Arc::new(RedisStore::connect(&url).await.unwrap());
        let sink = Arc::new(CollectingSink::new());
        let refresher = RoomTtlRefresher::new(store, &Config::default()).with_sink(sink.clone());

        let report = refresher.sweep().await;

        assert_eq!(report.outcome, SweepOutcome::Completed);
        assert_eq!(report.rooms_refreshed, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.applied, 7);
        assert!(sink.failures().is_empty());
    }
}
