/**
 * Redis Presence Store
 *
 * Presence state shared between server processes. A multiplexed connection
 * is cloned per call; membership changes that touch two keys go through an
 * atomic pipeline (MULTI/EXEC). Session counts live in one hash so every
 * process sees the same first/last transitions.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use uuid::Uuid;

use super::{
    room_members_key, typing_key, user_rooms_key, PresenceStore, ONLINE_USERS_KEY,
    USER_SESSIONS_KEY, USER_SOCKETS_KEY,
};

/// Decrement a user's session count; at zero drop the count, the online
/// flag and the socket mapping together
const RELEASE_SESSION: &str = r"
local remaining = redis.call('HINCRBY', KEYS[1], ARGV[1], -1)
if remaining <= 0 then
    redis.call('HDEL', KEYS[1], ARGV[1])
    redis.call('SREM', KEYS[2], ARGV[1])
    redis.call('HDEL', KEYS[3], ARGV[1])
    return 0
end
return remaining
";
use crate::backend::error::BackendError;

#[derive(Clone)]
pub struct RedisPresence {
    conn: MultiplexedConnection,
}

impl RedisPresence {
    /// Connect and verify the server answers PING
    pub async fn connect(redis_url: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("[Presence] Connected to Redis");
        Ok(Self { conn })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

fn parse_ids(values: Vec<String>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = values
        .iter()
        .filter_map(|v| Uuid::parse_str(v).ok())
        .collect();
    ids.sort();
    ids
}

#[async_trait]
impl PresenceStore for RedisPresence {
    async fn add_online(&self, user_id: Uuid) -> Result<u64, BackendError> {
        let member = user_id.to_string();
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("HINCRBY")
            .arg(USER_SESSIONS_KEY)
            .arg(&member)
            .arg(1)
            .cmd("SADD")
            .arg(ONLINE_USERS_KEY)
            .arg(&member)
            .ignore()
            .query_async(&mut self.conn())
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn remove_online(&self, user_id: Uuid) -> Result<u64, BackendError> {
        let script = redis::Script::new(RELEASE_SESSION);
        let remaining: i64 = script
            .key(USER_SESSIONS_KEY)
            .key(ONLINE_USERS_KEY)
            .key(USER_SOCKETS_KEY)
            .arg(user_id.to_string())
            .invoke_async(&mut self.conn())
            .await?;
        Ok(remaining.max(0) as u64)
    }

    async fn is_online(&self, user_id: Uuid) -> Result<bool, BackendError> {
        let member: bool = redis::cmd("SISMEMBER")
            .arg(ONLINE_USERS_KEY)
            .arg(user_id.to_string())
            .query_async(&mut self.conn())
            .await?;
        Ok(member)
    }

    async fn online_users(&self) -> Result<Vec<Uuid>, BackendError> {
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(ONLINE_USERS_KEY)
            .query_async(&mut self.conn())
            .await?;
        Ok(parse_ids(members))
    }

    async fn set_user_socket(&self, user_id: Uuid, connection_id: Uuid) -> Result<(), BackendError> {
        let _: () = redis::cmd("HSET")
            .arg(USER_SOCKETS_KEY)
            .arg(user_id.to_string())
            .arg(connection_id.to_string())
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn clear_user_socket(&self, user_id: Uuid) -> Result<(), BackendError> {
        let _: () = redis::cmd("HDEL")
            .arg(USER_SOCKETS_KEY)
            .arg(user_id.to_string())
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn user_socket(&self, user_id: Uuid) -> Result<Option<Uuid>, BackendError> {
        let value: Option<String> = redis::cmd("HGET")
            .arg(USER_SOCKETS_KEY)
            .arg(user_id.to_string())
            .query_async(&mut self.conn())
            .await?;
        Ok(value.and_then(|v| Uuid::parse_str(&v).ok()))
    }

    async fn join_room(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let _: () = redis::pipe()
            .atomic()
            .cmd("SADD")
            .arg(room_members_key(conversation_id))
            .arg(user_id.to_string())
            .ignore()
            .cmd("HSET")
            .arg(user_rooms_key(user_id))
            .arg(conversation_id.to_string())
            .arg(at.to_rfc3339())
            .ignore()
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn room_members(&self, conversation_id: Uuid) -> Result<Vec<Uuid>, BackendError> {
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(room_members_key(conversation_id))
            .query_async(&mut self.conn())
            .await?;
        Ok(parse_ids(members))
    }

    async fn joined_at(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, BackendError> {
        let value: Option<String> = redis::cmd("HGET")
            .arg(user_rooms_key(user_id))
            .arg(conversation_id.to_string())
            .query_async(&mut self.conn())
            .await?;
        Ok(value
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc)))
    }

    async fn set_typing(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        ttl: Duration,
    ) -> Result<(), BackendError> {
        let _: () = redis::cmd("SETEX")
            .arg(typing_key(user_id, conversation_id))
            .arg(ttl.as_secs().max(1))
            .arg("1")
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn clear_typing(&self, user_id: Uuid, conversation_id: Uuid) -> Result<(), BackendError> {
        let _: () = redis::cmd("DEL")
            .arg(typing_key(user_id, conversation_id))
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn is_typing(&self, user_id: Uuid, conversation_id: Uuid) -> Result<bool, BackendError> {
        let exists: bool = redis::cmd("EXISTS")
            .arg(typing_key(user_id, conversation_id))
            .query_async(&mut self.conn())
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_skips_garbage() {
        let id = Uuid::new_v4();
        let ids = parse_ids(vec![id.to_string(), "not-a-uuid".into()]);
        assert_eq!(ids, vec![id]);
    }
}
