use crate::{
    ConnectionHandle, ConnectionId, ConnectionLimits, DeliveryResult, Result as WsErrorResult,
    WsError,
};

use relay_core::{TeamId, UserId};

use std::collections::{HashMap, HashSet};
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes};
use error_location::ErrorLocation;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::RwLock;

/// Live connections grouped by user, plus team membership.
///
/// Sends snapshot the target handles under the read lock and write after
/// releasing it, so a slow client never blocks connects or disconnects.
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    limits: ConnectionLimits,
    write_timeout: Duration,
}

#[derive(Default)]
struct RegistryInner {
    /// A user key exists only while it has at least one connection
    by_user: HashMap<UserId, HashMap<ConnectionId, ConnectionHandle>>,
    /// A team key exists only while it has at least one connected member
    team_members: HashMap<TeamId, HashSet<UserId>>,
    total: usize,
}

impl ConnectionRegistry {
    pub fn new(limits: ConnectionLimits, write_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner::default())),
            limits,
            write_timeout,
        }
    }

    /// Register a live connection for `user_id`. Registering the same
    /// handle twice leaves a single entry.
    pub async fn connect(
        &self,
        connection: ConnectionHandle,
        user_id: UserId,
        team_id: Option<TeamId>,
    ) -> WsErrorResult<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let connection_id = connection.connection_id();

        let known = inner
            .by_user
            .get(&user_id)
            .is_some_and(|connections| connections.contains_key(&connection_id));

        if !known && inner.total >= self.limits.max_total {
            warn!(
                "Total connection limit reached: {}/{}",
                inner.total, self.limits.max_total
            );
            return Err(WsError::ConnectionLimitExceeded {
                current: inner.total,
                max: self.limits.max_total,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let connections = inner.by_user.entry(user_id).or_default();
        if connections.insert(connection_id, connection).is_none() {
            inner.total += 1;
        }

        if let Some(team_id) = team_id {
            inner.team_members.entry(team_id).or_default().insert(user_id);
        }

        info!(
            "Registered connection {connection_id} for user {user_id} ({} total)",
            inner.total
        );

        Ok(())
    }

    /// Remove a connection. Unknown ids are ignored. Returns true when an
    /// entry was actually removed.
    pub async fn disconnect(&self, connection_id: ConnectionId, user_id: UserId) -> bool {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let Some(connections) = inner.by_user.get_mut(&user_id) else {
            return false;
        };
        if connections.remove(&connection_id).is_none() {
            return false;
        }
        inner.total -= 1;

        if connections.is_empty() {
            inner.by_user.remove(&user_id);
            inner.team_members.retain(|_, members| {
                members.remove(&user_id);
                !members.is_empty()
            });
        }

        info!(
            "Unregistered connection {connection_id} for user {user_id} ({} total remaining)",
            inner.total
        );

        true
    }

    /// Send one text frame to every live connection of `user_id`.
    ///
    /// Connections whose write fails or times out are evicted.
    pub async fn send_to_user(
        &self,
        message: impl Into<Utf8Bytes>,
        user_id: UserId,
    ) -> DeliveryResult {
        let recipients: Vec<ConnectionHandle> = {
            let inner = self.inner.read().await;
            inner
                .by_user
                .get(&user_id)
                .map(|connections| connections.values().cloned().collect())
                .unwrap_or_default()
        };

        if recipients.is_empty() {
            debug!("No live connection for user {user_id}");
            return DeliveryResult::NoRecipient;
        }

        let text: Utf8Bytes = message.into();
        let attempts = join_all(recipients.iter().map(|connection| {
            connection.transmit(Message::Text(text.clone()), self.write_timeout)
        }))
        .await;

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (connection, attempt) in recipients.iter().zip(attempts) {
            match attempt {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Dropping connection {} for user {user_id}: {e}",
                        connection.connection_id()
                    );
                    failed.push(connection.connection_id());
                }
            }
        }

        for connection in recipients.iter().filter(|c| failed.contains(&c.connection_id())) {
            self.disconnect(connection.connection_id(), user_id).await;
            connection.evict();
        }

        DeliveryResult::from_attempts(delivered, failed)
    }

    /// Send one text frame to every member of `team_id` that is connected
    /// when the call starts. Members are served one after another.
    pub async fn broadcast_to_team(
        &self,
        message: impl Into<Utf8Bytes>,
        team_id: TeamId,
    ) -> DeliveryResult {
        let members = self.team_members(team_id).await;
        if members.is_empty() {
            debug!("No connected member in team {team_id}");
            return DeliveryResult::NoRecipient;
        }

        let text: Utf8Bytes = message.into();
        let mut result = DeliveryResult::NoRecipient;
        for user_id in members {
            result = result.merge(self.send_to_user(text.clone(), user_id).await);
        }

        debug!(
            "Broadcast to team {team_id} reached {} connections",
            result.delivered_count()
        );

        result
    }

    /// Get total connection count
    pub async fn total_count(&self) -> usize {
        self.inner.read().await.total
    }

    /// Whether another connection can be registered
    pub async fn has_capacity(&self) -> bool {
        self.total_count().await < self.limits.max_total
    }

    pub async fn user_connection_count(&self, user_id: UserId) -> usize {
        let inner = self.inner.read().await;
        inner.by_user.get(&user_id).map_or(0, HashMap::len)
    }

    pub async fn is_connected(&self, user_id: UserId) -> bool {
        self.inner.read().await.by_user.contains_key(&user_id)
    }

    /// Connected members of a team, in ascending id order
    pub async fn team_members(&self, team_id: TeamId) -> Vec<UserId> {
        let inner = self.inner.read().await;
        let mut members: Vec<UserId> = inner
            .team_members
            .get(&team_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}

impl Clone for ConnectionRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            limits: self.limits.clone(),
            write_timeout: self.write_timeout,
        }
    }
}
