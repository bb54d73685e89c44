//! Database connection pool management
//!
//! Wraps sqlx `PgPool` with explicit connection limits taken from
//! [`DbConfig`]. A pooled connection goes back to the pool when its
//! handle is dropped, so `release` is just an explicit drop.

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use tracing::info;

use nbbctl_core::{DbConfig, PoolConfig};

use crate::error::{StartupError, StoreError};

pub type PooledConnection = PoolConnection<Postgres>;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub size: u32,
    pub idle: usize,
    pub closed: bool,
}

/// Bounded set of connections to one PostgreSQL endpoint. Cheap to clone;
/// clones share the same connections.
#[derive(Clone, Debug)]
pub struct ConnectionPool {
    inner: PgPool,
}

impl ConnectionPool {
    /// Open the pool described by `config`.
    ///
    /// At least one connection is established before returning, so an
    /// unreachable endpoint or bad credentials fail here.
    pub async fn connect(config: &DbConfig) -> Result<Self, StartupError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);

        Self::connect_with(options, &config.pool)
            .await
            .map_err(|source| StartupError::Connect {
                endpoint: config.endpoint(),
                source,
            })
    }

    /// Open a pool from prepared connect options (e.g. parsed from a URL).
    pub async fn connect_with(
        options: PgConnectOptions,
        pool: &PoolConfig,
    ) -> Result<Self, sqlx::Error> {
        let mut builder = PgPoolOptions::new()
            .min_connections(pool.min_connections)
            .max_connections(pool.max_connections);
        if let Some(timeout) = pool.acquire_timeout {
            builder = builder.acquire_timeout(timeout);
        }

        let inner = builder.connect_with(options).await?;
        info!(
            min = pool.min_connections,
            max = pool.max_connections,
            "connection pool ready"
        );
        Ok(Self { inner })
    }

    pub fn from_pool(inner: PgPool) -> Self {
        Self { inner }
    }

    /// Borrow a connection, waiting while all `max_connections` are lent out.
    pub async fn acquire(&self) -> Result<PooledConnection, StoreError> {
        self.inner
            .acquire()
            .await
            .map_err(|err| StoreError::new("acquiring a connection", err))
    }

    /// Hand a connection back for reuse.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Close every connection. Waits for lent connections to come back;
    /// calling it again, or on a pool that was never used, is harmless.
    pub async fn close(&self) {
        if self.inner.is_closed() {
            return;
        }
        self.inner.close().await;
        info!("connection pool closed");
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.inner.size(),
            idle: self.inner.num_idle(),
            closed: self.inner.is_closed(),
        }
    }

    pub fn pg_pool(&self) -> &PgPool {
        &self.inner
    }
}
