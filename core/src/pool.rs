//! Connection pool.
//!
//! A mutex protects the idle list and the checked-out count; `BoundedWait`
//! additionally parks on a condition variable until a checkout is returned.
//! Checked-out connections come back via RAII ([`PooledConnection::drop`]),
//! the same ownership-releases-on-drop pattern the raw ODBC handle wrappers
//! use for their own resources.

use std::sync::{Arc, Condvar, Mutex};

use crate::connection::{Connection, ConnectionConfig};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::handle::Environment;

/// How the pool behaves once `max_size` checked-out connections are in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthStrategy {
    /// Checkout blocks until a connection is returned.
    BoundedWait,
    /// Checkout creates a transient extra connection above `max_size`; on
    /// return, the extra is dropped unless the idle list is below `max_size`.
    BoundedOverflow,
    /// Checkout always creates a new connection if none is idle; every
    /// returned connection is kept.
    UnboundedGrow,
}

/// Pool tuning: `initialSize` default 4, `maxSize` default 16,
/// `growthStrategy` default `BoundedOverflow`.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub initial_size: usize,
    pub max_size: usize,
    pub growth_strategy: GrowthStrategy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self { initial_size: 4, max_size: 16, growth_strategy: GrowthStrategy::BoundedOverflow }
    }
}

struct PoolState {
    idle: Vec<Connection>,
    checked_out: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub checked_out: usize,
}

/// A pool of [`Connection`]s dialed from one [`ConnectionConfig`]/[`Dialect`]
/// pair, grown and shrunk according to `options.growth_strategy`.
pub struct ConnectionPool {
    env: Arc<Environment>,
    config: ConnectionConfig,
    dialect: Arc<dyn Dialect>,
    options: PoolOptions,
    state: Mutex<PoolState>,
    returned: Condvar,
}

impl ConnectionPool {
    /// Dials `options.initial_size` connections up front. True for all three
    /// strategies.
    pub fn new(env: Arc<Environment>, config: ConnectionConfig, dialect: Arc<dyn Dialect>, options: PoolOptions) -> Result<Self> {
        let mut idle = Vec::with_capacity(options.initial_size);
        for _ in 0..options.initial_size {
            idle.push(Connection::open(env.clone(), &config, dialect.clone())?);
        }
        Ok(Self { env, config, dialect, options, state: Mutex::new(PoolState { idle, checked_out: 0 }), returned: Condvar::new() })
    }

    /// Checks out one connection, dialing a new one if the idle list is
    /// empty and the strategy allows it; blocks under `BoundedWait` once
    /// `checked_out == max_size` and the idle list is empty.
    pub fn checkout(self: &Arc<Self>) -> Result<PooledConnection> {
        let mut guard = self.state.lock().unwrap();
        loop {
            if let Some(conn) = guard.idle.pop() {
                guard.checked_out += 1;
                return Ok(PooledConnection { pool: Some(self.clone()), conn: Some(conn) });
            }
            match self.options.growth_strategy {
                GrowthStrategy::BoundedWait => {
                    if guard.checked_out >= self.options.max_size {
                        guard = self.returned.wait(guard).unwrap();
                        continue;
                    }
                    let conn = self.dial()?;
                    guard.checked_out += 1;
                    return Ok(PooledConnection { pool: Some(self.clone()), conn: Some(conn) });
                }
                GrowthStrategy::BoundedOverflow | GrowthStrategy::UnboundedGrow => {
                    let conn = self.dial()?;
                    guard.checked_out += 1;
                    return Ok(PooledConnection { pool: Some(self.clone()), conn: Some(conn) });
                }
            }
        }
    }

    fn dial(&self) -> Result<Connection> {
        Connection::open(self.env.clone(), &self.config, self.dialect.clone())
    }

    /// A snapshot of idle/checked-out counts, useful for pool-pressure logging.
    pub fn stats(&self) -> PoolStats {
        let guard = self.state.lock().unwrap();
        PoolStats { idle: guard.idle.len(), checked_out: guard.checked_out }
    }

    /// Returns `conn` to the pool, honoring each strategy's keep-or-drop rule
    /// `BoundedWait`/`UnboundedGrow` always keep it,
    /// `BoundedOverflow` keeps it only while the idle list is still below
    /// `max_size`.
    fn release(&self, conn: Connection) {
        let mut guard = self.state.lock().unwrap();
        guard.checked_out = guard.checked_out.saturating_sub(1);
        let keep = match self.options.growth_strategy {
            GrowthStrategy::BoundedWait | GrowthStrategy::UnboundedGrow => true,
            GrowthStrategy::BoundedOverflow => guard.idle.len() < self.options.max_size,
        };
        if keep {
            guard.idle.push(conn);
        }
        drop(guard);
        self.returned.notify_one();
    }
}

/// An RAII handle returned by [`ConnectionPool::checkout`]. Dropping it
/// returns the connection to the pool via RAII on scope end.
pub struct PooledConnection {
    pool: Option<Arc<ConnectionPool>>,
    conn: Option<Connection>,
}

impl std::ops::Deref for PooledConnection {
    type Target = Connection;
    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken")
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection taken")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let (Some(pool), Some(conn)) = (self.pool.take(), self.conn.take()) {
            pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_have_the_documented_values() {
        let options = PoolOptions::default();
        assert_eq!(options.initial_size, 4);
        assert_eq!(options.max_size, 16);
        assert_eq!(options.growth_strategy, GrowthStrategy::BoundedOverflow);
    }
}
