//! `SqliteDatabase` is the durable [`OrderStore`] backend.
//!
//! Atomicity of [`OrderStore::transition`] comes from doing the status check and the write in a single
//! `UPDATE .. WHERE status IN (..)` statement. SQLite serialises writers, so two racing transitions for the same order
//! can never both match.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{create_database_if_missing, db_url, new_pool, orders};
use crate::{
    db_types::{NewOrder, Order, OrderId, OrderPatch, OrderStatusType},
    traits::{allowed_prior_states, OrderStore, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_id, order.id);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn)
            .await?
            .ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))
    }

    async fn transition(
        &self,
        order_id: &OrderId,
        expected: &[OrderStatusType],
        next: Option<OrderStatusType>,
        patch: OrderPatch,
    ) -> Result<Order, OrderStoreError> {
        let allowed = allowed_prior_states(expected, next)?;
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_if_status_in(order_id, &allowed, next, patch, &mut tx).await?;
        let result = match updated {
            Some(order) => {
                trace!("🗃️ Order {order_id} is now {}", order.status);
                Ok(order)
            },
            None => match orders::fetch_order_by_order_id(order_id, &mut tx).await? {
                Some(order) => {
                    trace!("🗃️ Order {order_id} is {}, so the transition does not apply", order.status);
                    Err(OrderStoreError::Conflict { order_id: order_id.clone(), current: order.status })
                },
                None => Err(OrderStoreError::OrderNotFound(order_id.clone())),
            },
        };
        tx.commit().await?;
        result
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `UPG_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates the database file if needed, connects, and brings the schema up to date.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self, OrderStoreError> {
        create_database_if_missing(url).await?;
        let db = Self::new_with_url(url, max_connections).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), OrderStoreError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| OrderStoreError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
