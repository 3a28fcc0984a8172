use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderPatch, OrderStatusType},
    traits::OrderStoreError,
};

/// Inserts a new order in the `CREATED` state. This is a single statement, so it is atomic on its own.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let order_id = order.order_id.clone();
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                order_id,
                platform_order_id,
                amount,
                currency,
                pay_type,
                status,
                pay_url,
                qr_payload,
                metadata,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.platform_order_id)
    .bind(order.amount)
    .bind(order.currency)
    .bind(order.pay_type)
    .bind(OrderStatusType::Created)
    .bind(order.pay_url)
    .bind(order.qr_payload)
    .bind(order.metadata)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(OrderStoreError::OrderAlreadyExists(order_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Conditionally updates an order in one `UPDATE .. WHERE status IN (..) RETURNING *` statement.
///
/// Write-once columns use `COALESCE(column, new)` so that an existing value always wins. Returns `None` if no row
/// matched, i.e. the order does not exist or its status is not in `allowed`.
pub async fn update_if_status_in(
    order_id: &OrderId,
    allowed: &[OrderStatusType],
    next: Option<OrderStatusType>,
    patch: OrderPatch,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(status) = next {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    builder.push(", platform_order_id = COALESCE(platform_order_id, ");
    builder.push_bind(patch.platform_order_id);
    builder.push("), pay_url = COALESCE(pay_url, ");
    builder.push_bind(patch.pay_url);
    builder.push("), qr_payload = COALESCE(qr_payload, ");
    builder.push_bind(patch.qr_payload);
    builder.push("), utr = COALESCE(utr, ");
    builder.push_bind(patch.utr);
    builder.push("), completed_at = COALESCE(");
    builder.push_bind(patch.completed_at);
    builder.push(", completed_at), last_callback_payload = COALESCE(");
    builder.push_bind(patch.last_callback_payload);
    builder.push(", last_callback_payload) WHERE order_id = ");
    builder.push_bind(order_id.clone());
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in allowed {
        statuses.push_bind(*status);
    }
    statuses.push_unseparated(") RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    Ok(order)
}
