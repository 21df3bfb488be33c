use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, OrderStatus,
};
use crate::errors::ServiceError;
use crate::models::{NewOrder, OrderRecord};

/// Outcome of a conditional `pending -> paid` update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTransition {
    /// The order was pending and is now paid under its final id.
    Transitioned(OrderRecord),
    /// The order exists but was not pending; nothing was written.
    Unchanged(OrderRecord),
    /// No order carries this gateway session id.
    Missing,
}

/// Persistence for storefront orders, keyed by order id and gateway session id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> Result<OrderRecord, ServiceError>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<OrderRecord>, ServiceError>;

    async fn find_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<OrderRecord>, ServiceError>;

    /// Moves a pending order to paid and rewrites its order id, atomically.
    async fn mark_paid(
        &self,
        session_id: &str,
        final_order_id: &str,
    ) -> Result<PaymentTransition, ServiceError>;
}

/// Order store backed by the `orders` table
#[derive(Debug, Clone)]
pub struct SeaOrmOrderStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmOrderStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn snapshot<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(value)
        .map_err(|e| ServiceError::InternalError(format!("Failed to serialize snapshot: {}", e)))
}

#[async_trait]
impl OrderStore for SeaOrmOrderStore {
    async fn create(&self, order: NewOrder) -> Result<OrderRecord, ServiceError> {
        let now = Utc::now();
        let model = OrderActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.order_id),
            customer: Set(snapshot(&order.customer)?),
            items: Set(snapshot(&order.items)?),
            total_amount: Set(order.total_amount),
            status: Set(order.status),
            gateway_session_id: Set(order.gateway_session_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?;

        debug!(order_id = %model.order_id, "order persisted");
        OrderRecord::try_from(model)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<OrderRecord>, ServiceError> {
        Order::find()
            .filter(Column::OrderId.eq(order_id))
            .one(self.db.as_ref())
            .await?
            .map(OrderRecord::try_from)
            .transpose()
    }

    async fn find_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<OrderRecord>, ServiceError> {
        Order::find()
            .filter(Column::GatewaySessionId.eq(session_id))
            .one(self.db.as_ref())
            .await?
            .map(OrderRecord::try_from)
            .transpose()
    }

    async fn mark_paid(
        &self,
        session_id: &str,
        final_order_id: &str,
    ) -> Result<PaymentTransition, ServiceError> {
        // Single conditional UPDATE; the status predicate is the guard.
        let result = Order::update_many()
            .col_expr(Column::Status, Expr::value(OrderStatus::Paid.into_value()))
            .col_expr(Column::OrderId, Expr::value(final_order_id))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::GatewaySessionId.eq(session_id))
            .filter(Column::Status.eq(OrderStatus::Pending.into_value()))
            .exec(self.db.as_ref())
            .await?;

        let current = self.find_by_session_id(session_id).await?;
        Ok(match (result.rows_affected, current) {
            (_, None) => PaymentTransition::Missing,
            (0, Some(order)) => PaymentTransition::Unchanged(order),
            (_, Some(order)) => PaymentTransition::Transitioned(order),
        })
    }
}

/// Process-local order store for tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    by_session: DashMap<String, OrderRecord>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate(field: &str, value: &str) -> ServiceError {
    ServiceError::DatabaseError(DbErr::Custom(format!(
        "duplicate {} '{}' violates unique constraint",
        field, value
    )))
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<OrderRecord, ServiceError> {
        if self
            .by_session
            .iter()
            .any(|entry| entry.order_id == order.order_id)
        {
            return Err(duplicate("order_id", &order.order_id));
        }

        match self.by_session.entry(order.gateway_session_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(duplicate("gateway_session_id", &order.gateway_session_id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let record = OrderRecord::from_new(order, Utc::now());
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<OrderRecord>, ServiceError> {
        Ok(self
            .by_session
            .iter()
            .find(|entry| entry.order_id == order_id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<OrderRecord>, ServiceError> {
        Ok(self.by_session.get(session_id).map(|entry| entry.clone()))
    }

    async fn mark_paid(
        &self,
        session_id: &str,
        final_order_id: &str,
    ) -> Result<PaymentTransition, ServiceError> {
        // Scanned before taking the write guard; the unique index plays this
        // role for the SQL store.
        let id_taken = self
            .by_session
            .iter()
            .any(|entry| entry.key() != session_id && entry.order_id == final_order_id);

        let Some(mut entry) = self.by_session.get_mut(session_id) else {
            return Ok(PaymentTransition::Missing);
        };

        if entry.status != OrderStatus::Pending {
            return Ok(PaymentTransition::Unchanged(entry.clone()));
        }

        if id_taken {
            return Err(duplicate("order_id", final_order_id));
        }

        entry.status = OrderStatus::Paid;
        entry.order_id = final_order_id.to_string();
        entry.updated_at = Utc::now();
        Ok(PaymentTransition::Transitioned(entry.clone()))
    }
}
