pub mod order_repository;

pub use order_repository::{InMemoryOrderStore, OrderStore, PaymentTransition, SeaOrmOrderStore};

#[cfg(test)]
pub use order_repository::MockOrderStore;
