pub mod cart;
pub mod order;

pub use cart::{CartLine, Customer, PricedCart, PricedLine, ProductRef};
pub use order::{NewOrder, OrderItem, OrderRecord};
