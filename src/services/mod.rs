// Storefront orchestrators
pub mod checkout;
pub mod verification;

// Secondary flows
pub mod catalog;
pub mod contact;
pub mod manual_orders;

// External collaborators
pub mod payment_gateway;

pub use payment_gateway::PaymentMode;
