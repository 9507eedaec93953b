//! Checkout: the calculation pipeline, orders, gateways, and the
//! orchestrator.

pub mod calculator;
pub mod gateway;
pub mod orchestrator;
pub mod order;

pub use calculator::{Calculator, PriceOverride};
pub use gateway::{GatewayRegistry, GatewayResponse, OfflineGateway, PaymentGateway, RefundResult};
pub use orchestrator::{CheckoutOrchestrator, CheckoutOutcome, CheckoutRequest};
pub use order::{Order, OrderStatus, PaymentStatus, StatusLogEntry, StatusTransition};
