// checkout_service/src/web/handlers/mod.rs

pub mod booking_handlers;
pub mod cart_handlers;
pub mod checkout_handlers;
