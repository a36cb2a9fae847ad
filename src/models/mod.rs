pub mod client;
pub mod courier;
pub mod shipment;
pub mod transaction;
