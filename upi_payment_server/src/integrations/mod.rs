pub mod order_events;
pub mod wpay;
