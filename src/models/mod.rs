mod order;
mod payment;
mod refund;
mod webhook_event;

pub use order::*;
pub use payment::*;
pub use refund::*;
pub use webhook_event::*;
