mod orders;
mod refunds;
mod retry;
mod verification;
mod webhooks;

pub use orders::OrderService;
pub use refunds::RefundService;
pub use retry::RetryService;
pub use verification::{VerificationResult, VerificationService};
pub use webhooks::WebhookProcessor;
