mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::gateway::PaymentGateway;
use crate::ledger::Ledger;
use crate::services::{
    OrderService, RefundService, RetryService, VerificationService, WebhookProcessor,
};
use crate::signature::SignatureKeys;

pub type DbPool = Pool<SqliteConnectionManager>;

/// How long a writer waits for the SQLite write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state: the ledger plus one instance of each service, all
/// sharing the same injected gateway client and signing keys.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub orders: OrderService,
    pub verification: VerificationService,
    pub webhooks: WebhookProcessor,
    pub retries: RetryService,
    pub refunds: RefundService,
}

impl AppState {
    pub fn new(
        db: DbPool,
        gateway: Arc<dyn PaymentGateway>,
        keys: SignatureKeys,
        default_currency: String,
    ) -> Self {
        let ledger = Ledger::new(db);
        let keys = Arc::new(keys);
        let orders = OrderService::new(ledger.clone(), gateway.clone(), default_currency);

        Self {
            verification: VerificationService::new(ledger.clone(), keys.clone()),
            webhooks: WebhookProcessor::new(ledger.clone(), keys),
            retries: RetryService::new(ledger.clone(), gateway.clone(), orders.clone()),
            refunds: RefundService::new(ledger.clone(), gateway),
            orders,
            ledger,
        }
    }
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
    });
    Pool::builder().max_size(10).build(manager)
}
