use rusqlite::Connection;

/// Initialize the ledger schema
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Orders (gateway-assigned id; never deleted, only superseded)
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            amount INTEGER NOT NULL CHECK (amount > 0),
            currency TEXT NOT NULL,
            receipt TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL CHECK (status IN ('created', 'attempted', 'paid', 'failed')),
            superseded_by TEXT,
            retry_of TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_orders_retry_of ON orders(retry_of) WHERE retry_of IS NOT NULL;

        -- Payments (one attempt to settle an order)
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id),
            signature_presented TEXT,
            verified INTEGER NOT NULL DEFAULT 0,
            capture_confirmed INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL CHECK (status IN ('pending', 'verified', 'rejected', 'failed', 'captured', 'refunded')),
            amount INTEGER,
            currency TEXT,
            refunded_amount INTEGER NOT NULL DEFAULT 0 CHECK (refunded_amount >= 0),
            failure_reason TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            -- captured/refunded only after both client verification and webhook confirmation
            CHECK (status NOT IN ('captured', 'refunded') OR (verified = 1 AND capture_confirmed = 1))
        );
        CREATE INDEX IF NOT EXISTS idx_payments_order ON payments(order_id);

        -- Refunds (pending rows reserve the amount while the gateway call is in flight)
        CREATE TABLE IF NOT EXISTS refunds (
            id TEXT PRIMARY KEY,
            gateway_refund_id TEXT UNIQUE,
            payment_id TEXT NOT NULL REFERENCES payments(id),
            amount INTEGER NOT NULL CHECK (amount > 0),
            currency TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('pending', 'processed')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_refunds_payment ON refunds(payment_id);

        -- Webhook deliveries (deduplication by event id)
        CREATE TABLE IF NOT EXISTS webhook_events (
            event_id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            payment_id TEXT,
            order_id TEXT,
            raw_body BLOB NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            received_at INTEGER NOT NULL,
            processed_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_webhook_events_processed ON webhook_events(processed_at) WHERE processed = 1;
        "#,
    )
}
