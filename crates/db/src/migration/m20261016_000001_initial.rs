//! Initial ledger schema.
//!
//! Creates the enums, chart of accounts, transactions and entries, reversal
//! claims, numbering sequences, inventory tables, integrity triggers and
//! row-level security policies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(DEFAULT_ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: TRANSACTIONS & LEDGER
        // ============================================================
        db.execute_unprepared(TRANSACTION_SEQUENCES_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(TRANSACTION_REVERSALS_SQL).await?;

        // ============================================================
        // PART 4: INVENTORY
        // ============================================================
        db.execute_unprepared(INVENTORY_ITEMS_SQL).await?;
        db.execute_unprepared(STOCK_MOVEMENTS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 6: ROW-LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM (
    'ASSET',
    'LIABILITY',
    'EQUITY',
    'REVENUE',
    'EXPENSE',
    'COST_OF_SALES'
);

CREATE TYPE account_subtype AS ENUM (
    'CASH',
    'BANK',
    'ACCOUNTS_RECEIVABLE',
    'INVENTORY',
    'CURRENT_ASSET',
    'FIXED_ASSET',
    'OTHER_ASSET',
    'ACCOUNTS_PAYABLE',
    'TAX_PAYABLE',
    'CURRENT_LIABILITY',
    'LONG_TERM_LIABILITY',
    'SHARE_CAPITAL',
    'RETAINED_EARNINGS',
    'OTHER_EQUITY',
    'OPERATING_REVENUE',
    'OTHER_INCOME',
    'COST_OF_GOODS_SOLD',
    'OPERATING_EXPENSE',
    'OTHER_EXPENSE'
);

-- Posting roles an organization maps to concrete accounts
CREATE TYPE account_kind AS ENUM (
    'REVENUE',
    'EXPENSE',
    'COST_OF_GOODS_SOLD',
    'TAX_PAYABLE',
    'INVENTORY_ASSET',
    'ACCOUNTS_RECEIVABLE',
    'ACCOUNTS_PAYABLE',
    'CASH'
);

CREATE TYPE transaction_type AS ENUM (
    'SALE',
    'BILL',
    'RECEIPT',
    'PAYMENT',
    'BANK_TRANSFER',
    'REVERSAL',
    'JOURNAL',
    'ADJUSTMENT'
);

CREATE TYPE transaction_status AS ENUM ('DRAFT', 'POSTED', 'VOID');

CREATE TYPE entry_type AS ENUM ('DEBIT', 'CREDIT');

CREATE TYPE movement_type AS ENUM (
    'SALE',
    'RETURN',
    'ADJUSTMENT',
    'TRANSFER',
    'RECEIPT'
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    account_subtype account_subtype,
    parent_id UUID REFERENCES accounts(id),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_org_code UNIQUE (organization_id, code)
);

CREATE INDEX idx_accounts_type ON accounts(organization_id, account_type);
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const DEFAULT_ACCOUNTS_SQL: &str = r"
CREATE TABLE default_accounts (
    organization_id UUID NOT NULL,
    kind account_kind NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (organization_id, kind)
);
";

const TRANSACTION_SEQUENCES_SQL: &str = r"
-- One counter per organization and calendar month, bumped with an upsert
CREATE TABLE transaction_sequences (
    organization_id UUID NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL,
    last_value BIGINT NOT NULL,
    PRIMARY KEY (organization_id, period_year, period_month)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    transaction_number VARCHAR(30) NOT NULL,
    transaction_date DATE NOT NULL,
    transaction_type transaction_type NOT NULL,
    status transaction_status NOT NULL DEFAULT 'DRAFT',
    reference_type VARCHAR(50),
    reference_id VARCHAR(100),
    description TEXT NOT NULL,
    reverses_transaction_id UUID REFERENCES transactions(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    posted_at TIMESTAMPTZ,
    CONSTRAINT uq_transactions_number UNIQUE (organization_id, transaction_number),
    CONSTRAINT chk_reference_complete CHECK ((reference_type IS NULL) = (reference_id IS NULL)),
    CONSTRAINT chk_reversal_link CHECK (
        (transaction_type = 'REVERSAL') = (reverses_transaction_id IS NOT NULL)
    )
);

-- A document is posted at most once; reversals and voided drafts do not count
CREATE UNIQUE INDEX uq_transactions_document_reference
    ON transactions(organization_id, reference_type, reference_id)
    WHERE reference_type IS NOT NULL
      AND transaction_type <> 'REVERSAL'
      AND status <> 'VOID';

CREATE INDEX idx_txn_org_date ON transactions(organization_id, transaction_date) WHERE status = 'POSTED';
CREATE INDEX idx_txn_reference ON transactions(organization_id, reference_type, reference_id);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    entry_type entry_type NOT NULL,
    amount NUMERIC NOT NULL,
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC NOT NULL DEFAULT 1,
    amount_in_base NUMERIC NOT NULL,
    debit NUMERIC NOT NULL DEFAULT 0,
    credit NUMERIC NOT NULL DEFAULT 0,
    description TEXT,
    reconciled BOOLEAN NOT NULL DEFAULT false,
    CONSTRAINT uq_ledger_entries_line UNIQUE (transaction_id, line_no),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_exchange_rate_positive CHECK (exchange_rate > 0),
    CONSTRAINT chk_debit_or_credit CHECK (
        (entry_type = 'DEBIT' AND debit = amount_in_base AND credit = 0)
        OR (entry_type = 'CREDIT' AND credit = amount_in_base AND debit = 0)
    )
);

CREATE INDEX idx_le_transaction ON ledger_entries(transaction_id);
CREATE INDEX idx_le_account ON ledger_entries(organization_id, account_id);
";

const TRANSACTION_REVERSALS_SQL: &str = r"
-- Claim row: the primary key makes a second reversal of the same original fail
CREATE TABLE transaction_reversals (
    original_transaction_id UUID NOT NULL REFERENCES transactions(id),
    reversal_transaction_id UUID NOT NULL UNIQUE REFERENCES transactions(id),
    organization_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_transaction_reversals_original PRIMARY KEY (original_transaction_id)
);
";

const INVENTORY_ITEMS_SQL: &str = r"
CREATE TABLE inventory_items (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    product_id UUID NOT NULL,
    location VARCHAR(50) NOT NULL,
    quantity_on_hand NUMERIC NOT NULL DEFAULT 0,
    quantity_reserved NUMERIC NOT NULL DEFAULT 0,
    average_cost NUMERIC NOT NULL DEFAULT 0,
    total_value NUMERIC NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_inventory_items_product_location UNIQUE (organization_id, product_id, location),
    CONSTRAINT chk_quantity_reserved CHECK (quantity_reserved >= 0),
    CONSTRAINT chk_average_cost CHECK (average_cost >= 0)
);
";

const STOCK_MOVEMENTS_SQL: &str = r"
CREATE TABLE stock_movements (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    inventory_item_id UUID NOT NULL REFERENCES inventory_items(id),
    product_id UUID NOT NULL,
    location VARCHAR(50) NOT NULL,
    movement_type movement_type NOT NULL,
    quantity NUMERIC NOT NULL,
    unit_cost NUMERIC NOT NULL,
    total_cost NUMERIC NOT NULL,
    reference_type VARCHAR(50),
    reference_id VARCHAR(100),
    movement_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_sm_reference ON stock_movements(organization_id, reference_type, reference_id);
CREATE INDEX idx_sm_item ON stock_movements(inventory_item_id, created_at);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_transaction_balance
-- Posted transactions must balance in base currency
-- ============================================================
CREATE OR REPLACE FUNCTION check_transaction_balance()
RETURNS TRIGGER AS $$
DECLARE
    total_debit NUMERIC;
    total_credit NUMERIC;
    txn_status transaction_status;
BEGIN
    SELECT status INTO txn_status
    FROM transactions
    WHERE id = NEW.transaction_id;

    IF txn_status = 'POSTED' THEN
        SELECT
            COALESCE(SUM(debit), 0),
            COALESCE(SUM(credit), 0)
        INTO total_debit, total_credit
        FROM ledger_entries
        WHERE transaction_id = NEW.transaction_id;

        IF ABS(total_debit - total_credit) > 0.000001 THEN
            RAISE EXCEPTION 'Transaction is not balanced. Debit: %, Credit: %',
                total_debit, total_credit;
        END IF;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_balance
AFTER INSERT ON ledger_entries
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_transaction_balance();

-- ============================================================
-- FUNCTION: prevent_posted_modification
-- Posted transactions are immutable; voided drafts are final
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        IF OLD.status <> 'DRAFT' THEN
            RAISE EXCEPTION 'Only draft transactions can be deleted.';
        END IF;
        RETURN OLD;
    END IF;

    IF OLD.status = 'POSTED' THEN
        RAISE EXCEPTION 'Cannot modify posted transaction. Create a reversing entry instead.';
    END IF;

    IF OLD.status = 'VOID' THEN
        RAISE EXCEPTION 'Cannot modify voided transaction.';
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_mod
BEFORE UPDATE OR DELETE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_modification();

-- ============================================================
-- FUNCTION: prevent_posted_entry_modification
-- Entries of posted transactions cannot change
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_entry_modification()
RETURNS TRIGGER AS $$
DECLARE
    txn_status transaction_status;
BEGIN
    SELECT status INTO txn_status
    FROM transactions
    WHERE id = OLD.transaction_id;

    IF txn_status = 'POSTED' THEN
        RAISE EXCEPTION 'Cannot modify entries of a posted transaction.';
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_entry_mod
BEFORE UPDATE OR DELETE ON ledger_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_entry_modification();
";

const RLS_SQL: &str = r"
-- ============================================================
-- ROW-LEVEL SECURITY POLICIES
-- Sessions set app.current_organization_id before any query
-- ============================================================

ALTER TABLE accounts ENABLE ROW LEVEL SECURITY;
ALTER TABLE default_accounts ENABLE ROW LEVEL SECURITY;
ALTER TABLE transaction_sequences ENABLE ROW LEVEL SECURITY;
ALTER TABLE transactions ENABLE ROW LEVEL SECURITY;
ALTER TABLE ledger_entries ENABLE ROW LEVEL SECURITY;
ALTER TABLE transaction_reversals ENABLE ROW LEVEL SECURITY;
ALTER TABLE inventory_items ENABLE ROW LEVEL SECURITY;
ALTER TABLE stock_movements ENABLE ROW LEVEL SECURITY;

ALTER TABLE accounts FORCE ROW LEVEL SECURITY;
ALTER TABLE default_accounts FORCE ROW LEVEL SECURITY;
ALTER TABLE transaction_sequences FORCE ROW LEVEL SECURITY;
ALTER TABLE transactions FORCE ROW LEVEL SECURITY;
ALTER TABLE ledger_entries FORCE ROW LEVEL SECURITY;
ALTER TABLE transaction_reversals FORCE ROW LEVEL SECURITY;
ALTER TABLE inventory_items FORCE ROW LEVEL SECURITY;
ALTER TABLE stock_movements FORCE ROW LEVEL SECURITY;

CREATE POLICY tenant_isolation ON accounts
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);

CREATE POLICY tenant_isolation ON default_accounts
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);

CREATE POLICY tenant_isolation ON transaction_sequences
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);

CREATE POLICY tenant_isolation ON transactions
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);

CREATE POLICY tenant_isolation ON ledger_entries
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);

CREATE POLICY tenant_isolation ON transaction_reversals
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);

CREATE POLICY tenant_isolation ON inventory_items
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);

CREATE POLICY tenant_isolation ON stock_movements
    USING (organization_id = current_setting('app.current_organization_id', true)::UUID);
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

DROP TRIGGER IF EXISTS trg_prevent_posted_entry_mod ON ledger_entries;
DROP TRIGGER IF EXISTS trg_prevent_posted_mod ON transactions;
DROP TRIGGER IF EXISTS trg_check_balance ON ledger_entries;

DROP FUNCTION IF EXISTS prevent_posted_entry_modification();
DROP FUNCTION IF EXISTS prevent_posted_modification();
DROP FUNCTION IF EXISTS check_transaction_balance();

DROP TABLE IF EXISTS stock_movements CASCADE;
DROP TABLE IF EXISTS inventory_items CASCADE;
DROP TABLE IF EXISTS transaction_reversals CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS transaction_sequences CASCADE;
DROP TABLE IF EXISTS default_accounts CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP TYPE IF EXISTS movement_type CASCADE;
DROP TYPE IF EXISTS entry_type CASCADE;
DROP TYPE IF EXISTS transaction_status CASCADE;
DROP TYPE IF EXISTS transaction_type CASCADE;
DROP TYPE IF EXISTS account_kind CASCADE;
DROP TYPE IF EXISTS account_subtype CASCADE;
DROP TYPE IF EXISTS account_type CASCADE;
";
