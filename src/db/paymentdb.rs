use async_trait::async_trait;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use super::db::DBClient;

use crate::{
    dtos::paymentdtos::{CreateInvoiceDto, CreatePaymentAccountDto, CreateRefundDto},
    models::paymentmodel::{
        Currency, Invoice, PaymentAccount, PaymentMethod, Refund, Transaction, TransactionStatus,
        TransactionType, WalletBalance,
    },
};

pub struct NewTransaction {
    pub transaction_id: String,
    pub user_id: Uuid,
    pub method: PaymentMethod,
    pub transaction_type: TransactionType,
    pub amount: BigDecimal,
    pub currency_code: String,
    pub exchange_rate: BigDecimal,
    pub description: String,
    pub reference_id: Option<Uuid>,
}

/// Outcome of an admin status change once the transaction row is locked.
pub enum StatusOutcome {
    Updated(Transaction),
    Rejected(TransactionStatus),
    NotFound,
}

/// Outcome of a refund request once the transaction row is locked.
pub enum RefundOutcome {
    Created(Refund),
    Rejected(validator::ValidationErrors),
    NotFound,
}

#[async_trait]
pub trait PaymentExt {
    async fn get_payment_methods(&self) -> Result<Vec<PaymentMethod>, sqlx::Error>;

    async fn get_payment_method(&self, method_id: Uuid) -> Result<Option<PaymentMethod>, sqlx::Error>;

    async fn get_currencies(&self) -> Result<Vec<Currency>, sqlx::Error>;

    async fn get_currency(&self, code: &str) -> Result<Option<Currency>, sqlx::Error>;

    async fn create_transaction(&self, transaction: NewTransaction) -> Result<Transaction, sqlx::Error>;

    async fn get_user_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error>;

    async fn get_transaction(&self, transaction_id: Uuid) -> Result<Option<Transaction>, sqlx::Error>;

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<StatusOutcome, sqlx::Error>;

    async fn request_refund(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
        refund: CreateRefundDto,
    ) -> Result<RefundOutcome, sqlx::Error>;

    async fn get_payment_accounts(&self, user_id: Uuid) -> Result<Vec<PaymentAccount>, sqlx::Error>;

    async fn create_payment_account(
        &self,
        user_id: Uuid,
        account: CreatePaymentAccountDto,
    ) -> Result<PaymentAccount, sqlx::Error>;

    async fn set_primary_account(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PaymentAccount>, sqlx::Error>;

    async fn get_wallets(&self, user_id: Uuid) -> Result<Vec<WalletBalance>, sqlx::Error>;

    async fn get_user_invoices(&self, user_id: Uuid) -> Result<Vec<Invoice>, sqlx::Error>;

    async fn create_invoice(
        &self,
        invoice_number: String,
        invoice: CreateInvoiceDto,
    ) -> Result<Invoice, sqlx::Error>;
}

/// Unlocks what a completed transaction paid for, inside the status change.
async fn settle(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    transaction: &Transaction,
) -> Result<(), sqlx::Error> {
    let Some(reference_id) = transaction.reference_id else {
        return Ok(());
    };

    let query = match transaction.transaction_type {
        TransactionType::Advertisement => {
            "UPDATE advertisements SET payment_status = 'paid', updated_at = NOW() WHERE id = $1"
        }
        TransactionType::Subscription => {
            r#"
            UPDATE user_subscriptions SET status = 'active', updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'trial')
            "#
        }
        _ => return Ok(()),
    };

    sqlx::query(query).bind(reference_id).execute(&mut **tx).await?;

    tracing::info!(
        "transaction {} settled {:?} {}",
        transaction.transaction_id,
        transaction.transaction_type,
        reference_id
    );
    Ok(())
}

/// Locks the user row so primary-account writers for one user queue up.
async fn clear_primary_account(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

    sqlx::query("UPDATE payment_accounts SET is_primary = FALSE WHERE user_id = $1 AND is_primary")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn get_payment_methods(&self) -> Result<Vec<PaymentMethod>, sqlx::Error> {
        sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_payment_method(&self, method_id: Uuid) -> Result<Option<PaymentMethod>, sqlx::Error> {
        sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE id = $1 AND is_active",
        )
        .bind(method_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_currencies(&self) -> Result<Vec<Currency>, sqlx::Error> {
        sqlx::query_as::<_, Currency>("SELECT * FROM currencies WHERE is_active ORDER BY code")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_currency(&self, code: &str) -> Result<Option<Currency>, sqlx::Error> {
        sqlx::query_as::<_, Currency>(
            "SELECT * FROM currencies WHERE code = UPPER($1) AND is_active",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_transaction(&self, transaction: NewTransaction) -> Result<Transaction, sqlx::Error> {
        let processing_fee = transaction.method.processing_fee(&transaction.amount);

        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                transaction_id, user_id, payment_method_id, currency_code, transaction_type,
                amount, processing_fee, exchange_rate, description, reference_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(transaction.transaction_id)
        .bind(transaction.user_id)
        .bind(transaction.method.id)
        .bind(transaction.currency_code)
        .bind(transaction.transaction_type)
        .bind(transaction.amount)
        .bind(processing_fee)
        .bind(transaction.exchange_rate)
        .bind(transaction.description)
        .bind(transaction.reference_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_transaction(&self, transaction_id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<StatusOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(StatusOutcome::NotFound);
        };

        if !current.status.can_move_to(status) {
            return Ok(StatusOutcome::Rejected(current.status));
        }

        let updated = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                status = $2,
                processed_at = CASE WHEN $2 = 'completed'::transaction_status THEN NOW() ELSE processed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        if status == TransactionStatus::Completed {
            settle(&mut tx, &updated).await?;
        }

        tx.commit().await?;
        Ok(StatusOutcome::Updated(updated))
    }

    async fn request_refund(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
        refund: CreateRefundDto,
    ) -> Result<RefundOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(transaction) = transaction else {
            return Ok(RefundOutcome::NotFound);
        };

        if let Err(errors) = refund.check_against(&transaction) {
            return Ok(RefundOutcome::Rejected(errors));
        }

        sqlx::query(
            r#"
            UPDATE transactions SET refunded_amount = refunded_amount + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(transaction.id)
        .bind(&refund.amount)
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, Refund>(
            r#"
            INSERT INTO refunds (transaction_id, user_id, amount, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(transaction.id)
        .bind(user_id)
        .bind(refund.amount)
        .bind(refund.reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RefundOutcome::Created(created))
    }

    async fn get_payment_accounts(&self, user_id: Uuid) -> Result<Vec<PaymentAccount>, sqlx::Error> {
        sqlx::query_as::<_, PaymentAccount>(
            r#"
            SELECT * FROM payment_accounts
            WHERE user_id = $1
            ORDER BY is_primary DESC, created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_payment_account(
        &self,
        user_id: Uuid,
        account: CreatePaymentAccountDto,
    ) -> Result<PaymentAccount, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if account.is_primary {
            clear_primary_account(&mut tx, user_id).await?;
        }

        let created = sqlx::query_as::<_, PaymentAccount>(
            r#"
            INSERT INTO payment_accounts (
                user_id, payment_method_id, account_name, account_number, provider, is_primary
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(account.payment_method_id)
        .bind(account.account_name)
        .bind(account.account_number)
        .bind(account.provider)
        .bind(account.is_primary)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn set_primary_account(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PaymentAccount>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        clear_primary_account(&mut tx, user_id).await?;

        let updated = sqlx::query_as::<_, PaymentAccount>(
            r#"
            UPDATE payment_accounts SET is_primary = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        tx.commit().await?;

        Ok(updated)
    }

    async fn get_wallets(&self, user_id: Uuid) -> Result<Vec<WalletBalance>, sqlx::Error> {
        sqlx::query_as::<_, WalletBalance>(
            "SELECT * FROM wallet_balances WHERE user_id = $1 ORDER BY currency_code",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_invoices(&self, user_id: Uuid) -> Result<Vec<Invoice>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_invoice(
        &self,
        invoice_number: String,
        invoice: CreateInvoiceDto,
    ) -> Result<Invoice, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                invoice_number, user_id, transaction_id, amount, tax_amount,
                discount_amount, due_date, notes
            )
            VALUES ($1, $2, $3, $4, COALESCE($5, 0), COALESCE($6, 0), $7, $8)
            RETURNING *
            "#,
        )
        .bind(invoice_number)
        .bind(invoice.user_id)
        .bind(invoice.transaction_id)
        .bind(invoice.amount)
        .bind(invoice.tax_amount)
        .bind(invoice.discount_amount)
        .bind(invoice.due_date)
        .bind(invoice.notes)
        .fetch_one(&self.pool)
        .await
    }
}
