use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::BigDecimal, FromRow};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_method_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    MobileMoney,
    Card,
    BankTransfer,
    Cash,
    Wallet,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Subscription,
    Advertisement,
    Promotion,
    VisitFee,
    Deposit,
    Withdrawal,
    Refund,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl TransactionStatus {
    /// Allowed admin transitions. Failed, cancelled and refunded are final,
    /// and a completed transaction can only be refunded.
    pub fn can_move_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;

        matches!(
            (self, next),
            (Pending, Processing | Completed | Failed | Cancelled)
                | (Processing, Completed | Failed | Cancelled)
                | (Completed, Refunded)
        )
    }

    pub fn to_str(&self) -> &str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "refund_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub method_type: PaymentMethodType,
    pub processing_fee_percentage: BigDecimal,
    pub fixed_fee: BigDecimal,
    pub min_amount: BigDecimal,
    pub max_amount: Option<BigDecimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    pub fn processing_fee(&self, amount: &BigDecimal) -> BigDecimal {
        let percentage_fee = amount * &self.processing_fee_percentage / BigDecimal::from(100);
        (percentage_fee + &self.fixed_fee).round(2)
    }

    pub fn accepts(&self, amount: &BigDecimal) -> bool {
        if amount < &self.min_amount {
            return false;
        }
        match &self.max_amount {
            Some(max) => amount <= max,
            None => true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Currency {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub exchange_rate: BigDecimal,
    pub is_active: bool,
}

/// `total_amount` and `amount_usd` are generated columns and are only ever read.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_id: String,
    pub user_id: Uuid,
    pub payment_method_id: Uuid,
    pub currency_code: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: BigDecimal,
    pub processing_fee: BigDecimal,
    pub platform_fee: BigDecimal,
    pub total_amount: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub amount_usd: BigDecimal,
    pub refunded_amount: BigDecimal,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn refundable_amount(&self) -> BigDecimal {
        &self.amount - &self.refunded_amount
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PaymentAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_method_id: Uuid,
    pub account_name: String,
    pub account_number: String,
    pub provider: String,
    pub is_primary: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub user_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Refund {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub reason: String,
    pub status: RefundStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct WalletBalance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency_code: String,
    pub balance: BigDecimal,
    pub locked_balance: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

impl WalletBalance {
    pub fn available_balance(&self) -> BigDecimal {
        &self.balance - &self.locked_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn momo() -> PaymentMethod {
        PaymentMethod {
            id: Uuid::new_v4(),
            name: "MTN Mobile Money".to_string(),
            code: "mtn_momo".to_string(),
            method_type: PaymentMethodType::MobileMoney,
            processing_fee_percentage: BigDecimal::from_str("1.5").unwrap(),
            fixed_fee: BigDecimal::from(50),
            min_amount: BigDecimal::from(100),
            max_amount: Some(BigDecimal::from(1_000_000)),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_transitions() {
        use TransactionStatus::*;

        assert!(Pending.can_move_to(Completed));
        assert!(Processing.can_move_to(Failed));
        assert!(Completed.can_move_to(Refunded));

        assert!(!Completed.can_move_to(Completed));
        assert!(!Refunded.can_move_to(Completed));
        assert!(!Failed.can_move_to(Completed));
        assert!(!Cancelled.can_move_to(Pending));
        assert!(!Completed.can_move_to(Pending));
    }

    #[test]
    fn fee_combines_percentage_and_fixed_part() {
        let fee = momo().processing_fee(&BigDecimal::from(10_000));
        assert_eq!(fee, BigDecimal::from(200));
    }

    #[test]
    fn amount_bounds() {
        let method = momo();
        assert!(!method.accepts(&BigDecimal::from(99)));
        assert!(method.accepts(&BigDecimal::from(100)));
        assert!(method.accepts(&BigDecimal::from(1_000_000)));
        assert!(!method.accepts(&BigDecimal::from(1_000_001)));
    }

    #[test]
    fn available_balance_excludes_locked_funds() {
        let wallet = WalletBalance {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            currency_code: "XAF".to_string(),
            balance: BigDecimal::from(25_000),
            locked_balance: BigDecimal::from(5_000),
            updated_at: Utc::now(),
        };
        assert_eq!(wallet.available_balance(), BigDecimal::from(20_000));
    }
}
