use chrono::NaiveDate;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::paymentmodel::{
    PaymentMethod, Transaction, TransactionStatus, TransactionType, WalletBalance,
};

fn required_positive(field: &'static str, amount: &BigDecimal) -> Result<(), ValidationErrors> {
    if amount <= &BigDecimal::zero() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must be greater than zero".into());
        errors.add(field, err);
        return Err(errors);
    }
    Ok(())
}

fn default_currency() -> String {
    "XAF".to_string()
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionDto {
    pub payment_method_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: BigDecimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be a 3 letter code"))]
    pub currency_code: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    pub reference_id: Option<Uuid>,
}

impl CreateTransactionDto {
    /// Positive amount within the method's limits.
    pub fn check_against(&self, method: &PaymentMethod) -> Result<(), ValidationErrors> {
        required_positive("amount", &self.amount)?;
        if !method.accepts(&self.amount) {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("range");
            err.message = Some(
                match &method.max_amount {
                    Some(max) => format!(
                        "{} accepts amounts between {} and {}",
                        method.name, method.min_amount, max
                    ),
                    None => format!("{} requires at least {}", method.name, method.min_amount),
                }
                .into(),
            );
            errors.add("amount", err);
            return Err(errors);
        }
        Ok(())
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransactionStatusDto {
    pub status: TransactionStatus,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateRefundDto {
    pub amount: BigDecimal,
    #[validate(length(min = 1, max = 1000, message = "A reason is required"))]
    pub reason: String,
}

impl CreateRefundDto {
    /// Only completed transactions refund, and never beyond what is left.
    pub fn check_against(&self, transaction: &Transaction) -> Result<(), ValidationErrors> {
        required_positive("amount", &self.amount)?;

        let mut errors = ValidationErrors::new();
        if transaction.status != TransactionStatus::Completed {
            let mut err = ValidationError::new("status");
            err.message = Some("Only completed transactions can be refunded".into());
            errors.add("transaction", err);
        } else if self.amount > transaction.refundable_amount() {
            let mut err = ValidationError::new("range");
            err.message = Some(
                format!(
                    "Refund cannot exceed the remaining {}",
                    transaction.refundable_amount()
                )
                .into(),
            );
            errors.add("amount", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentAccountDto {
    pub payment_method_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub account_name: String,
    #[validate(length(min = 1, max = 50))]
    pub account_number: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub provider: String,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceDto {
    pub user_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub tax_amount: Option<BigDecimal>,
    pub discount_amount: Option<BigDecimal>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

impl CreateInvoiceDto {
    pub fn check_amounts(&self) -> Result<(), ValidationErrors> {
        required_positive("amount", &self.amount)?;
        let tax = self.tax_amount.clone().unwrap_or_else(BigDecimal::zero);
        let discount = self.discount_amount.clone().unwrap_or_else(BigDecimal::zero);

        let mut errors = ValidationErrors::new();
        if tax < BigDecimal::zero() {
            let mut err = ValidationError::new("range");
            err.message = Some("Tax cannot be negative".into());
            errors.add("tax_amount", err);
        }
        if discount < BigDecimal::zero() || discount > &self.amount + &tax {
            let mut err = ValidationError::new("range");
            err.message = Some("Discount must be between zero and the invoice total".into());
            errors.add("discount_amount", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletDto {
    #[serde(flatten)]
    pub wallet: WalletBalance,
    pub available_balance: BigDecimal,
}

impl From<WalletBalance> for WalletDto {
    fn from(wallet: WalletBalance) -> Self {
        WalletDto {
            available_balance: wallet.available_balance(),
            wallet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn completed(amount: i64, refunded: i64) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            transaction_id: "TXN-20250101-ABCDEF12".to_string(),
            user_id: Uuid::new_v4(),
            payment_method_id: Uuid::new_v4(),
            currency_code: "XAF".to_string(),
            transaction_type: TransactionType::Subscription,
            status: TransactionStatus::Completed,
            amount: BigDecimal::from(amount),
            processing_fee: BigDecimal::zero(),
            platform_fee: BigDecimal::zero(),
            total_amount: BigDecimal::from(amount),
            exchange_rate: BigDecimal::from_str("0.0016").unwrap(),
            amount_usd: BigDecimal::zero(),
            refunded_amount: BigDecimal::from(refunded),
            description: String::new(),
            reference_id: None,
            processed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn refund(amount: i64) -> CreateRefundDto {
        CreateRefundDto {
            amount: BigDecimal::from(amount),
            reason: "Listing removed".to_string(),
        }
    }

    #[test]
    fn refund_is_bounded_by_what_remains() {
        let tx = completed(10_000, 4_000);
        assert!(refund(6_000).check_against(&tx).is_ok());
        let err = refund(6_001).check_against(&tx).unwrap_err();
        assert!(err.field_errors().contains_key("amount"));
        assert!(refund(0).check_against(&tx).is_err());
    }

    #[test]
    fn pending_transactions_cannot_be_refunded() {
        let mut tx = completed(10_000, 0);
        tx.status = TransactionStatus::Pending;
        let err = refund(100).check_against(&tx).unwrap_err();
        assert!(err.field_errors().contains_key("transaction"));
    }

    #[test]
    fn invoice_discount_cannot_exceed_total() {
        let mut dto = CreateInvoiceDto {
            user_id: Uuid::new_v4(),
            transaction_id: None,
            amount: BigDecimal::from(1000),
            tax_amount: Some(BigDecimal::from(190)),
            discount_amount: Some(BigDecimal::from(1200)),
            due_date: Utc::now().date_naive(),
            notes: String::new(),
        };
        assert!(dto.check_amounts().unwrap_err().field_errors().contains_key("discount_amount"));
        dto.discount_amount = Some(BigDecimal::from(100));
        assert!(dto.check_amounts().is_ok());
    }
}
