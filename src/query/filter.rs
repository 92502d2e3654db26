use rust_decimal::Decimal;

use crate::storage::Predicate;

/// Optional search constraints, combined with AND semantics.
///
/// An absent (or blank) parameter imposes no constraint. A minimum above the
/// maximum is a valid filter that simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub merchant: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn min_amount(mut self, amount: Decimal) -> Self {
        self.min_amount = Some(amount);
        self
    }

    pub fn max_amount(mut self, amount: Decimal) -> Self {
        self.max_amount = Some(amount);
        self
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let merchant = self.merchant.as_deref()
            .map(str::trim)
            .filter(|merchant| !merchant.is_empty())
            .map(|merchant| Predicate::MerchantContains(merchant.to_string()));
        let min_amount = self.min_amount.map(Predicate::MinAmount);
        let max_amount = self.max_amount.map(Predicate::MaxAmount);

        [merchant, min_amount, max_amount].into_iter().flatten().collect()
    }
}
