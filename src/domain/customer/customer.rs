//! Customer entity, owned by a merchant.

use serde::{Deserialize, Serialize};

use super::ContactHandle;
use crate::domain::foundation::{CustomerId, MerchantId, Money, Timestamp};

/// A merchant's customer, created lazily on first contact.
///
/// # Invariants
///
/// - `(merchant_id, handle)` is unique
/// - counters only grow, one step per created order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub merchant_id: MerchantId,
    pub handle: ContactHandle,
    pub display_name: Option<String>,
    pub order_count: u32,
    pub lifetime_spend: Money,
    pub last_order_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Customer {
    /// A first-contact customer with zero counters.
    pub fn first_contact(
        merchant_id: MerchantId,
        handle: ContactHandle,
        display_name: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: CustomerId::new(),
            merchant_id,
            handle,
            display_name: display_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            order_count: 0,
            lifetime_spend: Money::ZERO,
            last_order_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one created order to the counters.
    ///
    /// Stores perform the same arithmetic atomically; this is the in-process
    /// equivalent used by the in-memory store.
    pub fn record_order(&mut self, amount: Money, at: Timestamp) {
        self.order_count = self.order_count.saturating_add(1);
        self.lifetime_spend = self.lifetime_spend.saturating_add(amount);
        self.last_order_at = Some(match self.last_order_at {
            Some(prev) if prev.is_after(&at) => prev,
            _ => at,
        });
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer::first_contact(
            MerchantId::new(),
            ContactHandle::new("+237699001122").unwrap(),
            Some("  Awa ".to_string()),
        )
    }

    #[test]
    fn first_contact_has_zero_counters() {
        let c = customer();
        assert_eq!(c.order_count, 0);
        assert_eq!(c.lifetime_spend, Money::ZERO);
        assert!(c.last_order_at.is_none());
        assert_eq!(c.display_name.as_deref(), Some("Awa"));
    }

    #[test]
    fn blank_name_is_dropped() {
        let c = Customer::first_contact(
            MerchantId::new(),
            ContactHandle::new("+237699001122").unwrap(),
            Some("   ".to_string()),
        );
        assert!(c.display_name.is_none());
    }

    #[test]
    fn record_order_accumulates() {
        let mut c = customer();
        let t1 = Timestamp::now();
        c.record_order(Money::new(5_000).unwrap(), t1);
        c.record_order(Money::new(2_500).unwrap(), t1.add_minutes(5));

        assert_eq!(c.order_count, 2);
        assert_eq!(c.lifetime_spend.minor_units(), 7_500);
        assert_eq!(c.last_order_at, Some(t1.add_minutes(5)));
    }

    #[test]
    fn out_of_order_record_keeps_latest_timestamp() {
        let mut c = customer();
        let later = Timestamp::now();
        c.record_order(Money::ZERO, later);
        c.record_order(Money::ZERO, later.add_minutes(-10));
        assert_eq!(c.last_order_at, Some(later));
    }
}
