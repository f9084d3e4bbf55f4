use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::error::{CasinoError, StoreError};
use crate::storage::{Store, UserId};

pub const DAILY_BONUS: i64 = 500;

#[derive(Debug, Eq, PartialEq)]
pub enum Bonus {
    Granted { balance: i64 },
    AlreadyClaimed,
}

/// Per-user coin balances over the shared store. Accounts are created
/// lazily with the default starting balance on first reference.
pub struct Ledger<S> {
    store: Arc<S>,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn balance(&self, user: UserId) -> Result<i64, StoreError> {
        self.store.update(user, |account, _| account.coins)
    }

    /// Runs `f` against the user's coin count as one atomic step.
    pub fn with_account<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut i64) -> R,
    ) -> Result<R, StoreError> {
        self.store.update(user, |account, _| f(&mut account.coins))
    }

    /// Applies `delta` and returns the new balance. The check and the
    /// debit are one atomic step: a delta that would take the balance
    /// below zero is rejected without touching the account.
    pub fn adjust(&self, user: UserId, delta: i64) -> Result<i64, CasinoError> {
        self.store.update(user, |account, _| {
            if account.coins + delta < 0 {
                return Err(CasinoError::InsufficientFunds);
            }
            account.coins += delta;
            Ok(account.coins)
        })?
    }

    /// Grants the daily bonus at most once per UTC calendar day.
    pub fn claim_daily_bonus(&self, user: UserId) -> Result<Bonus, StoreError> {
        self.claim_bonus_on(user, Utc::now().date_naive())
    }

    fn claim_bonus_on(&self, user: UserId, today: NaiveDate) -> Result<Bonus, StoreError> {
        self.store.update(user, |account, _| {
            if account.last_bonus == Some(today) {
                return Bonus::AlreadyClaimed;
            }
            account.last_bonus = Some(today);
            account.coins += DAILY_BONUS;
            Bonus::Granted {
                balance: account.coins,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemStore, STARTING_COINS};

    fn ledger() -> Ledger<MemStore> {
        Ledger::new(Arc::new(MemStore::default()))
    }

    #[test]
    fn new_users_start_with_the_default_balance() {
        assert_eq!(ledger().balance(1).unwrap(), STARTING_COINS);
    }

    #[test]
    fn adjust_applies_and_returns_the_new_balance() {
        let ledger = ledger();
        assert_eq!(ledger.adjust(1, -300).unwrap(), 700);
        assert_eq!(ledger.adjust(1, 50).unwrap(), 750);
        assert_eq!(ledger.balance(1).unwrap(), 750);
    }

    #[test]
    fn overdraft_is_rejected_without_a_state_change() {
        let ledger = ledger();
        match ledger.adjust(1, -(STARTING_COINS + 1)) {
            Err(CasinoError::InsufficientFunds) => {}
            other => panic!("expected InsufficientFunds, got {:?}", other.map(|_| ())),
        }
        assert_eq!(ledger.balance(1).unwrap(), STARTING_COINS);
    }

    #[test]
    fn bonus_is_granted_once_per_day() {
        let ledger = ledger();
        let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        assert_eq!(
            ledger.claim_bonus_on(7, day1).unwrap(),
            Bonus::Granted {
                balance: STARTING_COINS + DAILY_BONUS
            }
        );
        assert_eq!(ledger.claim_bonus_on(7, day1).unwrap(), Bonus::AlreadyClaimed);
        assert_eq!(ledger.balance(7).unwrap(), STARTING_COINS + DAILY_BONUS);

        assert_eq!(
            ledger.claim_bonus_on(7, day2).unwrap(),
            Bonus::Granted {
                balance: STARTING_COINS + 2 * DAILY_BONUS
            }
        );
    }
}
