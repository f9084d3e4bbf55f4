use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use log::info;

use crate::board::BoardView;
use crate::error::{CasinoError, StoreError};
use crate::ledger::Ledger;
use crate::mines::{MinesSession, MAX_MINES, MIN_MINES, TOTAL_CELLS};
use crate::storage::{Store, UserId};

/// The Mines engine: session lifecycle plus the balance moves tied to
/// it. Every transition that touches both runs under the owner's lock
/// and inside a single store update, so a bet is never debited without
/// its session and a payout never lands without terminating it.
pub struct Casino<S> {
    store: Arc<S>,
    pub ledger: Ledger<S>,
    // one small entry per user ever seen; entries are never reaped
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl<S: Store> Casino<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            ledger: Ledger::new(store.clone()),
            store,
            locks: DashMap::new(),
        }
    }

    fn user_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        self.locks.entry(user).or_default().clone()
    }

    /// The user's active session, if any.
    pub fn active_session(&self, user: UserId) -> Result<Option<MinesSession>, StoreError> {
        self.store.update(user, |_, session| session.clone())
    }

    /// Debits the bet and deals a fresh board as one atomic unit.
    pub fn start(&self, user: UserId, bet: i64, mines: u8) -> Result<BoardView, CasinoError> {
        if bet <= 0 {
            return Err(CasinoError::InvalidInput("bet must be positive"));
        }
        if !(MIN_MINES..=MAX_MINES).contains(&mines) {
            return Err(CasinoError::InvalidInput("mines must be between 1 and 10"));
        }

        let lock = self.user_lock(user);
        let _guard = lock.lock().unwrap();

        let dealt = MinesSession::deal(user, bet, mines, &mut rand::thread_rng());
        self.store.update(user, |account, session| {
            if session.is_some() {
                return Err(CasinoError::SessionAlreadyActive);
            }
            if account.coins < bet {
                return Err(CasinoError::InsufficientFunds);
            }
            account.coins -= bet;
            *session = Some(dealt.clone());
            Ok(())
        })??;

        info!("user {} started mines: bet {} mines {}", user, bet, mines);
        Ok(BoardView::active(
            &dealt,
            format!(
                "💣 Mines started! Bet: {} | Mines: {}\nTap a cell to open it. Cash out any time to take the current payout.",
                bet, mines
            ),
        ))
    }

    /// Opens one cell on `owner`'s board. A mine ends the session and
    /// forfeits the already-debited bet; a safe cell reports the new
    /// multiplier and the payout a cash-out would bring right now.
    pub fn reveal(&self, actor: UserId, owner: UserId, cell: u8) -> Result<BoardView, CasinoError> {
        // ownership is checked before any session lookup, so a non-owner
        // learns nothing and changes nothing
        if actor != owner {
            return Err(CasinoError::NotSessionOwner);
        }
        if !(1..=TOTAL_CELLS).contains(&cell) {
            return Err(CasinoError::InvalidCell(cell));
        }

        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let view = self.store.update(owner, |_, session| {
            let current = session.as_ref().ok_or(CasinoError::NoActiveSession)?;
            if current.is_open(cell) {
                return Err(CasinoError::CellAlreadyOpen);
            }
            if current.is_mine(cell) {
                let ended = session.take().unwrap();
                info!("user {} hit a mine on cell {}", owner, cell);
                return Ok(BoardView::lost(&ended, cell));
            }
            let current = session.as_mut().unwrap();
            current.opened.push(cell);
            let message = match current.multiplier() {
                Some(m) => format!(
                    "✅ Cell {} is safe!\nSafe opens: {}\nMultiplier: x{:.2}\nCash out now for {} coins.",
                    cell,
                    current.opened.len(),
                    m,
                    current.payout()
                ),
                None => format!(
                    "✅ Cell {} is safe — every safe cell is open!\nCash out for {} coins.",
                    cell,
                    current.payout()
                ),
            };
            Ok(BoardView::active(current, message))
        })??;
        Ok(view)
    }

    /// Converts the opens so far into a credited payout and terminates
    /// the session, atomically.
    pub fn cash_out(&self, actor: UserId, owner: UserId) -> Result<BoardView, CasinoError> {
        if actor != owner {
            return Err(CasinoError::NotSessionOwner);
        }

        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let view = self.store.update(owner, |account, session| {
            let ended = session.take().ok_or(CasinoError::NoActiveSession)?;
            let payout = ended.payout();
            account.coins += payout;
            info!("user {} cashed out {} coins", owner, payout);
            Ok::<_, CasinoError>(BoardView::cashed_out(&ended, payout, account.coins))
        })??;
        Ok(view)
    }
}
