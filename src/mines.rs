use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::storage::UserId;

pub const BOARD_SIZE: usize = 5;
pub const TOTAL_CELLS: u8 = (BOARD_SIZE * BOARD_SIZE) as u8;
pub const MIN_MINES: u8 = 1;
pub const MAX_MINES: u8 = 10;

/// One in-progress Mines board. Cells are numbered 1..=25, row-major.
/// `mine_positions` is fixed at deal time and disjoint from `opened`;
/// hitting a mine ends the session instead of opening the cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinesSession {
    pub owner: UserId,
    pub bet: i64,
    pub mines: u8,
    pub mine_positions: BTreeSet<u8>,
    pub opened: Vec<u8>,
}

impl MinesSession {
    /// Deals a fresh board: `mines` cells drawn uniformly without
    /// replacement from the 25.
    pub fn deal(owner: UserId, bet: i64, mines: u8, rng: &mut impl Rng) -> Self {
        let mine_positions = rand::seq::index::sample(rng, TOTAL_CELLS as usize, mines as usize)
            .into_iter()
            .map(|i| i as u8 + 1)
            .collect();
        Self {
            owner,
            bet,
            mines,
            mine_positions,
            opened: Vec::new(),
        }
    }

    pub fn safe_total(&self) -> u8 {
        TOTAL_CELLS - self.mines
    }

    pub fn is_mine(&self, cell: u8) -> bool {
        self.mine_positions.contains(&cell)
    }

    pub fn is_open(&self, cell: u8) -> bool {
        self.opened.contains(&cell)
    }

    /// Payout multiplier after the opens so far, or `None` once every
    /// safe cell is open and the formula would diverge.
    pub fn multiplier(&self) -> Option<f64> {
        let safe = self.safe_total() as usize;
        // a hand-edited database can claim more opens than safe cells;
        // that degrades to the capped branch rather than underflowing
        match safe.checked_sub(self.opened.len()) {
            Some(left) if left > 0 => Some(safe as f64 / left as f64),
            _ => None,
        }
    }

    /// Coins paid if the owner cashed out right now. Fractions are never
    /// paid; a full clear pays a flat 2x instead of the divergent formula.
    pub fn payout(&self) -> i64 {
        match self.multiplier() {
            Some(m) => (self.bet as f64 * m).floor() as i64,
            None => self.bet * 2,
        }
    }
}
