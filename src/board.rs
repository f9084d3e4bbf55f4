use itertools::Itertools;

use crate::mines::{MinesSession, BOARD_SIZE, TOTAL_CELLS};
use crate::storage::UserId;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CellState {
    Hidden,
    Opened,
    Mine,
}

/// Renderable snapshot of a board after a mutating operation. Mines are
/// shown only on a lost board; the cash-out affordance only while the
/// session is still active.
pub struct BoardView {
    pub owner: UserId,
    pub cells: [CellState; TOTAL_CELLS as usize],
    pub cashout_enabled: bool,
    pub message: String,
}

impl BoardView {
    fn cells_of(session: &MinesSession, show_mines: bool) -> [CellState; TOTAL_CELLS as usize] {
        let mut cells = [CellState::Hidden; TOTAL_CELLS as usize];
        for &c in &session.opened {
            cells[(c - 1) as usize] = CellState::Opened;
        }
        if show_mines {
            for &c in &session.mine_positions {
                cells[(c - 1) as usize] = CellState::Mine;
            }
        }
        cells
    }

    pub fn active(session: &MinesSession, message: String) -> Self {
        Self {
            owner: session.owner,
            cells: Self::cells_of(session, false),
            cashout_enabled: true,
            message,
        }
    }

    pub fn lost(session: &MinesSession, hit: u8) -> Self {
        let mines = session.mine_positions.iter().join(", ");
        Self {
            owner: session.owner,
            cells: Self::cells_of(session, true),
            cashout_enabled: false,
            message: format!(
                "💥 BOOM! Cell {} hid a mine.\nMines: {}\nThe bet is gone.",
                hit, mines
            ),
        }
    }

    // the mines stay hidden after a cash-out
    pub fn cashed_out(session: &MinesSession, payout: i64, balance: i64) -> Self {
        Self {
            owner: session.owner,
            cells: Self::cells_of(session, false),
            cashout_enabled: false,
            message: format!(
                "💸 You cashed out {} coins (bet {}).\n💰 Balance: {}",
                payout, session.bet, balance
            ),
        }
    }

    /// Callback payload for tapping `cell`, `"noop"` when the cell is
    /// inert (already open, revealed, or the board is finished).
    pub fn callback_data(&self, cell: u8) -> String {
        match self.cells[(cell - 1) as usize] {
            CellState::Hidden if self.cashout_enabled => {
                format!("mines:{}:{}", self.owner, cell)
            }
            _ => "noop".to_owned(),
        }
    }

    pub fn cashout_data(&self) -> Option<String> {
        if self.cashout_enabled {
            Some(format!("cashout:{}", self.owner))
        } else {
            None
        }
    }

    /// Text grid for the console front end.
    pub fn render(&self) -> String {
        (0..BOARD_SIZE)
            .map(|r| {
                (0..BOARD_SIZE)
                    .map(|c| {
                        let cell = (r * BOARD_SIZE + c) as u8 + 1;
                        match self.cells[(cell - 1) as usize] {
                            CellState::Hidden => format!("{:02}", cell),
                            CellState::Opened => "✅".to_owned(),
                            CellState::Mine => "💣".to_owned(),
                        }
                    })
                    .join(" ")
            })
            .join("\n")
    }
}
