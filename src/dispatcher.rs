use crate::board::BoardView;
use crate::casino::Casino;
use crate::error::{CasinoError, StoreError};
use crate::games::{self, RouletteChoice};
use crate::ledger::{Bonus, DAILY_BONUS};
use crate::storage::{Store, UserId};

const HELP: &str = "🎰 Virtual Casino — commands:\n\n\
    /start - welcome and starting balance\n\
    /saldo - show your balance\n\
    /bonus - daily bonus (+500)\n\n\
    Games:\n\
    /blackjack <bet>\n\
    /roleta <red|black|green> <bet>\n\
    /crash <bet>\n\n\
    Mines (interactive 5x5):\n\
    /mines <bet> <mines>  - start a game (1 to 10 mines)\n\
    Tap cells to open them. Cash out to take the current payout.\n\n\
    All coins are fictitious.";

/// What goes back to the platform after handling one event: a text
/// reply, optionally with a board to (re)render.
pub struct Reply {
    pub text: String,
    pub board: Option<BoardView>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            board: None,
        }
    }

    fn board(view: BoardView) -> Self {
        Self {
            text: view.message.clone(),
            board: Some(view),
        }
    }
}

/// A tap event decoded from its callback payload. The formats are
/// `mines:<owner>:<pos>`, `cashout:<owner>` and `noop`; anything else
/// is treated as `noop` and acknowledged without effect.
#[derive(Debug, Eq, PartialEq)]
pub enum Tap {
    Reveal { owner: UserId, cell: u8 },
    CashOut { owner: UserId },
    Noop,
}

impl Tap {
    pub fn parse(data: &str) -> Self {
        let mut parts = data.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("mines"), Some(owner), Some(cell)) => {
                match (owner.parse(), cell.parse()) {
                    (Ok(owner), Ok(cell)) => Tap::Reveal { owner, cell },
                    _ => Tap::Noop,
                }
            }
            (Some("cashout"), Some(owner), None) => match owner.parse() {
                Ok(owner) => Tap::CashOut { owner },
                _ => Tap::Noop,
            },
            _ => Tap::Noop,
        }
    }
}

fn parse_bet(s: Option<&str>) -> Option<i64> {
    s?.parse().ok()
}

/// Turns a recoverable engine error into reply text; store failures
/// stay fatal and propagate to the caller.
fn report(result: Result<Reply, CasinoError>) -> Result<Reply, StoreError> {
    match result {
        Ok(reply) => Ok(reply),
        Err(CasinoError::Store(e)) => Err(e),
        Err(e) => Ok(Reply::text(format!("⛔ {}", e))),
    }
}

/// Routes one slash command for `user`. `None` means the text was not
/// a command at all.
pub fn handle_command<S: Store>(
    casino: &Casino<S>,
    user: UserId,
    text: &str,
) -> Result<Option<Reply>, StoreError> {
    let mut words = text.split_whitespace();
    let command = match words.next() {
        Some(w) if w.starts_with('/') => w,
        _ => return Ok(None),
    };

    let reply = match command {
        "/help" => Reply::text(HELP),
        "/start" => {
            let balance = casino.ledger.balance(user)?;
            Reply::text(format!(
                "👋 Welcome to the Virtual Casino!\nYou have {} coins. Use /help to see the commands.",
                balance
            ))
        }
        "/saldo" => Reply::text(format!("💰 Your balance: {} coins", casino.ledger.balance(user)?)),
        "/bonus" => match casino.ledger.claim_daily_bonus(user)? {
            Bonus::Granted { balance } => Reply::text(format!(
                "🎁 Daily bonus granted: +{} coins!\n💰 Balance: {}",
                DAILY_BONUS, balance
            )),
            Bonus::AlreadyClaimed => Reply::text("⛔ You already took today's bonus."),
        },
        "/blackjack" => match parse_bet(words.next()) {
            Some(bet) => report(games::blackjack(&casino.ledger, user, bet).map(|t| Reply::text(t)))?,
            None => Reply::text("Use: /blackjack <bet>"),
        },
        "/roleta" => {
            let choice = words.next().and_then(RouletteChoice::parse);
            match (choice, parse_bet(words.next())) {
                (Some(choice), Some(bet)) => {
                    report(games::roulette(&casino.ledger, user, choice, bet).map(|t| Reply::text(t)))?
                }
                _ => Reply::text("Use: /roleta <red|black|green> <bet>"),
            }
        }
        "/crash" => match parse_bet(words.next()) {
            Some(bet) => report(games::crash(&casino.ledger, user, bet).map(|t| Reply::text(t)))?,
            None => Reply::text("Use: /crash <bet>"),
        },
        "/mines" => {
            let bet = parse_bet(words.next());
            let count = words.next().and_then(|s| s.parse::<i64>().ok());
            match (bet, count) {
                (Some(bet), Some(count)) => {
                    // out-of-range counts funnel into the engine's own check
                    let count = if (0..=i64::from(u8::MAX)).contains(&count) {
                        count as u8
                    } else {
                        0
                    };
                    report(casino.start(user, bet, count).map(Reply::board))?
                }
                _ => Reply::text("Use: /mines <bet> <mines> (1 to 10 mines)"),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(reply))
}

/// Routes one tap from `actor`, who is not necessarily the board owner.
/// Inert and malformed payloads are acknowledged with no reply.
pub fn handle_tap<S: Store>(
    casino: &Casino<S>,
    actor: UserId,
    data: &str,
) -> Result<Option<Reply>, StoreError> {
    let reply = match Tap::parse(data) {
        Tap::Reveal { owner, cell } => report(casino.reveal(actor, owner, cell).map(Reply::board))?,
        Tap::CashOut { owner } => report(casino.cash_out(actor, owner).map(Reply::board))?,
        Tap::Noop => return Ok(None),
    };
    Ok(Some(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;
    use std::sync::Arc;

    fn casino() -> Casino<MemStore> {
        Casino::new(Arc::new(MemStore::default()))
    }

    #[test]
    fn tap_payloads_parse() {
        assert_eq!(Tap::parse("mines:42:7"), Tap::Reveal { owner: 42, cell: 7 });
        assert_eq!(Tap::parse("cashout:42"), Tap::CashOut { owner: 42 });
        assert_eq!(Tap::parse("noop"), Tap::Noop);
        assert_eq!(Tap::parse("mines:x:7"), Tap::Noop);
        assert_eq!(Tap::parse("cashout"), Tap::Noop);
        assert_eq!(Tap::parse(""), Tap::Noop);
    }

    #[test]
    fn non_commands_are_ignored() {
        let casino = casino();
        assert!(handle_command(&casino, 1, "hello there").unwrap().is_none());
        assert!(handle_command(&casino, 1, "/unknown").unwrap().is_none());
        assert!(handle_command(&casino, 1, "").unwrap().is_none());
    }

    #[test]
    fn balance_and_bonus_commands() {
        let casino = casino();
        let reply = handle_command(&casino, 1, "/saldo").unwrap().unwrap();
        assert!(reply.text.contains("1000"));

        let reply = handle_command(&casino, 1, "/bonus").unwrap().unwrap();
        assert!(reply.text.contains("+500"));
        let reply = handle_command(&casino, 1, "/bonus").unwrap().unwrap();
        assert!(reply.text.contains("already"));
    }

    #[test]
    fn bad_arguments_get_usage_text() {
        let casino = casino();
        for cmd in &["/blackjack", "/roleta red", "/crash x", "/mines 100"] {
            let reply = handle_command(&casino, 1, cmd).unwrap().unwrap();
            assert!(reply.text.starts_with("Use:"), "no usage for {}", cmd);
        }
    }

    #[test]
    fn mines_round_trip_through_taps() {
        let casino = casino();
        let reply = handle_command(&casino, 1, "/mines 100 3").unwrap().unwrap();
        let board = reply.board.expect("mines should reply with a board");
        assert!(board.cashout_enabled);

        // a stranger tapping the owner's board is denied
        let reply = handle_tap(&casino, 2, &board.callback_data(1)).unwrap().unwrap();
        assert!(reply.text.contains("not yours"));
        assert!(reply.board.is_none());

        // the owner cashes out through the rendered affordance
        let reply = handle_tap(&casino, 1, &board.cashout_data().unwrap())
            .unwrap()
            .unwrap();
        assert!(!reply.board.unwrap().cashout_enabled);

        // inert payloads are silently acknowledged
        assert!(handle_tap(&casino, 1, "noop").unwrap().is_none());
        assert!(handle_tap(&casino, 1, "garbage").unwrap().is_none());
    }

    #[test]
    fn invalid_mines_count_is_reported_inline() {
        let casino = casino();
        let reply = handle_command(&casino, 1, "/mines 100 11").unwrap().unwrap();
        assert!(reply.text.contains("between 1 and 10"));
    }
}
