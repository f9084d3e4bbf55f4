use rand::Rng;

use crate::error::CasinoError;
use crate::ledger::Ledger;
use crate::storage::{Store, UserId};

/// The single-draw games from the original bot: no session, one random
/// draw, one atomic balance move. The draw happens first and the
/// wager check plus the resulting delta are applied in one step.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RouletteChoice {
    Red,
    Black,
    Green,
}

impl RouletteChoice {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "red" => Some(Self::Red),
            "black" => Some(Self::Black),
            "green" => Some(Self::Green),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Black => "black",
            Self::Green => "green",
        }
    }
}

fn wager<S: Store>(
    ledger: &Ledger<S>,
    user: UserId,
    bet: i64,
    delta: i64,
) -> Result<i64, CasinoError> {
    if bet <= 0 {
        return Err(CasinoError::InvalidInput("bet must be positive"));
    }
    // one atomic step: reject the wager unless the full bet is covered,
    // then apply the outcome
    ledger.with_account(user, move |coins| {
        if *coins < bet {
            return Err(CasinoError::InsufficientFunds);
        }
        *coins += delta;
        Ok(*coins)
    })?
}

fn blackjack_outcome(player: u32, dealer: u32, bet: i64) -> (i64, String) {
    if player > 21 {
        (-bet, format!("❌ You busted and lost {} coins.", bet))
    } else if dealer > 21 || player > dealer {
        (bet, format!("🏆 You won {} coins!", bet))
    } else if dealer > player {
        (-bet, format!("❌ You lost {} coins.", bet))
    } else {
        (0, "🤝 Push — nothing happens.".to_owned())
    }
}

pub fn blackjack<S: Store>(ledger: &Ledger<S>, user: UserId, bet: i64) -> Result<String, CasinoError> {
    let mut rng = rand::thread_rng();
    let player = rng.gen_range(15..=22);
    let dealer = rng.gen_range(15..=22);
    let (delta, verdict) = blackjack_outcome(player, dealer, bet);
    let balance = wager(ledger, user, bet, delta)?;
    Ok(format!(
        "🃏 Blackjack\nYou: {}\nDealer: {}\n\n{}\n💰 Balance: {}",
        player, dealer, verdict, balance
    ))
}

fn roulette_colour(num: u32) -> RouletteChoice {
    if num == 0 {
        RouletteChoice::Green
    } else if num % 2 == 1 {
        RouletteChoice::Red
    } else {
        RouletteChoice::Black
    }
}

fn roulette_outcome(num: u32, choice: RouletteChoice, bet: i64) -> (i64, String) {
    let colour = roulette_colour(num);
    if choice == colour {
        // the original credits the win without deducting the stake
        let gain = bet * if colour == RouletteChoice::Green { 14 } else { 2 };
        (gain, format!("🏆 You called it! Won {} coins.", gain))
    } else {
        (-bet, format!("❌ You missed and lost {} coins.", bet))
    }
}

pub fn roulette<S: Store>(
    ledger: &Ledger<S>,
    user: UserId,
    choice: RouletteChoice,
    bet: i64,
) -> Result<String, CasinoError> {
    let num = rand::thread_rng().gen_range(0..=36);
    let (delta, verdict) = roulette_outcome(num, choice, bet);
    let balance = wager(ledger, user, bet, delta)?;
    Ok(format!(
        "🎡 Roulette\nDrawn: {} ({})\n\n{}\n💰 Balance: {}",
        num,
        roulette_colour(num).name(),
        verdict,
        balance
    ))
}

fn crash_payout(bet: i64, mult: f64) -> i64 {
    (bet as f64 * mult).floor() as i64
}

pub fn crash<S: Store>(ledger: &Ledger<S>, user: UserId, bet: i64) -> Result<String, CasinoError> {
    let mult = (rand::thread_rng().gen_range(1.10_f64..=10.0) * 100.0).round() / 100.0;
    let payout = crash_payout(bet, mult);
    let balance = wager(ledger, user, bet, payout - bet)?;
    Ok(format!(
        "🚀 Crash\nMultiplier: x{}\nYou won {} coins!\n💰 Balance: {}",
        mult, payout, balance
    ))
}
