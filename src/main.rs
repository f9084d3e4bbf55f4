use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;

use log::error;

use crate::board::BoardView;
use crate::casino::Casino;
use crate::dispatcher::{handle_command, handle_tap, Reply};
use crate::error::StoreError;
use crate::mines::TOTAL_CELLS;
use crate::storage::{JsonStore, UserId};

mod board;
mod casino;
mod dispatcher;
mod error;
mod games;
mod ledger;
mod mines;
mod storage;

/// Console stand-in for the messaging platform: one line per event,
/// `open`/`cashout` replayed through the same tap payloads the board
/// buttons would carry.
struct Console {
    casino: Casino<JsonStore>,
    boards: HashMap<UserId, BoardView>,
    user: UserId,
}

impl Console {
    fn show(&mut self, reply: Option<Reply>) {
        if let Some(reply) = reply {
            println!("{}", reply.text);
            if let Some(board) = reply.board {
                println!("{}", board.render());
                if board.cashout_enabled {
                    println!("(open <n> to reveal a cell, cashout to take the payout)");
                }
                self.boards.insert(self.user, board);
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> Result<(), StoreError> {
        let mut words = line.split_whitespace();
        match words.next() {
            None => {}
            Some("user") => match words.next().and_then(|s| s.parse().ok()) {
                Some(id) => {
                    self.user = id;
                    println!("Now playing as user {}.", id);
                }
                None => println!("Use: user <id>"),
            },
            Some("open") => match words.next().and_then(|s| s.parse::<u8>().ok()) {
                Some(cell) if (1..=TOTAL_CELLS).contains(&cell) => {
                    // replay the payload the rendered button carries; a board
                    // restored from disk falls back to the direct form
                    let data = match self.boards.get(&self.user) {
                        Some(board) => board.callback_data(cell),
                        None => format!("mines:{}:{}", self.user, cell),
                    };
                    let reply = handle_tap(&self.casino, self.user, &data)?;
                    self.show(reply);
                }
                _ => println!("Use: open <1-25>"),
            },
            Some("board") => match self.casino.active_session(self.user)? {
                Some(session) => {
                    let view = BoardView::active(
                        &session,
                        format!(
                            "💣 Mines in progress: bet {} | mines {}",
                            session.bet, session.mines
                        ),
                    );
                    self.show(Some(Reply {
                        text: view.message.clone(),
                        board: Some(view),
                    }));
                }
                None => println!("No game in progress."),
            },
            Some("cashout") => {
                let data = match self.boards.get(&self.user).and_then(BoardView::cashout_data) {
                    Some(data) => data,
                    None => format!("cashout:{}", self.user),
                };
                let reply = handle_tap(&self.casino, self.user, &data)?;
                self.show(reply);
            }
            Some(word) if word.starts_with('/') => {
                match handle_command(&self.casino, self.user, line)? {
                    Some(reply) => self.show(Some(reply)),
                    None => println!("Unknown command; /help lists the commands."),
                }
            }
            Some(_) => println!("Unknown input; /help lists the commands."),
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();

    let path = env::var("CASINO_DB").unwrap_or_else(|_| "casino_db.json".to_owned());
    let store = match JsonStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("cannot open database {}: {}", path, e);
            process::exit(1);
        }
    };

    let mut console = Console {
        casino: Casino::new(store),
        boards: HashMap::new(),
        user: 1,
    };

    println!("🎰 Virtual Casino console. /help for commands, `user <id>` to switch player.");
    let stdin = io::stdin();
    loop {
        print!("user {}> ", console.user);
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if let Err(e) = console.handle_line(line.trim()) {
            // persistence failure is fatal: carrying on would leave the
            // player acting against an unsynced balance
            error!("database write failed: {}", e);
            process::exit(1);
        }
    }
}
