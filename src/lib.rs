pub mod actuator;
pub mod board;
pub mod castling;
pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod game;
pub mod history;
pub mod inference;
pub mod r#move;
pub mod oracle;
pub mod piece;
pub mod planner;
pub mod sequencer;
pub mod sim;
pub mod square;
