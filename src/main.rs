use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rookarm::actuator::Actuator;
use rookarm::board::Board;
use rookarm::clock::SystemClock;
use rookarm::config::Config;
use rookarm::detector::{ChangeDetector, ManualDetector, ProcessDetector};
use rookarm::error::{OracleError, Severity, TurnError};
use rookarm::game::Game;
use rookarm::oracle::UciEngine;
use rookarm::piece::Color;
use rookarm::planner::plan;
use rookarm::r#move::Move;
use rookarm::sequencer::Sequencer;
use rookarm::sim::SimulatedGantry;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, author, about)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Plays a game against the engine
    Play {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Engine strength, 0..=20. Asked for if missing
        #[arg(short, long)]
        skill: Option<u8>,
        #[arg(long, value_enum)]
        robot_color: Option<Color>,
    },
    /// Prints what the gantry does to play a move
    Plan {
        /// Piece placement, as the first field of a FEN string
        placement: String,
        /// Move in long algebraic notation, e.g. e2e4
        mv: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("rookarm v{}, by {}", env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_AUTHORS"));

    match Cli::parse().command {
        Cmd::Play {
            config,
            skill,
            robot_color,
        } => play(config, skill, robot_color),
        Cmd::Plan { placement, mv } => show_plan(&placement, &mv),
    }
}

fn show_plan(placement: &str, mv: &str) -> anyhow::Result<()> {
    let board = Board::from_placement(placement);
    let mv = Move::parse(mv).with_context(|| format!("`{}` is not a move", mv))?;
    println!("{}\n", board);
    println!("{}: {}", mv, board.flags(&mv));
    for (i, action) in plan(&board, &mv)?.iter().enumerate() {
        println!("{}. {}", i + 1, action);
    }
    Ok(())
}

/// Reads a line, `None` once the operator pressed Ctrl-C or Ctrl-D
fn prompt(editor: &mut Editor<()>, text: &str) -> anyhow::Result<Option<String>> {
    match editor.readline(text) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e).context("reading the console"),
    }
}

fn play(config_path: Option<PathBuf>, skill: Option<u8>, robot_color: Option<Color>) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    let mut editor = Editor::<()>::new();

    config.oracle.skill_level = match skill {
        Some(skill) => skill,
        None => loop {
            match prompt(&mut editor, "Skill level [0..20]? ")? {
                Some(line) => match line.parse::<u8>() {
                    Ok(skill) if skill <= 20 => break skill,
                    _ => println!("Type a number from 0 to 20"),
                },
                None => return Ok(()),
            }
        },
    };
    if let Some(color) = robot_color {
        config.game.robot_color = color;
    }
    config.validate().context("invalid settings")?;

    let mut sequencer =
        Sequencer::new(SimulatedGantry::new(), SystemClock, config.gantry.clone()).context("invalid gantry settings")?;
    let volts = sequencer
        .check_supply(config.safety.min_supply_volts)
        .context("checking the motor supply")?;
    info!("supply at {:.2}V", volts);
    sequencer.initialize().context("initializing the gantry")?;

    let engine = UciEngine::spawn(&config.oracle).context("starting the engine")?;

    let mut process;
    let mut manual;
    let detector: &mut dyn ChangeDetector = match ProcessDetector::new(&config.detector) {
        Some(d) => {
            process = d;
            &mut process
        }
        None => {
            let mut entry = Editor::<()>::new();
            manual = ManualDetector::new(move || {
                entry
                    .readline("Changed squares: ")
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
            });
            &mut manual
        }
    };

    let mut game = Game::new(sequencer, engine, detector, &config);
    game.new_game()?;
    let result = run(&mut game, &mut editor);

    if let Err(e) = game.sequencer_mut().actuator_mut().reset_all() {
        warn!("could not release the motors: {}", e);
    }
    result
}

fn run<D: ChangeDetector>(
    game: &mut Game<SimulatedGantry, SystemClock, UciEngine, D>,
    editor: &mut Editor<()>,
) -> anyhow::Result<()> {
    loop {
        if game.is_robot_turn() {
            match game.robot_turn() {
                Ok(turn) => {
                    println!("< {}", turn.reply.best_move);
                    println!("{}", game.board());
                }
                Err(TurnError::Oracle(OracleError::NoMove)) => {
                    println!("Game over");
                    return Ok(());
                }
                Err(e) if e.severity() == Severity::Critical => {
                    error!("{}", e);
                    if let TurnError::Diverged { source, .. } = &e {
                        if !source.recovered() {
                            error!("the gantry could not find its way home, move it onto its home square by hand");
                        }
                    }
                    bail!("the board has to be set up again by hand: {}", e);
                }
                Err(e) => {
                    warn!("{}", e);
                    if prompt(editor, "Press enter to try again ")?.is_none() {
                        return Ok(());
                    }
                }
            }
            continue;
        }

        if prompt(editor, "Play a move and press enter ")?.is_none() {
            return Ok(());
        }
        let guess = game.detect_human_move();
        let question = match &guess {
            Ok(mv) => format!("Did you play {}? [enter, or type your move] ", mv),
            Err(e) => {
                warn!("{}", e);
                String::from("Type the move you played: ")
            }
        };
        let answer = match prompt(editor, &question)? {
            Some(answer) => answer,
            None => return Ok(()),
        };
        let mv = match (answer.is_empty(), guess) {
            (true, Ok(mv)) => mv,
            _ => match Move::parse(&answer) {
                Some(mv) => mv,
                None => {
                    println!("`{}` is not a move", answer);
                    continue;
                }
            },
        };
        match game.human_move(mv) {
            Ok(_) => println!("> {}", mv),
            Err(e) => warn!("{}", e),
        }
    }
}
