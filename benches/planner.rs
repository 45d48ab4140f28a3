use criterion::{criterion_group, criterion_main, Criterion};
use rookarm::board::Board;
use rookarm::clock::Clock;
use rookarm::config::GantryConfig;
use rookarm::planner::plan;
use rookarm::r#move::Move;
use rookarm::sequencer::Sequencer;
use rookarm::sim::SimulatedGantry;
use std::time::Duration;

// Middlegame positions with pieces in the way of most sliding moves
const POSITIONS: [(&str, &str); 3] = [
    ("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R", "e1g1"),
    ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R", "e2a6"),
    ("r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1", "c4f7"),
];

struct NoWait;

impl Clock for NoWait {
    fn sleep(&mut self, _: Duration) {}
}

fn planner_bench(c: &mut Criterion) {
    let positions: Vec<(Board, Move)> = POSITIONS
        .iter()
        .map(|(placement, mv)| (Board::from_placement(placement), Move::parse(mv).unwrap()))
        .collect();

    c.bench_function("needs_lift", |b| {
        b.iter(|| positions.iter().filter(|(board, mv)| board.needs_lift(mv)).count())
    });
    c.bench_function("plan", |b| {
        b.iter(|| {
            positions
                .iter()
                .map(|(board, mv)| plan(board, mv).unwrap().len())
                .sum::<usize>()
        })
    });

    let actions: Vec<_> = positions
        .iter()
        .flat_map(|(board, mv)| plan(board, mv).unwrap())
        .collect();
    let mut sequencer = Sequencer::new(SimulatedGantry::new(), NoWait, GantryConfig::default()).unwrap();
    sequencer.initialize().unwrap();
    c.bench_function("execute", |b| {
        b.iter(|| {
            sequencer.actuator_mut().clear_calls();
            sequencer.execute(&actions).unwrap()
        })
    });
}

criterion_group!(benches, planner_bench);
criterion_main!(benches);
