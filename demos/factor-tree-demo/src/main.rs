//! Ports the five-stock, three-day `ts_mean(@open, 5)` walkthrough from the
//! original factor-tree demo: build a tree, feed it a trading calendar tick
//! by tick, checkpoint midway through, and resume from the checkpoint in a
//! fresh process to show the resumed tree picks up exactly where the first
//! one left off.

use factor_tree::{InitArgs, Tensor, Tree};
use std::collections::HashMap;

const NSTOCK: usize = 5;
const BATCH_PER_DAY: usize = 4;

/// A synthetic, deterministic open-price panel so the demo needs no input
/// files: stock `i`'s price on the `tick`-th call is `100 + i + tick / 10`.
fn synthetic_open(tick: usize) -> Tensor {
    let values: Vec<f64> = (0..NSTOCK)
        .map(|i| 100.0 + i as f64 + tick as f64 / 10.0)
        .collect();
    Tensor::from_vec(values)
}

fn install_open(tree: &mut Tree, tick: usize) -> Vec<f64> {
    let mut fields = HashMap::new();
    fields.insert("open".to_string(), synthetic_open(tick));
    let out = tree.update(fields).expect("update should succeed");
    out.borrow().as_slice().to_vec()
}

fn main() {
    let init = InitArgs::with_batch_per_day(NSTOCK, BATCH_PER_DAY);
    let mut tree = Tree::new(init);
    tree.create_tree("ts_mean(@open, 5)").expect("expression should compile");

    let mut tick = 0usize;
    for day in 1..=2 {
        tree.on_day_begin().unwrap();
        for batch in 1..=BATCH_PER_DAY {
            tick += 1;
            let out = install_open(&mut tree, tick);
            println!("day {day} batch {batch}: ts_mean(open,5) = {out:?}");
        }
        tree.on_day_end().unwrap();
    }

    let checkpoint = tree.save_checkpoint().expect("checkpoint should serialize");
    println!("--- checkpoint taken after day 2, {} bytes ---", checkpoint.len());

    // Continue in the same process, as a baseline to compare against.
    tree.on_day_begin().unwrap();
    let mut continued = Vec::new();
    for batch in 1..=BATCH_PER_DAY {
        tick += 1;
        continued.push(install_open(&mut tree, tick));
    }
    tree.on_day_end().unwrap();

    // Rebuild a fresh tree from the same expression and resume from the
    // checkpoint instead of replaying day 1 and day 2.
    let mut resumed = Tree::new(init);
    resumed
        .create_tree("ts_mean(@open, 5)")
        .expect("expression should compile");
    resumed
        .load_checkpoint(&checkpoint)
        .expect("checkpoint should match the freshly compiled tree");

    resumed.on_day_begin().unwrap();
    let mut resumed_tick = tick - BATCH_PER_DAY;
    let mut from_checkpoint = Vec::new();
    for _ in 1..=BATCH_PER_DAY {
        resumed_tick += 1;
        from_checkpoint.push(install_open(&mut resumed, resumed_tick));
    }
    resumed.on_day_end().unwrap();

    println!("day 3 (continued in place):  {continued:?}");
    println!("day 3 (resumed from checkpoint): {from_checkpoint:?}");
    assert_eq!(continued, from_checkpoint, "resumed tree diverged from the original");
    println!("resumed tree matches the original exactly");
}
