//! Racing: evaluate candidates round by round, drop the losers early, refit
//! the winner.
//!
//! - `evaluator`: one candidate on one partition → `Trial`
//! - `controller`: the round loop and the elimination test
//! - `leaderboard`: ranking of the survivors
//! - `selector`: winner pick and the full-data refit
//! - `pool`: the worker pool a race runs on

pub mod controller;
pub mod evaluator;
pub mod leaderboard;
pub mod pool;
pub mod selector;

pub use controller::*;
pub use evaluator::*;
pub use leaderboard::*;
pub use pool::*;
pub use selector::*;
