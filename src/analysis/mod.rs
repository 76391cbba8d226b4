//! Cross-node analysis: arbitrage potential and ranking.

pub mod potential;
pub mod rank;

pub use potential::{compute_potential, ArbitragePotential};
pub use rank::rank_by_oracle_profit;
