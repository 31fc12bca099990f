pub mod classifier;
pub mod evaluator;
pub mod resolver;
pub mod window;

pub use resolver::{ResolvedStat, StatResolver};
pub use window::EvaluationWindow;
