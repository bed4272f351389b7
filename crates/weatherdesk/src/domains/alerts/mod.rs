mod dispatch;
mod evaluator;

pub use dispatch::*;
pub use evaluator::*;
