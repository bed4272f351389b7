mod domains;
mod history;
mod provider;
mod session;
mod utils;

pub use domains::*;
pub use history::*;
pub use provider::*;
pub use session::*;
pub use utils::*;
