mod change;
mod filter;
mod position;
mod user;
mod vessel;

pub use change::*;
pub use filter::*;
pub use position::*;
pub use user::*;
pub use vessel::*;
