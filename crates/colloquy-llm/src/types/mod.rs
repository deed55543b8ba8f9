pub mod role;
pub mod turn;

pub use role::Role;
pub use turn::{Turn, WireMessage};
