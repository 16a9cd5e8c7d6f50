mod activity;
mod bot;
mod common;
mod memory;
mod social;

pub use activity::*;
pub use bot::*;
pub use common::*;
pub use memory::*;
pub use social::*;
