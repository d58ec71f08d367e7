pub mod arbiter;
mod clock;
mod config;
mod engine;
mod event_log;
mod game;
mod replay;
mod score;
mod types;
mod voice;

pub mod util;

pub use clock::*;
pub use config::*;
pub use engine::*;
pub use event_log::*;
pub use game::*;
pub use replay::*;
pub use score::*;
pub use types::*;
pub use voice::*;
pub use util::PseudoRandom;
