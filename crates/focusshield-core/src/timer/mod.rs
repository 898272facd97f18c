mod engine;
mod service;

pub use engine::{TimerEngine, TimerPhase};
pub use service::SessionTimer;
