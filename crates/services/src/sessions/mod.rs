mod focus;
mod ticker;

pub use focus::FocusSession;
pub use ticker::{TickClock, TickPolicy};
