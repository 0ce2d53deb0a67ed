//! Room sessions and the registry that owns them

pub mod controls;
pub mod registry;
pub mod room;

pub use controls::SessionControls;
pub use registry::{spawn_reaper, SessionRegistry};
pub use room::{RoomSession, SessionServices, SessionSettings, SessionState, SessionStatus};
