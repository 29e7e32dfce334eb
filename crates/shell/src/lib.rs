//! Shell composition: mounts session-dependent fragments, navigates the
//! route table, and validates the forms that drive the session store.

pub mod composition;
pub mod config;
pub mod forms;
pub mod router;
pub mod surface;

pub use composition::{MountState, ShellController};
pub use config::{load_settings, Settings};
pub use forms::{FormError, LoginForm, UpdateNameForm};
pub use router::{NavigationError, Navigator};
pub use surface::{ConsoleSurface, RecordingSurface, RenderSurface};
