//! sd-editor: The saw demo's editor
//!
//! Ties the parameter bus to the presentation surface:
//! - [`EditorSession`]: create / attach / tick / resize / destroy state machine
//! - [`ParamControls`]: slider, switch and radio widgets emitting edit gestures
//! - [`SawDemoView`]: the synth's editor layout
//! - [`PluginGui`]: the host-facing GUI calls

mod controls;
mod error;
mod gui;
mod platform;
mod session;
mod timer;
mod view;

pub use controls::*;
pub use error::*;
pub use gui::*;
pub use platform::*;
pub use session::*;
pub use timer::*;
pub use view::*;
