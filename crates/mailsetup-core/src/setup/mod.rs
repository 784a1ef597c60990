//! Account setup flow.
//!
//! A [`SetupSession`] carries the draft account through the setup or edit
//! screens. The host UI owns it and hands it to each step; the
//! [`ServerSettingsEditor`] validates a screen and starts the
//! [`SetupPipeline`](crate::pipeline::SetupPipeline).

mod bundle;
mod editor;
mod flow;
mod prompt;
mod session;

pub use bundle::BUNDLE_VERSION;
pub use editor::{BackAction, ServerSettingsEditor};
pub use flow::{CheckSettingsMode, FlowMode, SetupStep};
pub use prompt::{Prompt, PromptAction, PromptChoice};
pub use session::{AuthenticatorResponse, SetupSession, SetupSessionBuilder};
