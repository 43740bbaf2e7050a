//! Minecraft launcher core: installs game versions and mod loaders, installs
//! Modrinth `.mrpack` modpacks and builds the command line to start the game.

pub mod core;

pub use crate::core::config::{default_minecraft_directory, LauncherConfig};
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::launch::{build_command, LaunchOptions};
pub use crate::core::logging::init_logging;
pub use crate::core::mrpack::{get_information, get_launch_version, install, InstallOptions};
pub use crate::core::progress::ProgressCallback;
