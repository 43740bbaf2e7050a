pub mod context;
pub mod fabric;
pub mod forge;
pub mod installer;
mod profile;
pub mod quilt;
pub mod vanilla;

pub use context::InstallContext;
pub use fabric::FabricInstaller;
pub use forge::{forge_installer_url, list_forge_versions, ForgeInstaller};
pub use installer::{DependencyInstaller, GameInstaller, LoaderKind};
pub use profile::LoaderVersion;
pub use quilt::QuiltInstaller;
pub use vanilla::VanillaInstaller;
