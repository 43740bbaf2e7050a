// ─── Launcher Core ───
// Installs Minecraft versions, mod loaders and Modrinth modpacks, and builds
// the command line that starts them.
//
// Architecture:
//   core/
//     config/     — Runtime settings + remote endpoints
//     http/       — `HttpFetch` seam over reqwest
//     downloader/ — Bounded-concurrency downloads with SHA-1 validation
//     version/    — Mojang manifest + version JSON + OS rules
//     maven/      — Artifact coordinates
//     assets/     — Asset index + object downloads
//     loaders/    — Vanilla, Forge, Fabric, Quilt installers
//     mrpack/     — `.mrpack` reading, filtering, overrides, install
//     launch/     — Command line builder
//     auth/       — Offline profiles + Microsoft sign-in

pub mod assets;
pub mod auth;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod launch;
pub mod loaders;
pub mod logging;
pub mod maven;
pub mod mrpack;
pub mod paths;
pub mod progress;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;
