pub mod commands;
pub mod gateway;
pub mod rows;
pub mod settings;
pub mod tree;
pub mod watch;

#[cfg(test)]
pub(crate) mod testkit;

pub use commands::{CommandDispatcher, HostUi, InputRequest};
pub use gateway::{Gateway, GatewayEvent, RepoEntry, RepoId};
pub use rows::BranchRow;
pub use settings::Settings;
pub use tree::{TreeController, TreeEvent};
pub use watch::{RepoWatcherManager, WatchEvent};
