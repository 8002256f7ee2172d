pub mod audit;
pub mod config;
pub mod deploy;
pub mod github;
pub mod pipeline;
pub mod process;
pub mod terminal;
pub mod watch;
