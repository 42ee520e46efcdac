pub mod clean;
pub mod list;
pub mod list_configs;
pub mod publish;
pub mod update;
