//! CLI command implementations.

mod config;
mod generate;
mod ingest;
mod list;
mod search;
pub mod serve;
mod validate;

pub use config::run_config;
pub use generate::run_generate;
pub use ingest::run_ingest;
pub use list::run_list;
pub use search::run_search;
pub use serve::run_serve;
pub use validate::run_validate;
