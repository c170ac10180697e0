mod add;
mod catalog;
mod r#match;
pub mod server;

pub use add::*;
pub use catalog::*;
pub use r#match::*;
pub use server::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
