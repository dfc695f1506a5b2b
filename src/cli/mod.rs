pub(crate) mod command;
pub(crate) mod config;

pub use self::command::{Args, Command, FakeArgs};
