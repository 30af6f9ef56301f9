pub mod command;

pub use command::ExternalCommand;
