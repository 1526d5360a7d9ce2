mod document;
mod error;
mod events;
mod executable;
mod formatter;
mod ignore_file;
mod releases;
mod styluax;
#[cfg(test)]
mod testutils;

pub mod config;
pub mod event_consumers;

pub use document::*;
pub use error::{Result, StyluaxError};
pub use events::*;
pub use executable::*;
pub use formatter::*;
pub use ignore_file::*;
pub use releases::*;
pub use styluax::*;
