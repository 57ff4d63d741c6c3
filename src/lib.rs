//! Stackscope core library: stack-sample recording, log parsing, and
//! per-goroutine timeline reconstruction.

mod cmd;
mod config;
mod duration;
mod error;
mod export;
mod recorder;
mod render;
mod simplify;
mod stackdump;
mod stacklog;
mod timeline;

pub use cmd::*;
pub use config::*;
pub use duration::*;
pub use error::*;
pub use export::*;
pub use recorder::*;
pub use render::*;
pub use simplify::*;
pub use stackdump::*;
pub use stacklog::*;
pub use timeline::*;
