pub mod echo;
pub mod echo_length;

pub use echo::{EchoParams, EchoTool};
pub use echo_length::EchoLengthTool;
