pub mod credential;
pub mod logging;
