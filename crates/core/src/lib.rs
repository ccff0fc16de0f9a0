pub mod context;
pub mod fence;
pub mod frame;
pub mod platform;
pub mod upload;
