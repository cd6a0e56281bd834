pub mod args;
pub mod op;
pub mod ops;
pub mod strategy;

pub use ops::{Download, Init, Upload, Version};
