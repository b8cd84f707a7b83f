pub mod account;
pub mod gemini;
pub mod image;

pub use account::*;
pub use gemini::*;
pub use image::*;
