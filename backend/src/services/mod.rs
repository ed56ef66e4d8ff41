pub mod classification;
pub mod image_resolver;
pub mod training;
