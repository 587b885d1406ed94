pub mod blob_extractor;
pub mod color_quantizer;
pub mod error;
pub mod frame;
pub mod pixel;
pub mod region_summary;
pub mod target_locator;
pub mod utils;
