// PNG boundary for frames. Capture and display live outside the core; this is
// only what the demo runner and tests need to get frames on and off disk.

pub mod image_helper {
    use crate::core_modules::error::Result;
    use crate::core_modules::frame::{IndexedFrame, RgbFrame};
    use image::ImageEncoder;
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    pub fn load_rgb(path: &Path) -> Result<RgbFrame> {
        let image = image::open(path)?.to_rgb8();
        RgbFrame::from_rgb_image(&image)
    }

    pub fn save_rgb(path: &Path, frame: &RgbFrame) -> Result<()> {
        let output = BufWriter::new(File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);
        let image = frame.to_rgb_image();

        encoder.write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )?;

        Ok(())
    }

    /// Saves an indexed frame by mapping it through its palette first.
    pub fn save_indexed(path: &Path, frame: &IndexedFrame) -> Result<()> {
        save_rgb(path, &frame.to_rgb()?)
    }
}
