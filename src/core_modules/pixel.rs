// THEORY:
// The `pixel` module is the leaf of the segmentation core (the "pixel space").
// It holds the two value types every other component shares and the single
// metric they all compare with.
//
// Key principles:
// 1.  **Dumb data**: `RgbPixel` is three bytes and nothing more. An `IndexedPixel`
//     is a bare palette position; its meaning comes from the owning frame's palette.
// 2.  **One metric**: Every color comparison in the crate goes through
//     `distance`, the plain Euclidean distance in RGB space. It is not
//     perceptually uniform and is not meant to be.
// 3.  **Float means**: Clustering and averaging work on `MeanColor`, a
//     floating-point color, so running averages do not drift through repeated
//     truncation. It is rounded back to an `RgbPixel` only when a palette is
//     finalized.

pub mod pixel {
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type IndexedPixel = u8;
    pub type Distance = f64;

    /// Largest possible distance between two colors: `sqrt(3 * 255^2)`.
    pub const MAX_DISTANCE: Distance = 441.672_955_930_063_7;

    /// A single 8-bit-per-channel color.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RgbPixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
    }

    pub const BLACK: RgbPixel = RgbPixel::new(0, 0, 0);
    pub const WHITE: RgbPixel = RgbPixel::new(255, 255, 255);
    pub const RED: RgbPixel = RgbPixel::new(255, 0, 0);

    impl RgbPixel {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Euclidean distance to another color.
        pub fn distance(&self, other: &RgbPixel) -> Distance {
            MeanColor::from(*self).distance(other)
        }
    }

    impl From<image::Rgb<u8>> for RgbPixel {
        fn from(rgb: image::Rgb<u8>) -> Self {
            let [red, green, blue] = rgb.0;
            Self { red, green, blue }
        }
    }

    impl From<RgbPixel> for image::Rgb<u8> {
        fn from(pixel: RgbPixel) -> Self {
            image::Rgb([pixel.red, pixel.green, pixel.blue])
        }
    }

    /// A floating-point color used for running averages.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct MeanColor {
        pub red: f64,
        pub green: f64,
        pub blue: f64,
    }

    impl MeanColor {
        pub fn distance(&self, other: &RgbPixel) -> Distance {
            let dr = self.red - other.red as f64;
            let dg = self.green - other.green as f64;
            let db = self.blue - other.blue as f64;
            (dr * dr + dg * dg + db * db).sqrt()
        }

        /// Folds one more sample into a mean that already covers `count` samples:
        /// `mean' = (mean * count + sample) / (count + 1)`.
        pub fn absorb(&mut self, sample: &RgbPixel, count: u64) {
            let weight = count as f64;
            let divisor = weight + 1.0;
            self.red = (self.red * weight + sample.red as f64) / divisor;
            self.green = (self.green * weight + sample.green as f64) / divisor;
            self.blue = (self.blue * weight + sample.blue as f64) / divisor;
        }

        /// Rounds each channel to the nearest representable byte.
        pub fn to_pixel(&self) -> RgbPixel {
            let round = |c: f64| c.round().clamp(0.0, 255.0) as Channel;
            RgbPixel::new(round(self.red), round(self.green), round(self.blue))
        }
    }

    impl From<RgbPixel> for MeanColor {
        fn from(pixel: RgbPixel) -> Self {
            Self {
                red: pixel.red as f64,
                green: pixel.green as f64,
                blue: pixel.blue as f64,
            }
        }
    }

    /// Euclidean RGB distance between two colors.
    pub fn distance(a: &RgbPixel, b: &RgbPixel) -> Distance {
        a.distance(b)
    }
}
