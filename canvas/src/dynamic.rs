//! Images whose pixel format is chosen at runtime.
//!
//! [`DynamicImage`] is a closed enum over the concrete formats. Processors are generic over the
//! pixel type, a processor usable with every format is an [`AnyPixelProcessor`] and can be
//! applied without knowing the variant.
use core::fmt;

use pixelflow_texel::{Alpha8, Bgr24, Bgr565, Bgra32, Pixel, Rgb24, Rgba32, Rgba64, RgbaVector};

use crate::error::ProcessingError;
use crate::geometry::{Rectangle, Size};
use crate::image::Image;
use crate::metadata::ImageMetadata;
use crate::processing::ImageProcessor;

macro_rules! pixel_formats {
    ($($(#[$attr:meta])* $name:ident),* $(,)?) => {
        /// The pixel formats of a [`DynamicImage`].
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum PixelFormat {
            $($(#[$attr])* $name,)*
        }

        /// An image in one of the supported pixel formats.
        #[derive(Clone, Debug)]
        pub enum DynamicImage {
            $($(#[$attr])* $name(Image<$name>),)*
        }

        /// A processor that can be applied to images of every supported format.
        pub trait AnyPixelProcessor: $(ImageProcessor<$name> +)* {}

        impl<T> AnyPixelProcessor for T where T: $(ImageProcessor<$name> +)* ?Sized {}

        impl PixelFormat {
            /// All formats, in declaration order.
            pub const ALL: &'static [PixelFormat] = &[$(PixelFormat::$name,)*];

            pub fn bytes_per_pixel(self) -> usize {
                match self {
                    $(PixelFormat::$name => core::mem::size_of::<$name>(),)*
                }
            }

            /// Whether the format stores color channels.
            pub fn has_color(self) -> bool {
                match self {
                    $(PixelFormat::$name => <$name as Pixel>::HAS_COLOR,)*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(PixelFormat::$name => stringify!($name),)*
                }
            }
        }

        impl DynamicImage {
            /// A transparent black image of the requested format.
            pub fn new(format: PixelFormat, width: usize, height: usize) -> Self {
                match format {
                    $(PixelFormat::$name => DynamicImage::$name(Image::new(width, height)),)*
                }
            }

            pub fn format(&self) -> PixelFormat {
                match self {
                    $(DynamicImage::$name(_) => PixelFormat::$name,)*
                }
            }

            pub fn size(&self) -> Size {
                match self {
                    $(DynamicImage::$name(image) => image.size(),)*
                }
            }

            pub fn frame_count(&self) -> usize {
                match self {
                    $(DynamicImage::$name(image) => image.frame_count(),)*
                }
            }

            pub fn metadata(&self) -> &ImageMetadata {
                match self {
                    $(DynamicImage::$name(image) => image.metadata(),)*
                }
            }

            pub fn metadata_mut(&mut self) -> &mut ImageMetadata {
                match self {
                    $(DynamicImage::$name(image) => image.metadata_mut(),)*
                }
            }

            /// Apply a processor to the whole image.
            pub fn apply(&mut self, processor: &(impl AnyPixelProcessor + ?Sized)) -> Result<(), ProcessingError> {
                let rect = Rectangle::from_size(self.size());
                self.apply_to(processor, rect)
            }

            /// Apply a processor to a rectangle of the image.
            pub fn apply_to(
                &mut self,
                processor: &(impl AnyPixelProcessor + ?Sized),
                rect: Rectangle,
            ) -> Result<(), ProcessingError> {
                match self {
                    $(DynamicImage::$name(image) => image.apply_to(processor, rect),)*
                }
            }

            /// Convert all frames into the pixel type `P`.
            pub fn to_image<P: Pixel>(&self) -> Image<P> {
                match self {
                    $(DynamicImage::$name(image) => image.convert(),)*
                }
            }

            /// Convert into another runtime format.
            pub fn convert(&self, format: PixelFormat) -> DynamicImage {
                match format {
                    $(PixelFormat::$name => DynamicImage::$name(self.to_image()),)*
                }
            }
        }

        $(
            impl From<Image<$name>> for DynamicImage {
                fn from(image: Image<$name>) -> Self {
                    DynamicImage::$name(image)
                }
            }
        )*
    };
}

pixel_formats! {
    /// 8-bit red, green, blue, alpha.
    Rgba32,
    Bgra32,
    Rgb24,
    Bgr24,
    /// 8-bit alpha without color.
    Alpha8,
    /// 16-bit red, green, blue, alpha.
    Rgba64,
    Bgr565,
    /// 32-bit float red, green, blue, alpha.
    RgbaVector,
}

impl DynamicImage {
    pub fn width(&self) -> usize {
        self.size().width
    }

    pub fn height(&self) -> usize {
        self.size().height
    }

    /// Convert to 8-bit RGBA, for example to hand the pixels to an encoder.
    pub fn to_rgba32(&self) -> Image<Rgba32> {
        self.to_image()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{FlipMode, Invert, Polaroid, RotateFlip, RotateMode};

    #[test]
    fn formats_describe_themselves() {
        assert_eq!(PixelFormat::ALL.len(), 8);
        assert_eq!(PixelFormat::Rgba32.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Bgr565.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::RgbaVector.bytes_per_pixel(), 16);
        assert!(!PixelFormat::Alpha8.has_color());
        assert_eq!(PixelFormat::Rgb24.to_string(), "Rgb24");
    }

    #[test]
    fn processors_apply_to_every_format() {
        for &format in PixelFormat::ALL {
            let mut image = DynamicImage::new(format, 3, 2);
            assert_eq!(image.format(), format);
            image.apply(&Invert).unwrap();
            image.apply(&Polaroid::default()).unwrap();
            assert_eq!(image.size(), Size::new(3, 2));
            image.apply(&RotateFlip::new(RotateMode::Rotate270, FlipMode::Horizontal)).unwrap();
            assert_eq!(image.size(), Size::new(2, 3));
        }
    }

    #[test]
    fn conversion_keeps_content() {
        let mut image: Image<Rgba32> = Image::new(2, 1);
        image.root_mut()[(0, 0)] = Rgba32::new(10, 20, 30, 255);

        let dynamic = DynamicImage::from(image).convert(PixelFormat::Bgra32);
        assert_eq!(dynamic.format(), PixelFormat::Bgra32);
        assert_eq!(dynamic.to_rgba32().root()[(0, 0)], Rgba32::new(10, 20, 30, 255));
    }
}
