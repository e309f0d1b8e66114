//! Information about an image that is not pixel data.
use std::borrow::Cow;
use std::fmt;

/// Dots per inch assumed when nothing else is known.
pub const DEFAULT_RESOLUTION: f64 = 96.0;

/// The name of a property, optionally within a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyTag {
    namespace: Option<Cow<'static, str>>,
    name: Cow<'static, str>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

/// A tagged value attached to an image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageProperty {
    pub tag: PropertyTag,
    pub value: PropertyValue,
}

/// Metadata of a whole image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageMetadata {
    horizontal_resolution: f64,
    vertical_resolution: f64,
    /// Hundredths of a second between frames.
    pub frame_delay: u32,
    /// How often an animation repeats, `0` meaning indefinitely.
    pub repeat_count: u16,
    /// Output quality for lossy encoders.
    pub quality: u8,
    properties: Vec<ImageProperty>,
}

/// Metadata of a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    /// Hundredths of a second to wait after this frame.
    pub frame_delay: u32,
}

impl PropertyTag {
    pub const USER_COMMENT: Self = PropertyTag::well_known("User Comment");
    pub const DESCRIPTION: Self = PropertyTag::well_known("Image Description");
    pub const SOFTWARE: Self = PropertyTag::well_known("Software");
    pub const COPYRIGHT: Self = PropertyTag::well_known("Copyright");
    /// The EXIF orientation, an [`PropertyValue::Integer`] from 1 to 8.
    pub const ORIENTATION: Self = PropertyTag::well_known("Orientation");

    const fn well_known(name: &'static str) -> Self {
        PropertyTag {
            namespace: None,
            name: Cow::Borrowed(name),
        }
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        PropertyTag {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(
        namespace: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        PropertyTag {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl ImageMetadata {
    pub fn new() -> Self {
        ImageMetadata {
            horizontal_resolution: DEFAULT_RESOLUTION,
            vertical_resolution: DEFAULT_RESOLUTION,
            frame_delay: 0,
            repeat_count: 0,
            quality: 0,
            properties: Vec::new(),
        }
    }

    /// Dots per inch in x direction.
    pub fn horizontal_resolution(&self) -> f64 {
        self.horizontal_resolution
    }

    /// Dots per inch in y direction.
    pub fn vertical_resolution(&self) -> f64 {
        self.vertical_resolution
    }

    /// Set the resolution in x direction. Values that are not positive reset it to the default.
    pub fn set_horizontal_resolution(&mut self, dpi: f64) {
        self.horizontal_resolution = positive_or_default(dpi);
    }

    /// Set the resolution in y direction. Values that are not positive reset it to the default.
    pub fn set_vertical_resolution(&mut self, dpi: f64) {
        self.vertical_resolution = positive_or_default(dpi);
    }

    /// Set a property, replacing every earlier property with the same tag.
    pub fn set_property(&mut self, tag: PropertyTag, value: PropertyValue) {
        self.properties.retain(|property| property.tag != tag);
        self.properties.push(ImageProperty { tag, value });
    }

    pub fn property(&self, tag: &PropertyTag) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .rev()
            .find(|property| property.tag == *tag)
            .map(|property| &property.value)
    }

    pub fn remove_property(&mut self, tag: &PropertyTag) -> Option<PropertyValue> {
        let index = self.properties.iter().position(|property| property.tag == *tag)?;
        Some(self.properties.remove(index).value)
    }

    /// All properties in the order they were set.
    pub fn properties(&self) -> &[ImageProperty] {
        &self.properties
    }
}

fn positive_or_default(dpi: f64) -> f64 {
    if dpi > 0.0 {
        dpi
    } else {
        DEFAULT_RESOLUTION
    }
}

impl Default for ImageMetadata {
    fn default() -> Self {
        ImageMetadata::new()
    }
}

impl fmt::Display for PropertyTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}:{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}
