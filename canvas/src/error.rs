use core::fmt;

use pixelflow_texel::{BufferError, PixelBuffer};
use thiserror::Error;

use crate::geometry::{Rectangle, Size};

/// The failure a processor stage reports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The stages of one processor application, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    BeforeImageApply,
    BeforeApply,
    OnApply,
    AfterApply,
    AfterImageApply,
}

/// A processor failed while being applied to an image.
///
/// Carries the processor's name, the stage and rectangle it was applied with and, for the
/// per-frame stages, the index of the frame where `0` is the root frame. The original failure is
/// always available as the [`source`].
///
/// [`source`]: std::error::Error::source
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProcessingError {
    processor: String,
    stage: Stage,
    rect: Rectangle,
    frame: Option<usize>,
    message: String,
    #[source]
    cause: BoxError,
}

/// A frame could not be added to, or taken from, an image.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("a frame of {found} does not match the image size {expected}")]
    FrameSize { expected: Size, found: Size },
    #[error("frame index {index} is out of range for {count} frames")]
    FrameIndex { index: usize, count: usize },
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// A replacement pixel buffer did not have the dimensions of the frame.
///
/// The frame is left untouched. The rejected buffer can be retrieved with `into_buffer`.
pub struct SwapError<P> {
    buffer: PixelBuffer<P>,
    expected: Size,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::BeforeImageApply => "before_image_apply",
            Stage::BeforeApply => "before_apply",
            Stage::OnApply => "on_apply",
            Stage::AfterApply => "after_apply",
            Stage::AfterImageApply => "after_image_apply",
        }
    }
}

impl ProcessingError {
    /// Wrap the failure of a stage.
    ///
    /// With `diagnostics` the cause is rendered into the message as well and logged.
    pub fn new(
        processor: impl Into<String>,
        stage: Stage,
        rect: Rectangle,
        frame: Option<usize>,
        cause: BoxError,
        diagnostics: bool,
    ) -> Self {
        let processor = processor.into();
        let mut message = format!("processor `{}` failed in {} for {}", processor, stage, rect);
        if let Some(frame) = frame {
            message = format!("{} on frame {}", message, frame);
        }

        if diagnostics {
            message = format!("{}: {}", message, cause);
            log::error!("{}", message);
        }

        ProcessingError {
            processor,
            stage,
            rect,
            frame,
            message,
            cause,
        }
    }

    pub fn processor(&self) -> &str {
        &self.processor
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn rect(&self) -> Rectangle {
        self.rect
    }

    /// The frame the stage ran on. `None` for the whole-image stages.
    pub fn frame(&self) -> Option<usize> {
        self.frame
    }

    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.cause
    }

    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

impl<P> SwapError<P> {
    pub(crate) fn new(buffer: PixelBuffer<P>, expected: Size) -> Self {
        SwapError { buffer, expected }
    }

    /// The dimensions the frame requires.
    pub fn expected(&self) -> Size {
        self.expected
    }

    pub fn into_buffer(self) -> PixelBuffer<P> {
        self.buffer
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<P> fmt::Debug for SwapError<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SwapError")
            .field("expected", &self.expected)
            .field("width", &self.buffer.width())
            .field("height", &self.buffer.height())
            .finish()
    }
}

impl<P> fmt::Display for SwapError<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "a buffer of {}x{} pixels can not replace the pixels of a {} frame",
            self.buffer.width(),
            self.buffer.height(),
            self.expected
        )
    }
}

impl<P> std::error::Error for SwapError<P> {}
