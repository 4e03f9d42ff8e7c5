//! Kinetype is a kinetic typography layout and timing engine.
//!
//! A script is split into words that light up one after another in time with a narration (or a
//! fixed reading cadence). Words are grouped into screens and lines, each screen gets one font
//! size that fits the frame, and every word gets a dim and a bright draw directive. The result is
//! a serializable [`Timeline`] handed to a [`Compositor`]:
//!
//! - Build a [`Timeline`] with [`build_timeline`], or run narration, layout and composition in
//!   one go with [`render`]
//! - Write it as JSON with [`ManifestCompositor`], rasterize frames with [`FrameRasterizer`], or
//!   encode an MP4 with [`FfmpegCompositor`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod compose;
pub(crate) mod config;
pub(crate) mod layout;
pub(crate) mod narration;
pub(crate) mod pipeline;
pub(crate) mod schedule;
pub(crate) mod text;

pub use crate::foundation::core::{Fps, FrameIndex, FrameSize, Point, Rect, Vec2};
pub use crate::foundation::error::{KinetypeError, KinetypeResult, RenderFailure};

pub use crate::compose::compositor::{Compositor, InMemoryCompositor, ManifestCompositor};
pub use crate::compose::ffmpeg::{FfmpegCompositor, FfmpegCompositorOpts, is_ffmpeg_on_path};
pub use crate::compose::raster::{FrameRasterizer, FrameRgba};
pub use crate::config::settings::{CanvasPadding, KineticConfig};
pub use crate::layout::packer::{
    Autoscale, LayoutOverflow, Line, Screen, autoscale, line_width, pack_screen, pack_screens,
    screen_chunks,
};
pub use crate::layout::placer::{
    BlockGeometry, PlacedWord, block_geometry, canvas_for, place_screen,
};
pub use crate::narration::source::{
    AudioFileNarration, FixedNarration, Narration, NarrationSource, probe_audio_duration,
};
pub use crate::pipeline::engine::{RenderRequest, build_timeline, render};
pub use crate::pipeline::progress::{
    LogProgress, NoopProgress, Phase, ProgressSink, ProgressUpdate,
};
pub use crate::schedule::highlight::{Directive, DirectiveKind, schedule_screen};
pub use crate::schedule::timeline::{ScreenPlan, Timeline};
pub use crate::text::font::{
    FontDescriptor, FontResolver, LoadedFont, ResolvedFont, SystemFontResolver,
};
pub use crate::text::metrics::{
    EstimatedMetrics, GlyphMetrics, GlyphMetricsProvider, MetricsCache,
};
pub use crate::text::script::{Pacing, Script, WordUnit, build_script, normalize_script};
pub use crate::text::shaping::{ShapedGlyph, ShapedMetrics, ShapedWord, WordShaper};
