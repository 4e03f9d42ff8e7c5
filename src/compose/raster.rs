use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;

use crate::compose::ffmpeg::{ensure_parent_dir, flatten_premul_over_bg_to_opaque_rgba8};
use crate::config::settings::KineticConfig;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{KinetypeError, KinetypeResult};
use crate::schedule::highlight::Directive;
use crate::schedule::timeline::Timeline;
use crate::text::font::LoadedFont;
use crate::text::shaping::{ShapedWord, WordShaper};

/// A rasterized frame as RGBA8 pixels.
///
/// Pixels are **premultiplied alpha**, tightly packed, row-major.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes.
    pub data: Vec<u8>,
}

impl FrameRgba {
    /// Write the frame as an opaque PNG, flattening any alpha over `bg_rgb`.
    pub fn write_png(&self, path: &Path, bg_rgb: [u8; 3]) -> KinetypeResult<()> {
        let mut opaque = vec![0u8; self.data.len()];
        flatten_premul_over_bg_to_opaque_rgba8(
            &mut opaque,
            &self.data,
            [bg_rgb[0], bg_rgb[1], bg_rgb[2], 255],
        )?;
        ensure_parent_dir(path)?;
        image::save_buffer_with_format(
            path,
            &opaque,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// Draws timeline frames on the CPU with `vello_cpu`.
///
/// Each visible directive is drawn as a glyph run set from its pen position on its baseline; dim
/// directives go through an opacity layer and bright ones are painted on top.
pub struct FrameRasterizer {
    shaper: WordShaper,
    font: vello_cpu::peniko::FontData,
    shaped: HashMap<(String, u32), ShapedWord>,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    width: u16,
    height: u16,
    background_rgb: [u8; 3],
    text_rgb: [u8; 3],
}

impl FrameRasterizer {
    /// Rasterizer for frames of `cfg`'s size drawn with `font`.
    pub fn new(font: LoadedFont, cfg: &KineticConfig) -> KinetypeResult<Self> {
        let width = raster_dim(cfg.frame_width, "width")?;
        let height = raster_dim(cfg.frame_height, "height")?;
        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
            font.descriptor.face_index,
        );
        Ok(Self {
            shaper: WordShaper::new(font)?,
            font: data,
            shaped: HashMap::new(),
            ctx: vello_cpu::RenderContext::new(width, height),
            pixmap: vello_cpu::Pixmap::new(width, height),
            width,
            height,
            background_rgb: cfg.background_rgb,
            text_rgb: cfg.text_rgb,
        })
    }

    /// Output size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (u32::from(self.width), u32::from(self.height))
    }

    /// Background color frames are cleared to.
    pub fn background_rgb(&self) -> [u8; 3] {
        self.background_rgb
    }

    /// Rasterize frame `idx` of `timeline`.
    pub fn render_frame(
        &mut self,
        timeline: &Timeline,
        idx: FrameIndex,
    ) -> KinetypeResult<FrameRgba> {
        let t = timeline.frame_time(idx)?;
        self.render_at(timeline, t)
    }

    /// Rasterize `timeline` at absolute time `t` seconds.
    ///
    /// Times outside every screen produce a background-only frame.
    pub fn render_at(&mut self, timeline: &Timeline, t: f64) -> KinetypeResult<FrameRgba> {
        if (timeline.frame_width, timeline.frame_height) != self.size() {
            return Err(KinetypeError::validation(format!(
                "timeline is {}x{} but rasterizer is {}x{}",
                timeline.frame_width, timeline.frame_height, self.width, self.height
            )));
        }
        let visible = timeline
            .active_at(t)
            .map(|(_, directives)| directives)
            .unwrap_or_default();
        self.draw(&visible);
        Ok(FrameRgba {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.pixmap.data_as_u8_slice().to_vec(),
        })
    }

    fn draw(&mut self, directives: &[&Directive]) {
        let Self {
            shaper,
            font,
            shaped,
            ctx,
            pixmap,
            width,
            height,
            background_rgb: bg,
            text_rgb: fg,
        } = self;

        ctx.reset();
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg[0], bg[1], bg[2], 255));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(*width),
            f64::from(*height),
        ));

        for d in directives {
            let word = shaped
                .entry((d.text.clone(), d.font_size))
                .or_insert_with(|| shaper.shape(&d.text, d.font_size as f32));
            let opacity = d.opacity.clamp(0.0, 1.0);

            ctx.set_transform(vello_cpu::kurbo::Affine::translate((d.pen_x, d.baseline_y)));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(fg[0], fg[1], fg[2], 255));
            if opacity < 1.0 {
                ctx.push_opacity_layer(opacity);
            }
            let glyphs = word.glyphs.iter().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(word.font_size)
                .fill_glyphs(glyphs);
            if opacity < 1.0 {
                ctx.pop_layer();
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(pixmap);
    }
}

fn raster_dim(v: u32, name: &str) -> KinetypeResult<u16> {
    match u16::try_from(v) {
        Ok(d) if d > 0 => Ok(d),
        _ => Err(KinetypeError::validation(format!(
            "frame {name} must be in 1..={} for rasterization (got {v})",
            u16::MAX
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/raster.rs"]
mod tests;
