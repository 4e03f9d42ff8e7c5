use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::compose::compositor::Compositor;
use crate::compose::raster::{FrameRasterizer, FrameRgba};
use crate::foundation::core::{Fps, FrameIndex, FrameSize};
use crate::foundation::error::{KinetypeError, KinetypeResult, RenderFailure};
use crate::foundation::math::mul_div255_u16;
use crate::pipeline::progress::{Phase, ProgressSink, ProgressUpdate};
use crate::schedule::timeline::Timeline;

/// Options for [`FfmpegCompositor`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegCompositorOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegCompositorOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// Compositor that rasterizes every frame and streams it to the system `ffmpeg`.
///
/// Narration audio, when present, is muxed as AAC and the output is cut to the shorter stream.
pub struct FfmpegCompositor {
    opts: FfmpegCompositorOpts,
    raster: FrameRasterizer,
}

impl FfmpegCompositor {
    /// Create a compositor drawing frames with `raster`.
    pub fn new(opts: FfmpegCompositorOpts, raster: FrameRasterizer) -> Self {
        Self { opts, raster }
    }

    fn encode(
        &mut self,
        timeline: &Timeline,
        audio: Option<&Path>,
        progress: &mut dyn ProgressSink,
    ) -> KinetypeResult<()> {
        let (width, height) = self.raster.size();
        let frames = timeline.frame_count()?;
        let bg = self.raster.background_rgb();
        let mut encoder = FfmpegProcess::spawn(
            &self.opts,
            &EncodeConfig {
                width,
                height,
                fps: timeline.fps()?,
                audio: audio.map(Path::to_path_buf),
                bg_rgba: [bg[0], bg[1], bg[2], 255],
            },
        )?;

        tracing::debug!(frames, width, height, "encoding timeline");
        match self.write_frames(&mut encoder, timeline, frames, progress) {
            Ok(()) => encoder.finish(),
            Err(KinetypeError::Cancelled) => {
                encoder.abort();
                Err(KinetypeError::Cancelled)
            }
            Err(e) => Err(encoder.fail(e)),
        }
    }

    fn write_frames(
        &mut self,
        encoder: &mut FfmpegProcess,
        timeline: &Timeline,
        frames: u64,
        progress: &mut dyn ProgressSink,
    ) -> KinetypeResult<()> {
        let report_every = (frames / 100).max(1);
        // The visible set only grows within a screen, so (screen, visible count) names a frame.
        let mut last_key: Option<(usize, usize)> = None;
        for i in 0..frames {
            if progress.is_cancelled() {
                return Err(KinetypeError::Cancelled);
            }

            let t = timeline.frame_time(FrameIndex(i))?;
            let key = timeline.active_at(t).map(|(s, d)| (s.index, d.len()));
            if key.is_some() && key == last_key {
                encoder.repeat_frame()?;
            } else {
                let frame = self.raster.render_at(timeline, t)?;
                encoder.push_frame(&frame)?;
                last_key = key;
            }

            let done = i + 1;
            if done % report_every == 0 || done == frames {
                progress.on_progress(ProgressUpdate::within(
                    Phase::Compose,
                    done as f64 / frames as f64,
                    format!("encoded frame {done}/{frames}"),
                ));
            }
        }
        Ok(())
    }
}

impl Compositor for FfmpegCompositor {
    fn check_frame_size(&self, size: FrameSize) -> KinetypeResult<()> {
        validate_encode_size(size.width, size.height)?;
        let (width, height) = self.raster.size();
        if (size.width, size.height) != (width, height) {
            return Err(KinetypeError::validation(format!(
                "frames are {}x{} but the rasterizer draws {width}x{height}",
                size.width, size.height
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(out = %self.opts.out_path.display()))]
    fn compose(
        &mut self,
        timeline: &Timeline,
        audio: Option<&Path>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), RenderFailure> {
        self.encode(timeline, audio, progress).map_err(|e| match e {
            KinetypeError::Render(f) => f,
            other => RenderFailure::new(other.to_string()),
        })
    }
}

struct EncodeConfig {
    width: u32,
    height: u32,
    fps: Fps,
    audio: Option<PathBuf>,
    bg_rgba: [u8; 4],
}

struct FfmpegProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    bg_rgba: [u8; 4],
    width: u32,
    height: u32,
    /// Set once a write to ffmpeg's stdin failed, which means ffmpeg is exiting on its own.
    pipe_broken: bool,
}

impl FfmpegProcess {
    fn spawn(opts: &FfmpegCompositorOpts, cfg: &EncodeConfig) -> KinetypeResult<Self> {
        validate_encode_size(cfg.width, cfg.height)?;

        ensure_parent_dir(&opts.out_path)?;
        if !opts.overwrite && opts.out_path.exists() {
            return Err(KinetypeError::validation(format!(
                "output file '{}' already exists",
                opts.out_path.display()
            )));
        }
        if let Some(audio) = cfg.audio.as_deref()
            && !audio.exists()
        {
            return Err(KinetypeError::validation(format!(
                "narration audio '{}' does not exist",
                audio.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(KinetypeError::render(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        Self::start(build_command(opts, cfg), cfg)
    }

    fn start(mut cmd: Command, cfg: &EncodeConfig) -> KinetypeResult<Self> {
        let mut child = cmd.spawn().map_err(|e| {
            KinetypeError::render(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| KinetypeError::render("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| KinetypeError::render("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            scratch: vec![0u8; (cfg.width * cfg.height * 4) as usize],
            bg_rgba: cfg.bg_rgba,
            width: cfg.width,
            height: cfg.height,
            pipe_broken: false,
        })
    }

    fn push_frame(&mut self, frame: &FrameRgba) -> KinetypeResult<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(KinetypeError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        // ffmpeg does not understand premultiplied alpha.
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.bg_rgba)?;
        self.repeat_frame()
    }

    /// Write the last flattened frame again.
    fn repeat_frame(&mut self) -> KinetypeResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(KinetypeError::render("ffmpeg input is already closed"));
        };
        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            self.pipe_broken = true;
            KinetypeError::render(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn abort(mut self) {
        self.kill();
        if let Err(e) = self.child.wait() {
            tracing::debug!(error = %e, "failed to reap ffmpeg");
        }
        if let Err(e) = self.collect_stderr() {
            tracing::debug!(error = %e, "ffmpeg stderr lost");
        }
    }

    /// Shut ffmpeg down after `cause` interrupted the encode.
    ///
    /// A broken pipe means ffmpeg gave up first, so its stderr is the real error.
    fn fail(mut self, cause: KinetypeError) -> KinetypeError {
        if self.pipe_broken {
            drop(self.stdin.take());
        } else {
            self.kill();
        }
        let status = match self.child.wait() {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::debug!(error = %e, "failed to reap ffmpeg");
                None
            }
        };
        let stderr = match self.collect_stderr() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "ffmpeg stderr lost");
                Vec::new()
            }
        };

        if !self.pipe_broken {
            return cause;
        }
        tracing::warn!(?status, "ffmpeg stopped accepting frames");
        KinetypeError::render(write_failure_message(&cause, &stderr))
    }

    fn finish(mut self) -> KinetypeResult<()> {
        drop(self.stdin.take());
        let status = self.child.wait().map_err(|e| {
            KinetypeError::render(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = self.collect_stderr()?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(KinetypeError::render(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn kill(&mut self) {
        drop(self.stdin.take());
        if let Err(e) = self.child.kill() {
            tracing::debug!(error = %e, "ffmpeg already exited");
        }
    }

    fn collect_stderr(&mut self) -> KinetypeResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => Ok(handle
                .join()
                .map_err(|_| KinetypeError::render("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| KinetypeError::render(format!("ffmpeg stderr read failed: {e}")))?),
            None => Ok(Vec::new()),
        }
    }
}

/// Prefer what ffmpeg printed over the bare pipe error.
fn write_failure_message(cause: &KinetypeError, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        return cause.to_string();
    }
    format!("ffmpeg stopped reading frames: {stderr} ({cause})")
}

fn build_command(opts: &FfmpegCompositorOpts, cfg: &EncodeConfig) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd.args(encode_args(opts, cfg));
    cmd
}

/// Full `ffmpeg` argument list for one encode.
fn encode_args(opts: &FfmpegCompositorOpts, cfg: &EncodeConfig) -> Vec<String> {
    let size = format!("{}x{}", cfg.width, cfg.height);
    let rate = format!("{}/{}", cfg.fps.num, cfg.fps.den);
    let mut args: Vec<String> = Vec::new();
    args.push(if opts.overwrite { "-y" } else { "-n" }.to_string());
    args.extend(
        [
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            size.as_str(),
            // For rawvideo input, `-r` goes before `-i`.
            "-r",
            rate.as_str(),
            "-i",
            "pipe:0",
        ]
        .map(String::from),
    );

    match cfg.audio.as_deref() {
        Some(audio) => {
            args.push("-i".to_string());
            args.push(audio.to_string_lossy().into_owned());
            args.extend(
                [
                    "-map",
                    "0:v:0",
                    "-map",
                    "1:a:0",
                    "-c:v",
                    "libx264",
                    "-pix_fmt",
                    "yuv420p",
                    "-c:a",
                    "aac",
                    "-shortest",
                    "-movflags",
                    "+faststart",
                ]
                .map(String::from),
            );
        }
        None => {
            args.extend(
                [
                    "-an",
                    "-c:v",
                    "libx264",
                    "-pix_fmt",
                    "yuv420p",
                    "-movflags",
                    "+faststart",
                ]
                .map(String::from),
            );
        }
    }
    args.push(opts.out_path.to_string_lossy().into_owned());
    args
}

fn validate_encode_size(width: u32, height: u32) -> KinetypeResult<()> {
    if width == 0 || height == 0 {
        return Err(KinetypeError::validation(
            "ffmpeg output width/height must be non-zero",
        ));
    }
    if !width.is_multiple_of(2) || !height.is_multiple_of(2) {
        return Err(KinetypeError::validation(
            "ffmpeg output width/height must be even (required for yuv420p mp4 output)",
        ));
    }
    Ok(())
}

pub(crate) fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> KinetypeResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(KinetypeError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (s[0] as u16 + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (s[1] as u16 + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (s[2] as u16 + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> KinetypeResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/ffmpeg.rs"]
mod tests;
