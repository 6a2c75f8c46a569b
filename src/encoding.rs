use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::error_codes::CodedError;

pub const DEFAULT_FPS: u32 = 30;

/// Receives painted RGBA frames in order.
pub trait FrameSink {
    fn write_frame(&mut self, rgba_frame: Vec<u8>) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub output_path: PathBuf,
}

impl EncoderSettings {
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfmpegMode {
    Auto,
    System,
    Sidecar,
}

pub struct FfmpegPipe {
    sender: Option<mpsc::SyncSender<Vec<u8>>>,
    worker: Option<JoinHandle<Result<()>>>,
    frame_len: usize,
    output_path: PathBuf,
}

trait VideoEncoderBackend: Send {
    fn mode_label(&self) -> &'static str;
    fn run(self: Box<Self>, receiver: mpsc::Receiver<Vec<u8>>) -> Result<()>;
}

struct SystemFfmpegBackend {
    settings: EncoderSettings,
}

#[cfg(feature = "sidecar_ffmpeg")]
struct SidecarFfmpegBackend {
    settings: EncoderSettings,
}

impl FfmpegPipe {
    pub fn spawn(settings: &EncoderSettings) -> Result<Self> {
        Self::spawn_with_mode(settings, FfmpegMode::Auto)
    }

    /// Checks the output location before starting ffmpeg so an unwritable
    /// path fails without leaving a file behind.
    pub fn spawn_with_mode(settings: &EncoderSettings, mode: FfmpegMode) -> Result<Self> {
        prepare_output_path(&settings.output_path)?;
        if settings.width == 0 || settings.height == 0 || settings.fps == 0 {
            return Err(CodedError::encoder_write(
                &settings.output_path,
                format!(
                    "invalid encoder settings {}x{} @ {} fps",
                    settings.width, settings.height, settings.fps
                ),
            )
            .into());
        }

        let (sender, receiver) = mpsc::sync_channel::<Vec<u8>>(4);
        let backend = select_backend(mode, settings.clone())?;
        let worker_name = format!("ascii-matrix-encoder-{}", backend.mode_label());
        info!(
            output = %settings.output_path.display(),
            width = settings.width,
            height = settings.height,
            fps = settings.fps,
            "starting encoder"
        );

        let worker = thread::Builder::new()
            .name(worker_name)
            .spawn(move || backend.run(receiver))
            .context("failed to spawn ffmpeg writer thread")?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            frame_len: settings.frame_len(),
            output_path: settings.output_path.clone(),
        })
    }

    fn join_worker(&mut self) -> Result<()> {
        drop(self.sender.take());

        let handle = self
            .worker
            .take()
            .ok_or_else(|| anyhow!("ffmpeg worker thread missing"))?;
        let result = match handle.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("ffmpeg worker thread panicked")),
        };
        if result.is_err() {
            remove_if_empty(&self.output_path);
        }
        result
    }
}

impl FrameSink for FfmpegPipe {
    fn write_frame(&mut self, rgba_frame: Vec<u8>) -> Result<()> {
        if rgba_frame.len() != self.frame_len {
            return Err(anyhow!(
                "frame has {} bytes, encoder expects {}",
                rgba_frame.len(),
                self.frame_len
            ));
        }
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("encoder has already been finalized"))?;
        if sender.send(rgba_frame).is_ok() {
            return Ok(());
        }
        // The worker hung up early; its result carries the real failure.
        match self.join_worker() {
            Err(error) => Err(error),
            Ok(()) => Err(CodedError::encoder_write(
                &self.output_path,
                "encoder stopped accepting frames",
            )
            .into()),
        }
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.join_worker()?;
        info!(output = %self.output_path.display(), "encoder finished");
        Ok(())
    }
}

impl Drop for FfmpegPipe {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.join_worker();
        }
    }
}

/// Collects frames in memory; for previews and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Vec<u8>>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, rgba_frame: Vec<u8>) -> Result<()> {
        self.frames.push(rgba_frame);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn prepare_output_path(output_path: &Path) -> Result<()> {
    let path_str = output_path.to_string_lossy();
    if path_str.is_empty() {
        return Err(CodedError::encoder_write(output_path, "output path is empty").into());
    }
    if path_str.chars().any(|c| c.is_control()) {
        return Err(CodedError::encoder_write(
            output_path,
            "output path contains control characters",
        )
        .into());
    }
    if output_path.is_dir() {
        return Err(CodedError::encoder_write(output_path, "output path is a directory").into());
    }

    let parent = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|error| {
        CodedError::encoder_write(
            output_path,
            format!("cannot create directory {}: {error}", parent.display()),
        )
    })?;
    let metadata = fs::metadata(&parent).map_err(|error| {
        CodedError::encoder_write(
            output_path,
            format!("cannot inspect directory {}: {error}", parent.display()),
        )
    })?;
    if metadata.permissions().readonly() {
        return Err(CodedError::encoder_write(
            output_path,
            format!("directory {} is read-only", parent.display()),
        )
        .into());
    }
    Ok(())
}

fn remove_if_empty(path: &Path) {
    if fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(false) {
        debug!(path = %path.display(), "removing empty output after encoder failure");
        let _ = fs::remove_file(path);
    }
}

fn select_backend(
    mode: FfmpegMode,
    settings: EncoderSettings,
) -> Result<Box<dyn VideoEncoderBackend>> {
    match mode {
        FfmpegMode::Auto | FfmpegMode::System => Ok(Box::new(SystemFfmpegBackend { settings })),
        FfmpegMode::Sidecar => {
            #[cfg(feature = "sidecar_ffmpeg")]
            {
                Ok(Box::new(SidecarFfmpegBackend { settings }))
            }
            #[cfg(not(feature = "sidecar_ffmpeg"))]
            {
                Err(CodedError::encoder_write(
                    &settings.output_path,
                    "ffmpeg sidecar mode requested but ascii-matrix was built without `sidecar_ffmpeg`. Rebuild with `--features sidecar_ffmpeg`.",
                )
                .into())
            }
        }
    }
}

impl VideoEncoderBackend for SystemFfmpegBackend {
    fn mode_label(&self) -> &'static str {
        "system"
    }

    fn run(self: Box<Self>, receiver: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        run_ffmpeg_process(
            Path::new("ffmpeg"),
            receiver,
            &self.settings,
            self.mode_label(),
        )
    }
}

#[cfg(feature = "sidecar_ffmpeg")]
impl VideoEncoderBackend for SidecarFfmpegBackend {
    fn mode_label(&self) -> &'static str {
        "sidecar"
    }

    fn run(self: Box<Self>, receiver: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        let path = ffmpeg_sidecar::paths::ffmpeg_path();
        if !path.exists() {
            ffmpeg_sidecar::download::auto_download().map_err(|error| {
                CodedError::encoder_write(
                    &self.settings.output_path,
                    format!("failed to auto-download ffmpeg sidecar binary: {error}"),
                )
            })?;
        }
        run_ffmpeg_process(&path, receiver, &self.settings, self.mode_label())
    }
}

fn run_ffmpeg_process(
    ffmpeg_path: &Path,
    receiver: mpsc::Receiver<Vec<u8>>,
    settings: &EncoderSettings,
    mode_label: &str,
) -> Result<()> {
    let output_path = &settings.output_path;
    let args = ffmpeg_args(settings);
    let mut child = Command::new(ffmpeg_path)
        .args(args.iter().map(String::as_str))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| {
            let reason = if error.kind() == ErrorKind::NotFound {
                format!(
                    "ffmpeg executable not found (mode={mode_label}, resolved_path={}). Install ffmpeg or use sidecar mode with `--features sidecar_ffmpeg`.",
                    ffmpeg_path.display()
                )
            } else {
                format!(
                    "failed to spawn ffmpeg (mode={mode_label}, resolved_path={}, args='{}'): {error}",
                    ffmpeg_path.display(),
                    args.join(" ")
                )
            };
            CodedError::encoder_write(output_path, reason)
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("failed to capture ffmpeg stdin"))?;
    let mut stderr_pipe = child.stderr.take();

    let mut write_error = None;
    while let Ok(frame) = receiver.recv() {
        if let Err(error) = stdin.write_all(&frame) {
            write_error = Some(error);
            break;
        }
    }
    if write_error.is_none() {
        if let Err(error) = stdin.flush() {
            write_error = Some(error);
        }
    }
    drop(stdin);
    drop(receiver);

    let status = child.wait().context("failed waiting for ffmpeg process")?;
    let stderr_tail = read_stderr_tail(&mut stderr_pipe)?;
    if !status.success() {
        return Err(CodedError::encoder_write(
            output_path,
            format!(
                "ffmpeg failed with status {status} (mode={mode_label}, args='{}', stderr_tail='{}')",
                args.join(" "),
                stderr_tail
            ),
        )
        .into());
    }
    if let Some(error) = write_error {
        return Err(CodedError::encoder_write(
            output_path,
            format!("failed to write frame to ffmpeg stdin: {error}"),
        )
        .into());
    }

    Ok(())
}

fn ffmpeg_args(settings: &EncoderSettings) -> Vec<String> {
    let size = format!("{}x{}", settings.width, settings.height);
    let mut args = ffmpeg_rawvideo_input_args(&size, &settings.fps.to_string());
    args.extend(ffmpeg_mp4v_output_args());
    args.extend(ffmpeg_container_output_args(&settings.output_path));
    args.push(settings.output_path.to_string_lossy().into_owned());
    args
}

pub fn ffmpeg_rawvideo_input_args(size: &str, fps: &str) -> Vec<String> {
    vec![
        "-hide_banner".to_owned(),
        "-loglevel".to_owned(),
        "error".to_owned(),
        "-y".to_owned(),
        "-f".to_owned(),
        "rawvideo".to_owned(),
        "-pix_fmt".to_owned(),
        "rgba".to_owned(),
        "-s:v".to_owned(),
        size.to_owned(),
        "-r".to_owned(),
        fps.to_owned(),
        "-i".to_owned(),
        "-".to_owned(),
        "-an".to_owned(),
    ]
}

/// MPEG-4 Part 2 tagged `mp4v`.
pub fn ffmpeg_mp4v_output_args() -> Vec<String> {
    vec![
        "-c:v".to_owned(),
        "mpeg4".to_owned(),
        "-vtag".to_owned(),
        "mp4v".to_owned(),
        "-q:v".to_owned(),
        "2".to_owned(),
        "-pix_fmt".to_owned(),
        "yuv420p".to_owned(),
    ]
}

pub fn ffmpeg_container_output_args(output_path: &Path) -> Vec<String> {
    let ext = output_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if matches!(ext.as_str(), "mov" | "mp4" | "m4v") {
        vec!["-movflags".to_owned(), "+faststart".to_owned()]
    } else {
        Vec::new()
    }
}

fn read_stderr_tail(stderr: &mut Option<std::process::ChildStderr>) -> Result<String> {
    let Some(mut pipe) = stderr.take() else {
        return Ok(String::new());
    };
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)
        .context("failed reading ffmpeg stderr")?;
    let text = String::from_utf8_lossy(&buf).to_string();
    Ok(last_n_chars(&text, 500))
}

fn last_n_chars(s: &str, max_chars: usize) -> String {
    let chars = s.chars().collect::<Vec<_>>();
    let start = chars.len().saturating_sub(max_chars);
    chars[start..].iter().collect::<String>().trim().to_owned()
}
