use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Encoder settings for a recorded session.
#[derive(Clone, Debug)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
}

/// Streams raw RGBA canvas frames into an `ffmpeg` child process.
pub struct VideoRecorder {
    child: Child,
    frame_len: usize,
    frames: u64,
}

fn ffmpeg_args(output_path: &Path, settings: &VideoSettings) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y".to_string(),
        "-nostats".into(),
        "-loglevel".into(), "error".into(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", settings.width, settings.height),
        "-framerate".into(), settings.fps.to_string(),
        "-i".into(), "pipe:0".into(),
        "-c:v".into(), settings.codec.clone(),
        "-pix_fmt".into(), settings.pix_fmt.clone(),
        "-crf".into(), settings.crf.to_string(),
        "-preset".into(), "medium".into(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(output_path.as_os_str().to_os_string());
    args
}

impl VideoRecorder {
    pub fn start(output_path: &Path, settings: &VideoSettings) -> Result<Self> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(ffmpeg_args(output_path, settings));
        let recorder = Self::spawn(cmd, settings.width as usize * settings.height as usize * 4)
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "Recording {} at {}x{} @ {}fps, codec={}",
            output_path.display(),
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );

        Ok(recorder)
    }

    /// The child gets its own process group so Ctrl+C on the terminal only
    /// reaches us, and we close the stream ourselves.
    fn spawn(mut cmd: Command, frame_len: usize) -> std::io::Result<Self> {
        cmd.stdin(Stdio::piped()).stdout(Stdio::null()).stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        Ok(Self {
            child: cmd.spawn()?,
            frame_len,
            frames: 0,
        })
    }

    pub fn push_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        anyhow::ensure!(
            rgba_pixels.len() == self.frame_len,
            "Frame is {} bytes, expected {}",
            rgba_pixels.len(),
            self.frame_len
        );
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        self.frames += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<u64> {
        // EOF on stdin ends the stream
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("Recording complete: {} frames", self.frames);
        Ok(self.frames)
    }
}

/// Push one frame. A failing recorder is logged and dropped so the session
/// itself carries on.
pub fn record_frame(recorder: &mut Option<VideoRecorder>, frame: &[u8]) {
    let failure = match recorder.as_mut() {
        Some(rec) => rec.push_frame(frame).err(),
        None => None,
    };
    if let Some(e) = failure {
        log::warn!("Video recording stopped: {:#}", e);
        *recorder = None;
    }
}

/// Close the stream and wait for the encoder. Failures are only logged.
pub fn finish_recording(recorder: Option<VideoRecorder>) -> Option<u64> {
    match recorder?.finish() {
        Ok(frames) => Some(frames),
        Err(e) => {
            log::warn!("Video recording failed: {:#}", e);
            None
        }
    }
}
