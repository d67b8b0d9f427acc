//! Local video files decoded with FFmpeg.
//!
//! The decoder lives on a dedicated worker thread. Callers talk to it over
//! a command channel and wait for the matching reply with a timeout, so a
//! wedged demuxer surfaces as `SeekError::Timeout` instead of hanging the
//! sampler. Every command carries a sequence number; replies from commands
//! that already timed out are discarded.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::video::VideoMedia;
use crate::error::{MediaLoadError, SeekError};
use crate::frame::Frame;

/// Decoded timestamps this close to the target count as reaching it.
const SEEK_TOLERANCE_S: f64 = 1e-3;
/// FFmpeg container timestamps are in microseconds.
const CONTAINER_TICKS_PER_S: f64 = 1_000_000.0;

enum Command {
    Seek { seq: u64, target: f64 },
    Current { seq: u64 },
    Next { seq: u64 },
    Shutdown,
}

enum Reply {
    Position { seq: u64, result: Result<f64, String> },
    Frame { seq: u64, result: Result<Option<Frame>, String> },
}

impl Reply {
    fn seq(&self) -> u64 {
        match self {
            Reply::Position { seq, .. } | Reply::Frame { seq, .. } => *seq,
        }
    }
}

struct Playback {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    time_base: f64,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    current: Option<Frame>,
    position: f64,
    drained: bool,
}

impl Playback {
    fn open(path: &Path) -> Result<(Self, f64)> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open '{}' with ffmpeg", path.display()))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let time_base = f64::from(input_stream.time_base());
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        let raw_duration = input.duration();
        let duration = if raw_duration > 0 {
            raw_duration as f64 / CONTAINER_TICKS_PER_S
        } else {
            0.0
        };

        Ok((
            Self {
                input,
                stream_index,
                time_base,
                decoder,
                scaler,
                current: None,
                position: 0.0,
                drained: false,
            },
            duration,
        ))
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
    }

    fn decode_next(&mut self) -> Result<Option<(f64, Frame)>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg::frame::Video::empty();
                self.scaler
                    .run(&decoded, &mut rgb_frame)
                    .context("scale frame to RGB")?;
                let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
                let frame = Frame::from_rgb(pixels, width, height)
                    .context("decoded frame has inconsistent dimensions")?;
                let at = decoded
                    .timestamp()
                    .map(|ts| ts as f64 * self.time_base)
                    .unwrap_or(self.position);
                return Ok(Some((at, frame)));
            }
            if self.drained {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    self.decoder.send_eof().context("flush ffmpeg decoder")?;
                    self.drained = true;
                }
            }
        }
    }

    fn seek(&mut self, target: f64) -> Result<f64> {
        let ts = (target * CONTAINER_TICKS_PER_S) as i64;
        self.input
            .seek(ts, ..ts)
            .with_context(|| format!("seek to {:.3}s", target))?;
        self.decoder.flush();
        self.drained = false;

        let mut reached = None;
        while let Some((at, frame)) = self.decode_next()? {
            let done = at + SEEK_TOLERANCE_S >= target;
            reached = Some((at, frame));
            if done {
                break;
            }
        }
        let (at, frame) = reached.ok_or_else(|| anyhow!("no frame decoded after seek"))?;
        self.position = at;
        self.current = Some(frame);
        Ok(at)
    }

    fn current_frame(&mut self) -> Result<Option<Frame>> {
        if self.current.is_none() {
            if let Some((at, frame)) = self.decode_next()? {
                self.position = at;
                self.current = Some(frame);
            }
        }
        Ok(self.current.clone())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.decode_next()? {
            Some((at, frame)) => {
                self.position = at;
                self.current = Some(frame.clone());
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

fn run_worker(
    path: PathBuf,
    ready: Sender<Result<f64, String>>,
    commands: Receiver<Command>,
    replies: Sender<Reply>,
) {
    let mut playback = match Playback::open(&path) {
        Ok((playback, duration)) => {
            let _ = ready.send(Ok(duration));
            playback
        }
        Err(err) => {
            let _ = ready.send(Err(format!("{:#}", err)));
            return;
        }
    };

    for command in commands {
        let reply = match command {
            Command::Seek { seq, target } => Reply::Position {
                seq,
                result: playback.seek(target).map_err(|e| format!("{:#}", e)),
            },
            Command::Current { seq } => Reply::Frame {
                seq,
                result: playback.current_frame().map_err(|e| format!("{:#}", e)),
            },
            Command::Next { seq } => Reply::Frame {
                seq,
                result: playback.next_frame().map_err(|e| format!("{:#}", e)),
            },
            Command::Shutdown => break,
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    log::debug!("ffmpeg playback worker for {} stopped", path.display());
}

/// FFmpeg-backed [`VideoMedia`] for local files.
pub(crate) struct FfmpegVideo {
    url: String,
    duration: f64,
    seek_timeout: Duration,
    next_seq: u64,
    commands: Sender<Command>,
    replies: Receiver<Reply>,
    worker: Option<JoinHandle<()>>,
}

impl FfmpegVideo {
    pub(crate) fn open(url: &str, path: &Path, seek_timeout: Duration) -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let worker_path = path.to_path_buf();
        let worker = std::thread::Builder::new()
            .name("ffmpeg-playback".to_string())
            .spawn(move || run_worker(worker_path, ready_tx, command_rx, reply_tx))
            .context("spawn ffmpeg playback worker")?;

        let metadata = ready_rx.recv().map_err(|_| "playback worker exited".to_string());
        let duration = match metadata.and_then(|r| r) {
            Ok(duration) => duration,
            Err(reason) => {
                let _ = worker.join();
                return Err(MediaLoadError::Video {
                    url: url.to_string(),
                    reason,
                }
                .into());
            }
        };
        log::info!("opened video {} ({:.2}s, ffmpeg)", url, duration);

        Ok(Self {
            url: url.to_string(),
            duration,
            seek_timeout,
            next_seq: 0,
            commands: command_tx,
            replies: reply_rx,
            worker: Some(worker),
        })
    }

    fn send(&mut self, make: impl FnOnce(u64) -> Command) -> Result<u64, SeekError> {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.commands
            .send(make(seq))
            .map_err(|_| SeekError::WorkerGone)?;
        Ok(seq)
    }

    /// Wait for the reply to `seq`, dropping stale replies on the way.
    fn await_reply(&mut self, seq: u64, timeout: Option<Duration>) -> Result<Reply, RecvTimeoutError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let reply = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.replies.recv_timeout(remaining)?
                }
                None => self
                    .replies
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected)?,
            };
            if reply.seq() == seq {
                return Ok(reply);
            }
            log::debug!("{}: discarding stale reply {}", self.url, reply.seq());
        }
    }

    fn request_frame(&mut self, make: impl FnOnce(u64) -> Command) -> Result<Option<Frame>> {
        let seq = self.send(make)?;
        match self.await_reply(seq, None) {
            Ok(Reply::Frame { result, .. }) => result.map_err(|reason| anyhow!(reason)),
            Ok(Reply::Position { .. }) => Err(anyhow!("unexpected reply from playback worker")),
            Err(_) => Err(SeekError::WorkerGone.into()),
        }
    }
}

impl VideoMedia for FfmpegVideo {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn seek(&mut self, target: f64) -> Result<f64, SeekError> {
        let seq = self.send(|seq| Command::Seek { seq, target })?;
        match self.await_reply(seq, Some(self.seek_timeout)) {
            Ok(Reply::Position { result, .. }) => {
                result.map_err(|reason| SeekError::Rejected { target, reason })
            }
            Ok(Reply::Frame { .. }) => Err(SeekError::Rejected {
                target,
                reason: "unexpected reply from playback worker".to_string(),
            }),
            Err(RecvTimeoutError::Timeout) => Err(SeekError::Timeout {
                target,
                timeout_ms: self.seek_timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(SeekError::WorkerGone),
        }
    }

    fn current_frame(&mut self) -> Result<Frame> {
        self.request_frame(|seq| Command::Current { seq })?
            .ok_or_else(|| anyhow!("{} has no decodable frames", self.url))
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.request_frame(|seq| Command::Next { seq })
    }
}

impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(
            data.get(start..start + row_bytes)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }
    Ok((pixels, width, height))
}
