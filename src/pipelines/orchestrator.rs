// SPDX-License-Identifier: MPL-2.0

//! Capture cycle orchestration
//!
//! [`CaptureOrchestrator`] owns everything one capture session needs: the
//! index tables, the working set, the channel codec and the two delayed
//! output queues. `process_capture` runs a full cycle (convert, filter,
//! generate, compress, emit); [`CaptureLoop`] drives it from a dedicated
//! thread reading a [`CaptureSource`].
//!
//! Settings live behind a mutex and are copied once per cycle, so another
//! thread may swap them at any time and the change lands on the next
//! capture. Timing stats use `try_lock` on the shared map; a contended
//! cycle simply skips reporting.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::capture::{CaptureSource, ModeInfo, RawCapture};
use crate::config::{DataSettings, FilterSettings};
use crate::errors::{CaptureError, CaptureResult};
use crate::media::codec::{
    pack_cloud, pack_cloud_colors, padded_len, ChannelCodec,
};
use crate::media::convert;
use crate::media::delay::DelayedFrameQueue;
use crate::media::frame::{CompressedFrame, DisplayFrame, EncodedChannel};
use crate::pipelines::cloud::CloudAndImageBuilder;
use crate::pipelines::filters::DepthFilterPipeline;
use crate::pipelines::tables::IndexTables;
use crate::pipelines::working::FrameWorkingSet;

/// Hot-swappable settings bundle shared with the capture thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSettings {
    pub filters: FilterSettings,
    pub data: DataSettings,
}

pub type DisplayCallback = Box<dyn FnMut(DisplayFrame) + Send>;
pub type CompressedCallback = Box<dyn FnMut(CompressedFrame) + Send>;

/// Completion instants of the most recent cycle's named stages
pub type StageTimestamps = HashMap<&'static str, Instant>;

/// Drives one capture session end to end
pub struct CaptureOrchestrator {
    mode: ModeInfo,
    tables: IndexTables,
    ws: FrameWorkingSet,
    codec: ChannelCodec,
    settings: Arc<Mutex<SessionSettings>>,
    timings: Arc<Mutex<StageTimestamps>>,
    display_queue: DelayedFrameQueue<DisplayFrame>,
    compressed_queue: DelayedFrameQueue<CompressedFrame>,
    capture_timestamps: VecDeque<Duration>,
    device_id: u32,
    capture_id: u64,
    on_display: Option<DisplayCallback>,
    on_compressed: Option<CompressedCallback>,
}

impl CaptureOrchestrator {
    pub fn new(mode: ModeInfo) -> Self {
        Self {
            tables: IndexTables::build(&mode),
            mode,
            ws: FrameWorkingSet::default(),
            codec: ChannelCodec::new(),
            settings: Arc::new(Mutex::new(SessionSettings::default())),
            timings: Arc::new(Mutex::new(StageTimestamps::new())),
            display_queue: DelayedFrameQueue::new(),
            compressed_queue: DelayedFrameQueue::new(),
            capture_timestamps: VecDeque::new(),
            device_id: 0,
            capture_id: 0,
            on_display: None,
            on_compressed: None,
        }
    }

    pub fn mode(&self) -> &ModeInfo {
        &self.mode
    }

    /// Identify this device in multi-camera sessions; stamped on compressed frames
    pub fn set_device_id(&mut self, device_id: u32) {
        self.device_id = device_id;
    }

    /// Shared handle for swapping settings from another thread
    pub fn settings_handle(&self) -> Arc<Mutex<SessionSettings>> {
        Arc::clone(&self.settings)
    }

    /// Replace the session settings; takes effect with the next capture
    pub fn update_settings(&self, settings: SessionSettings) {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = settings;
    }

    /// Shared handle to the per-stage timing stats
    pub fn timings_handle(&self) -> Arc<Mutex<StageTimestamps>> {
        Arc::clone(&self.timings)
    }

    /// Milliseconds between two named stages of the most recent cycle
    ///
    /// Returns `None` when either stage has not been recorded yet or the
    /// stats are locked by the capture thread right now.
    pub fn duration_between_ms(&self, from: &'static str, to: &'static str) -> Option<f64> {
        let timings = self.timings.try_lock().ok()?;
        let from = *timings.get(from)?;
        let to = *timings.get(to)?;
        Some(to.saturating_duration_since(from).as_secs_f64() * 1000.0)
    }

    pub fn set_display_callback(&mut self, cb: DisplayCallback) {
        self.on_display = Some(cb);
    }

    pub fn set_compressed_callback(&mut self, cb: CompressedCallback) {
        self.on_compressed = Some(cb);
    }

    pub fn capture_id(&self) -> u64 {
        self.capture_id
    }

    /// Captures per second over the rolling window
    pub fn capture_rate(&self) -> f32 {
        let window = Duration::from_millis(crate::constants::CAPTURE_RATE_WINDOW_MS);
        let Some(&newest) = self.capture_timestamps.back() else {
            return 0.0;
        };
        let count = self
            .capture_timestamps
            .iter()
            .filter(|&&ts| newest.saturating_sub(ts) <= window)
            .count();
        count as f32 / window.as_secs_f32()
    }

    /// Advance the capture counter for a read that produced nothing
    ///
    /// Timing stats still record the aborted cycle.
    pub fn mark_failed_capture(&mut self) {
        self.capture_id += 1;
        if let Ok(mut timings) = self.timings.try_lock() {
            let now = Instant::now();
            timings.insert("start", now);
            timings.insert("send", now);
        }
    }

    /// Run one full cycle over a raw capture
    ///
    /// `now` is the session-relative time used for delayed emission.
    pub fn process_capture(&mut self, capture: RawCapture, now: Duration) -> CaptureResult<()> {
        let settings = self
            .settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        self.capture_id += 1;
        let timestamp = capture.timestamp;
        self.record_capture_time(timestamp);

        let mut stages: Vec<(&'static str, Instant)> = Vec::with_capacity(8);
        stages.push(("start", Instant::now()));

        self.ws.rebind(&self.mode, capture);
        stages.push(("capture", Instant::now()));

        self.convert_color();
        stages.push(("convert", Instant::now()));

        DepthFilterPipeline::apply(&self.mode, &self.tables, &settings.filters, &mut self.ws);
        CloudAndImageBuilder::apply_invalidation(&self.mode, &settings.filters, &mut self.ws);
        stages.push(("filter", Instant::now()));

        let display = self.build_display_frame(&settings, timestamp, now);
        stages.push(("generate", Instant::now()));

        let compressed = self.build_compressed_frame(&settings, timestamp);
        stages.push(("compress", Instant::now()));

        let delay = Duration::from_millis(settings.data.delay_ms);
        if let Some(frame) = display {
            self.display_queue.push(timestamp, frame);
        }
        if let Some(frame) = compressed {
            self.compressed_queue.push(timestamp, frame);
        }
        if let Some(frame) = self.display_queue.take_ready(now, delay) {
            if let Some(cb) = self.on_display.as_mut() {
                cb(frame);
            }
        }
        if let Some(frame) = self.compressed_queue.take_ready(now, delay) {
            if let Some(cb) = self.on_compressed.as_mut() {
                cb(frame);
            }
        }
        stages.push(("send", Instant::now()));

        if let Ok(mut timings) = self.timings.try_lock() {
            for (stage, at) in stages {
                timings.insert(stage, at);
            }
        }

        debug!(
            capture_id = self.capture_id,
            valid = self.ws.valid_vertex_count,
            "capture cycle complete"
        );
        Ok(())
    }

    fn record_capture_time(&mut self, timestamp: Duration) {
        let window = Duration::from_millis(crate::constants::CAPTURE_RATE_WINDOW_MS);
        self.capture_timestamps.push_back(timestamp);
        while let Some(&oldest) = self.capture_timestamps.front() {
            if timestamp.saturating_sub(oldest) > window {
                self.capture_timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Convert the raw color buffer to RGBA; failure leaves the channel empty
    fn convert_color(&mut self) {
        if !self.mode.has_color() || self.ws.raw_color.is_empty() {
            return;
        }
        if let Err(e) = convert::color_to_rgba(
            self.mode.color_layout,
            &self.ws.raw_color,
            self.mode.color_width(),
            self.mode.color_height(),
            &mut self.ws.converted_color,
        ) {
            error!(error = %e, layout = ?self.mode.color_layout, "color conversion failed");
            self.ws.converted_color.clear();
        }
    }

    fn build_display_frame(
        &mut self,
        settings: &SessionSettings,
        timestamp: Duration,
        now: Duration,
    ) -> Option<DisplayFrame> {
        let generation = &settings.data.generation;
        if !generation.color_image
            && !generation.depth_sized_color_image
            && !generation.depth_image
            && !generation.infra_image
            && !generation.body_index_image
            && !generation.cloud
        {
            return None;
        }

        let mut frame = DisplayFrame {
            capture_id: self.capture_id,
            timestamp,
            processed_timestamp: now,
            raw_depth: self.ws.depth.clone(),
            raw_infra: self.ws.infra.clone(),
            calibration: self.ws.calibration.clone(),
            ..Default::default()
        };

        if generation.color_image {
            CloudAndImageBuilder::build_color_image(
                self.mode.color_width(),
                self.mode.color_height(),
                &self.ws.converted_color,
                &mut frame.color,
            );
        }
        if generation.depth_sized_color_image {
            CloudAndImageBuilder::build_color_image(
                self.mode.depth_width(),
                self.mode.depth_height(),
                &self.ws.depth_sized_color,
                &mut frame.depth_sized_color,
            );
        }
        if generation.depth_image && self.mode.has_depth() {
            CloudAndImageBuilder::build_depth_image(&self.mode, &self.ws, &mut frame.depth);
        }
        if generation.infra_image && self.mode.has_infra {
            CloudAndImageBuilder::build_infra_image(&self.mode, &self.ws, &mut frame.infra);
        }
        if generation.body_index_image && self.mode.has_body_index {
            CloudAndImageBuilder::build_body_index_image(&self.mode, &self.ws, &mut frame.body_index);
        }
        if generation.cloud && self.mode.has_cloud {
            CloudAndImageBuilder::build_cloud(
                &self.mode,
                &self.tables,
                generation,
                &self.ws,
                &mut frame.cloud,
            );
        }

        if settings.data.capture_imu {
            frame.imu = self.ws.imu;
        }
        if settings.data.capture_audio {
            frame.audio = self.ws.audio.clone();
        }
        if settings.data.capture_bodies {
            frame.bodies = self.ws.bodies.clone();
        }

        Some(frame)
    }

    fn build_compressed_frame(
        &mut self,
        settings: &SessionSettings,
        timestamp: Duration,
    ) -> Option<CompressedFrame> {
        let comp = &settings.data.compression;
        if !comp.color && !comp.depth_sized_color && !comp.depth && !comp.infra && !comp.body_index
            && !comp.cloud
        {
            return None;
        }

        let mut frame = CompressedFrame {
            device_id: self.device_id,
            capture_id: self.capture_id,
            timestamp,
            valid_vertex_count: self.ws.valid_vertex_count,
            calibration: self.ws.calibration.clone(),
            ..Default::default()
        };

        if comp.color && !self.ws.converted_color.is_empty() {
            frame.color = self.encode_lossy(
                "color",
                self.mode.color_width(),
                self.mode.color_height(),
                comp.jpeg_quality,
            );
        }
        if comp.depth_sized_color && !self.ws.depth_sized_color.is_empty() {
            frame.depth_sized_color = self.encode_lossy(
                "depth_sized_color",
                self.mode.depth_width(),
                self.mode.depth_height(),
                comp.jpeg_quality,
            );
        }
        if comp.depth && !self.ws.depth.is_empty() {
            frame.depth = self.encode_lossless_channel("depth");
        }
        if comp.infra && !self.ws.infra.is_empty() {
            frame.infra = self.encode_lossless_channel("infra");
        }
        if comp.body_index && !self.ws.body_index.is_empty() {
            // body-index map travels as a grayscale image through the lossy path
            let gray: Vec<u8> = self
                .ws
                .body_index
                .iter()
                .flat_map(|&v| [v, v, v])
                .collect();
            let (w, h) = (self.mode.depth_width(), self.mode.depth_height());
            match self.codec.encode_lossy_image(&gray, w, h, 3, comp.jpeg_quality) {
                Ok(data) => {
                    frame.body_index = EncodedChannel {
                        width: w,
                        height: h,
                        data,
                    }
                }
                Err(e) => warn!(error = %e, "body index encode failed, channel dropped"),
            }
        }
        if comp.cloud
            && self.ws.cloud.len() == self.mode.depth_size()
            && self.ws.valid_vertex_count > 0
        {
            let packed = pack_cloud(&self.ws.cloud, &self.ws.depth_vertex, self.ws.valid_vertex_count);
            frame.cloud = self.encode_lossless_values("cloud", packed);

            if self.ws.depth_sized_color.len() == self.mode.depth_size() * 4 {
                let (tiled, w, h) =
                    pack_cloud_colors(&self.ws.depth_sized_color, &self.ws.depth_vertex, self.ws.valid_vertex_count);
                match self
                    .codec
                    .encode_lossy_image(&tiled, w, h, 4, comp.jpeg_quality)
                {
                    Ok(data) => {
                        frame.cloud_color = EncodedChannel {
                            width: w,
                            height: h,
                            data,
                        }
                    }
                    Err(e) => warn!(error = %e, "cloud color encode failed, channel dropped"),
                }
            }
        }

        if settings.data.capture_imu {
            frame.imu = self.ws.imu;
        }
        if settings.data.capture_audio {
            frame.audio = self.ws.audio.clone();
        }
        if settings.data.capture_bodies {
            frame.bodies = self.ws.bodies.clone();
        }

        Some(frame)
    }

    fn encode_lossy(
        &mut self,
        channel: &'static str,
        width: u32,
        height: u32,
        quality: u8,
    ) -> EncodedChannel {
        let pixels = match channel {
            "color" => &self.ws.converted_color,
            _ => &self.ws.depth_sized_color,
        };
        match self.codec.encode_lossy_image(pixels, width, height, 4, quality) {
            Ok(data) => EncodedChannel {
                width,
                height,
                data,
            },
            Err(e) => {
                warn!(channel, error = %e, "lossy encode failed, channel dropped");
                EncodedChannel::default()
            }
        }
    }

    fn encode_lossless_channel(&mut self, channel: &'static str) -> EncodedChannel {
        let src = match channel {
            "depth" => &self.ws.depth,
            _ => &self.ws.infra,
        };
        let mut padded = Vec::with_capacity(padded_len(src.len()));
        padded.extend_from_slice(src);
        padded.resize(padded_len(src.len()), 0);
        self.encode_lossless_values(channel, padded)
    }

    fn encode_lossless_values(&mut self, channel: &'static str, mut values: Vec<u16>) -> EncodedChannel {
        values.resize(padded_len(values.len()), 0);
        match self.codec.encode_lossless_u16(&values) {
            Ok(data) => EncodedChannel {
                width: values.len() as u32,
                height: 1,
                data,
            },
            Err(e) => {
                warn!(channel, error = %e, "lossless encode failed, channel dropped");
                EncodedChannel::default()
            }
        }
    }
}

/// Thread driver pulling captures from a [`CaptureSource`]
pub struct CaptureLoop {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<CaptureOrchestrator>>,
}

impl CaptureLoop {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the capture thread; the orchestrator is handed back on [`stop`](Self::stop)
    pub fn start(
        &mut self,
        mut source: Box<dyn CaptureSource>,
        mut orchestrator: CaptureOrchestrator,
        read_timeout: Duration,
    ) -> CaptureResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::InvalidState("capture loop already running".into()));
        }

        info!(mode = ?orchestrator.mode(), "starting capture loop");
        let running = Arc::clone(&self.running);
        let handle = thread::spawn(move || {
            let epoch = Instant::now();
            while running.load(Ordering::SeqCst) {
                match source.read_capture(read_timeout) {
                    Ok(capture) => {
                        if let Err(e) = orchestrator.process_capture(capture, epoch.elapsed()) {
                            warn!(error = %e, "capture cycle failed");
                        }
                    }
                    Err(e) => {
                        // the counter still advances so consumers see the gap
                        orchestrator.mark_failed_capture();
                        warn!(error = %e, "device read failed");
                    }
                }
            }
            info!("capture loop stopped");
            orchestrator
        });
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the thread and return the orchestrator with its final state
    pub fn stop(&mut self) -> Option<CaptureOrchestrator> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return None;
        }
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Default for CaptureLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ColorResolution, DepthMode};
    use std::sync::mpsc;

    fn narrow_binned() -> ModeInfo {
        ModeInfo {
            depth_mode: DepthMode::NarrowBinned,
            color_resolution: ColorResolution::Off,
            ..Default::default()
        }
    }

    fn capture_for(mode: &ModeInfo, depth_value: u16, ts: Duration) -> RawCapture {
        RawCapture {
            depth: vec![depth_value; mode.depth_size()],
            cloud: vec![[0i16, 0, depth_value as i16]; mode.depth_size()],
            timestamp: ts,
            ..Default::default()
        }
    }

    #[test]
    fn test_cycle_emits_both_frames() {
        let mode = narrow_binned();
        let mut orch = CaptureOrchestrator::new(mode);
        let mut settings = SessionSettings::default();
        settings.filters.do_local_diff_filtering = false;
        orch.update_settings(settings);

        let (tx, rx) = mpsc::channel();
        orch.set_display_callback(Box::new(move |f| {
            tx.send((f.capture_id, f.cloud.vertices.len())).unwrap();
        }));
        let (ctx, crx) = mpsc::channel();
        orch.set_compressed_callback(Box::new(move |f| {
            ctx.send(f.valid_vertex_count).unwrap();
        }));

        let ts = Duration::from_millis(10);
        orch.process_capture(capture_for(&mode, 1000, ts), ts).unwrap();

        let (id, vertices) = rx.try_recv().unwrap();
        assert_eq!(id, 1);
        assert_eq!(vertices, mode.depth_size());
        assert_eq!(crx.try_recv().unwrap(), mode.depth_size());
    }

    #[test]
    fn test_delay_holds_frames() {
        let mode = narrow_binned();
        let mut orch = CaptureOrchestrator::new(mode);
        let mut settings = SessionSettings::default();
        settings.filters.do_local_diff_filtering = false;
        settings.data.delay_ms = 100;
        orch.update_settings(settings);

        let (tx, rx) = mpsc::channel();
        orch.set_display_callback(Box::new(move |f| {
            tx.send(f.capture_id).unwrap();
        }));

        let ts = Duration::from_millis(10);
        orch.process_capture(capture_for(&mode, 1000, ts), ts).unwrap();
        assert!(rx.try_recv().is_err());

        // a later capture pumps the queue past the delay
        let ts2 = Duration::from_millis(120);
        orch.process_capture(capture_for(&mode, 1000, ts2), ts2).unwrap();
        assert_eq!(rx.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_failed_capture_advances_id() {
        let mode = narrow_binned();
        let mut orch = CaptureOrchestrator::new(mode);
        orch.mark_failed_capture();
        let ts = Duration::from_millis(5);
        orch.process_capture(capture_for(&mode, 1000, ts), ts).unwrap();
        assert_eq!(orch.capture_id(), 2);
    }

    #[test]
    fn test_settings_swap_takes_effect_next_cycle() {
        let mode = narrow_binned();
        let mut orch = CaptureOrchestrator::new(mode);
        let mut settings = SessionSettings::default();
        settings.filters.do_local_diff_filtering = false;
        orch.update_settings(settings.clone());

        let (tx, rx) = mpsc::channel();
        orch.set_compressed_callback(Box::new(move |f| {
            tx.send(f.valid_vertex_count).unwrap();
        }));

        let ts = Duration::from_millis(10);
        orch.process_capture(capture_for(&mode, 1000, ts), ts).unwrap();
        assert_eq!(rx.try_recv().unwrap(), mode.depth_size());

        // crop away the left half through the shared handle
        settings.filters.min_width_f = 0.5;
        orch.update_settings(settings);
        let ts2 = Duration::from_millis(20);
        orch.process_capture(capture_for(&mode, 1000, ts2), ts2).unwrap();
        assert_eq!(rx.try_recv().unwrap(), mode.depth_size() / 2);
    }

    #[test]
    fn test_capture_rate_window() {
        let mode = narrow_binned();
        let mut orch = CaptureOrchestrator::new(mode);
        let mut settings = SessionSettings::default();
        settings.filters.do_local_diff_filtering = false;
        orch.update_settings(settings);

        for i in 0..10u64 {
            let ts = Duration::from_millis(i * 100);
            orch.process_capture(capture_for(&mode, 1000, ts), ts).unwrap();
        }
        // 10 captures inside a 5 s window
        assert!((orch.capture_rate() - 2.0).abs() < 0.01);
    }
}
