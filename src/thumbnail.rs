use crate::pipeline::{FrameGrabber, Prime, RawFrame};
use crate::timer::{TimerHandle, Timers};
use crate::Error;
use gstreamer as gst;
use std::path::{Path, PathBuf};

/// Number of frames sampled per opened file.
pub const THUMBNAIL_COUNT: u32 = 10;

/// Time of the `step`th sample: `(step + 1) * duration * 10 / 100`.
///
/// Samples land at 10%, 20%, ..., 100% of the duration.
pub fn sample_offset(step: u32, duration: gst::ClockTime) -> gst::ClockTime {
    let ns = (u128::from(step) + 1) * u128::from(duration.nseconds()) * 10 / 100;
    let max = u128::from(gst::ClockTime::MAX.nseconds());
    gst::ClockTime::from_nseconds(ns.min(max) as u64)
}

/// Packs a padded RGB frame into a PNG at `path`.
///
/// Rows are `width * 3` bytes rounded up to a multiple of four. The image is
/// written beside `path` first and renamed over it, so readers never see a
/// partial file.
pub fn write_thumbnail(data: &[u8], width: u32, height: u32, path: &Path) -> Result<(), Error> {
    let row = width as usize * 3;
    // rows are 4-byte aligned
    let stride = row.div_ceil(4) * 4;
    let expected = if height == 0 {
        0
    } else {
        stride * (height as usize - 1) + row
    };
    if width == 0 || height == 0 || data.len() < expected {
        return Err(Error::FrameSize {
            expected,
            actual: data.len(),
        });
    }

    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        pixels.extend_from_slice(&data[y * stride..y * stride + row]);
    }
    let image = image::RgbImage::from_raw(width, height, pixels).ok_or(Error::FrameSize {
        expected,
        actual: data.len(),
    })?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".part");
    let staging = PathBuf::from(staging);
    let written = image
        .save_with_format(&staging, image::ImageFormat::Png)
        .map_err(Error::from)
        .and_then(|()| std::fs::rename(&staging, path).map_err(Error::from));
    if written.is_err() && staging.exists() {
        if let Err(err) = std::fs::remove_file(&staging) {
            log::warn!("failed to remove {}: {err}", staging.display());
        }
    }
    written
}

/// One extraction run over a source, on its own pipeline.
///
/// The grabber is released once the last step ran or the job is dropped.
pub struct ThumbnailJob<G: FrameGrabber> {
    uri: url::Url,
    grabber: Option<G>,
    duration: gst::ClockTime,
    step: u32,
    output: PathBuf,
    timer: Option<TimerHandle>,
}

impl<G: FrameGrabber> ThumbnailJob<G> {
    /// Prerolls `grabber` and measures the duration on it.
    ///
    /// Fails for live sources and for pipelines that cannot preroll; the
    /// grabber is dropped with the error.
    pub fn start(mut grabber: G, uri: url::Url, output: PathBuf) -> Result<Self, Error> {
        if grabber.prime()? == Prime::Live {
            return Err(Error::LiveSource);
        }
        let duration = grabber.query_duration().ok_or(Error::Duration)?;
        log::debug!("thumbnail job for {uri}: duration {duration}");

        Ok(ThumbnailJob {
            uri,
            grabber: Some(grabber),
            duration,
            step: 0,
            output,
            timer: None,
        })
    }

    pub fn uri(&self) -> &url::Url {
        &self.uri
    }

    pub fn duration(&self) -> gst::ClockTime {
        self.duration
    }

    /// Index of the next step to run.
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.grabber.is_none()
    }

    pub(crate) fn arm(&mut self, timer: TimerHandle) {
        self.timer = Some(timer);
    }

    pub(crate) fn owns(&self, timer: TimerHandle) -> bool {
        self.timer == Some(timer)
    }

    /// Disarms the step timer and releases the grabber. Idempotent.
    pub fn cancel(&mut self, timers: &mut dyn Timers) {
        if let Some(timer) = self.timer.take() {
            timers.cancel(timer);
        }
        self.release();
    }

    /// Samples the next frame and writes it over the output image.
    ///
    /// Returns the image path when a thumbnail was written. Failed steps are
    /// logged and skipped; the job finishes after [`THUMBNAIL_COUNT`] steps.
    pub fn advance(&mut self) -> Option<&Path> {
        let grabber = self.grabber.as_mut()?;
        let step = self.step;
        self.step += 1;

        let target = sample_offset(step, self.duration);
        let written = match grabber.seek(target) {
            Ok(()) => match grabber.pull_frame() {
                Some(frame) => store(&frame, step, &self.output),
                None => {
                    log::warn!("thumbnail {step}: no sample at {target}");
                    false
                }
            },
            Err(err) => {
                log::warn!("thumbnail {step}: seek to {target} rejected: {err}");
                false
            }
        };

        if self.step >= THUMBNAIL_COUNT {
            log::debug!("thumbnail job for {} finished", self.uri);
            self.release();
        }

        written.then_some(self.output.as_path())
    }

    fn release(&mut self) {
        if self.grabber.take().is_some() {
            log::trace!("released thumbnail pipeline for {}", self.uri);
        }
    }
}

fn store(frame: &RawFrame, step: u32, output: &Path) -> bool {
    let Some((width, height)) = frame.size else {
        log::warn!("thumbnail {step}: sample has no readable frame size");
        return false;
    };
    match write_thumbnail(&frame.data, width, height, output) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("failed to write thumbnail {step}: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{frame, FakeBackend, FakeTimers, PrimeScript};
    use crate::{Backend, Task, Timers};
    use std::time::Duration;

    fn uri() -> url::Url {
        url::Url::parse("file:///clip.mp4").unwrap()
    }

    fn job(backend: &mut FakeBackend, output: PathBuf) -> ThumbnailJob<crate::testing::FakeGrabber> {
        let grabber = backend.frame_grabber(&uri()).unwrap();
        ThumbnailJob::start(grabber, uri(), output).unwrap()
    }

    #[test]
    fn offsets_cover_ten_to_hundred_percent() {
        let duration = gst::ClockTime::from_seconds(120);
        let offsets: Vec<_> = (0..THUMBNAIL_COUNT)
            .map(|step| sample_offset(step, duration).seconds())
            .collect();
        assert_eq!(offsets, vec![12, 24, 36, 48, 60, 72, 84, 96, 108, 120]);
    }

    #[test]
    fn offsets_do_not_overflow() {
        let duration = gst::ClockTime::from_nseconds(u64::MAX / 2);
        assert_eq!(sample_offset(9, duration), duration);
    }

    #[test]
    fn writes_png_with_stride_padding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        let frame = frame();

        write_thumbnail(&frame.data, 2, 2, &path).unwrap();

        let image = image::open(&path).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 255, 0]);
        assert_eq!(image.get_pixel(0, 1).0, [0, 0, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255]);
        assert!(!dir.path().join("thumb.png.part").exists());
    }

    #[test]
    fn short_buffer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        let err = write_thumbnail(&[0; 10], 2, 2, &path).unwrap_err();
        assert!(matches!(
            err,
            Error::FrameSize {
                expected: 14,
                actual: 10
            }
        ));
        assert!(!path.exists());
    }

    #[test]
    fn failed_replace_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        // a non-empty directory cannot be replaced by a file
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let err = write_thumbnail(&frame().data, 2, 2, &path).unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!dir.path().join("thumb.png.part").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn ten_steps_then_release() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("thumb.png");
        let mut backend = FakeBackend::default();
        let mut job = job(&mut backend, output.clone());

        let mut written = 0;
        while !job.is_finished() {
            if let Some(path) = job.advance() {
                assert_eq!(path, output.as_path());
                written += 1;
            }
        }

        assert_eq!(written, THUMBNAIL_COUNT);
        assert_eq!(job.advance(), None);
        let script = backend.script.borrow();
        assert_eq!(script.live_grabbers, 0);
        assert_eq!(
            script.grabber_seeks,
            (0..THUMBNAIL_COUNT)
                .map(|step| sample_offset(step, gst::ClockTime::from_seconds(120)))
                .collect::<Vec<_>>()
        );
        assert!(output.exists());
    }

    #[test]
    fn missing_sample_or_caps_skips_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("thumb.png");
        let mut backend = FakeBackend::default();
        {
            let mut script = backend.script.borrow_mut();
            script.frames.push_back(None);
            script.frames.push_back(Some(RawFrame {
                data: frame().data,
                size: None,
            }));
        }
        let mut job = job(&mut backend, output);

        assert!(job.advance().is_none());
        assert!(job.advance().is_none());
        assert!(job.advance().is_some());
        assert_eq!(job.step(), 3);
        assert!(!job.is_finished());
    }

    #[test]
    fn live_source_aborts() {
        let mut backend = FakeBackend::default();
        backend.script.borrow_mut().grabber_prime = PrimeScript::Live;
        let grabber = backend.frame_grabber(&uri()).unwrap();

        let result = ThumbnailJob::start(grabber, uri(), PathBuf::from("unused.png"));
        assert!(matches!(result, Err(Error::LiveSource)));
        assert_eq!(backend.script.borrow().live_grabbers, 0);
    }

    #[test]
    fn failed_preroll_aborts() {
        let mut backend = FakeBackend::default();
        backend.script.borrow_mut().grabber_prime = PrimeScript::Fail;
        let grabber = backend.frame_grabber(&uri()).unwrap();

        assert!(ThumbnailJob::start(grabber, uri(), PathBuf::from("unused.png")).is_err());
        assert_eq!(backend.script.borrow().live_grabbers, 0);
    }

    #[test]
    fn unknown_duration_aborts() {
        let mut backend = FakeBackend::default();
        backend.script.borrow_mut().grabber_duration = None;
        let grabber = backend.frame_grabber(&uri()).unwrap();

        let result = ThumbnailJob::start(grabber, uri(), PathBuf::from("unused.png"));
        assert!(matches!(result, Err(Error::Duration)));
    }

    #[test]
    fn cancel_releases_and_disarms_once() {
        let mut backend = FakeBackend::default();
        let mut timers = FakeTimers::default();
        let mut job = job(&mut backend, PathBuf::from("unused.png"));
        let handle = timers.start(Task::ThumbnailStep, Duration::from_secs(1));
        job.arm(handle);

        job.cancel(&mut timers);
        job.cancel(&mut timers);

        assert!(job.is_finished());
        assert!(!job.owns(handle));
        assert_eq!(timers.log.borrow().cancelled, vec![handle]);
        assert_eq!(backend.script.borrow().live_grabbers, 0);
    }
}
