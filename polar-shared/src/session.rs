//! Cross-cycle state of the polling loop.
//!
//! One [`PollingSession`] owns everything that outlives a single fetch
//! cycle: the cycle counter, the in-flight marker, the displayed-frame
//! counter and the image reload generation. At most one cycle is in flight
//! at a time; results and timers belonging to an older cycle are dropped.

use crate::chart::{ChartAdapter, ChartWidget};
use crate::overlay::{OverlayRenderer, RenderError, Surface, STATUS_NOT_READY};
use crate::telemetry::{ImageDimensions, TelemetryFrame};
use crate::telemetry_client::TelemetryError;

/// Proof that a cycle was started; handed back to `finish_cycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTicket {
    id: u64,
}

/// Identifies one scheduled image reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadToken {
    generation: u64,
}

/// What the caller should do with a finished cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Render this frame
    Apply(TelemetryFrame),
    /// Show this status line; leave the overlay as it is
    Failed(String),
    /// Result of a superseded cycle; ignore it
    Stale,
}

#[derive(Debug, Default)]
pub struct PollingSession {
    cycles_started: u64,
    in_flight: Option<u64>,
    pending_refresh: bool,
    displayed_frames: u64,
    reload_generation: u64,
}

impl PollingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a cycle unless one is already running.
    pub fn try_begin_cycle(&mut self) -> Option<CycleTicket> {
        if let Some(id) = self.in_flight {
            log::debug!("cycle {id} still in flight, skipping tick");
            return None;
        }
        self.cycles_started += 1;
        self.in_flight = Some(self.cycles_started);
        // Reloads scheduled by earlier cycles are now obsolete.
        self.reload_generation += 1;
        log::debug!("starting cycle {}", self.cycles_started);
        Some(CycleTicket {
            id: self.cycles_started,
        })
    }

    /// Close the cycle `ticket` belongs to and classify its result.
    pub fn finish_cycle(
        &mut self,
        ticket: CycleTicket,
        result: Result<TelemetryFrame, TelemetryError>,
    ) -> CycleOutcome {
        if self.in_flight != Some(ticket.id) {
            log::debug!("dropping stale result of cycle {}", ticket.id);
            return CycleOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(frame) => CycleOutcome::Apply(frame),
            Err(e) => {
                log::warn!("cycle {} failed: {e}", ticket.id);
                CycleOutcome::Failed(e.status_line())
            }
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    // === Image reload ===

    pub fn schedule_reload(&mut self) -> ReloadToken {
        self.reload_generation += 1;
        ReloadToken {
            generation: self.reload_generation,
        }
    }

    /// True exactly once for the most recently scheduled reload, and only
    /// if no cycle started since it was scheduled.
    pub fn accept_reload(&mut self, token: ReloadToken) -> bool {
        if token.generation != self.reload_generation {
            return false;
        }
        self.reload_generation += 1;
        true
    }

    // === Settings hook ===

    /// Refresh now if idle, otherwise as soon as the running cycle ends.
    pub fn request_refresh(&mut self) -> Option<CycleTicket> {
        if self.is_in_flight() {
            self.pending_refresh = true;
            return None;
        }
        self.try_begin_cycle()
    }

    /// Consume a refresh queued while a cycle was running.
    pub fn take_pending_refresh(&mut self) -> bool {
        std::mem::take(&mut self.pending_refresh)
    }

    // === Status ===

    pub fn mark_displayed(&mut self) {
        self.displayed_frames += 1;
    }

    pub fn displayed_frames(&self) -> u64 {
        self.displayed_frames
    }

    /// Status panel text for an applied frame.
    pub fn status_line(&self, dims: ImageDimensions, status_text: &str) -> String {
        format!(
            "Dimensions: {}\nDisplayed Frame: {}\n{}",
            dims, self.displayed_frames, status_text
        )
    }

    pub fn not_ready_status() -> &'static str {
        STATUS_NOT_READY
    }

    /// Show an applied frame and return the status line for it.
    ///
    /// The overlay is drawn when a surface is available. The chart and
    /// status follow the frame either way; only an image of unknown size
    /// turns the status into the not-ready message.
    pub fn present<S, W>(
        &self,
        frame: &TelemetryFrame,
        dims: ImageDimensions,
        renderer: &OverlayRenderer,
        surface: Option<&mut S>,
        chart: &mut ChartAdapter,
        widget: &mut W,
    ) -> String
    where
        S: Surface + ?Sized,
        W: ChartWidget + ?Sized,
    {
        let mode = frame.render_mode();
        let drawn = match surface {
            Some(surface) => renderer.render(surface, &mode, dims).map(|outcome| {
                log::debug!("drew {} circles and {} lines", outcome.circles, outcome.lines);
            }),
            None if dims.is_ready() => {
                log::debug!("no overlay surface, updating chart and status only");
                Ok(())
            }
            None => Err(RenderError::NotReady),
        };

        if let Err(e) = drawn {
            log::debug!("{}: {e}", e.kind());
            return e.to_string();
        }
        chart.apply(widget, &mode);
        self.status_line(dims, &frame.status_text)
    }
}

#[cfg(test)]
impl PollingSession {
    /// Abandon the cycle in flight without a result.
    fn abort_cycle(&mut self) {
        self.in_flight = None;
    }

    fn cycles_started(&self) -> u64 {
        self.cycles_started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::tests::FakeChart;
    use crate::chart::ChartState;
    use crate::http_client::HttpClientError;
    use crate::overlay::tests::RecordingSurface;
    use crate::overlay::DrawOp;
    use crate::telemetry::{ProfileCurve, Star};

    fn frame(status: &str) -> TelemetryFrame {
        TelemetryFrame {
            status_text: status.into(),
            stars: vec![Star::new(10.0, 10.0, 2.0)],
            ..Default::default()
        }
    }

    fn transport_error() -> TelemetryError {
        TelemetryError::Transport(HttpClientError::Connection("refused".into()))
    }

    #[test]
    fn test_cycles_do_not_overlap() {
        let mut session = PollingSession::new();
        let ticket = session.try_begin_cycle().unwrap();
        assert!(session.try_begin_cycle().is_none());
        assert!(session.is_in_flight());

        assert_eq!(
            session.finish_cycle(ticket, Ok(frame("a"))),
            CycleOutcome::Apply(frame("a"))
        );
        assert!(!session.is_in_flight());
        assert!(session.try_begin_cycle().is_some());
        assert_eq!(session.cycles_started(), 2);
    }

    #[test]
    fn test_timed_out_cycle_frees_the_next_tick() {
        let mut session = PollingSession::new();
        let hung = session.try_begin_cycle().unwrap();
        for _ in 0..10 {
            assert!(session.try_begin_cycle().is_none());
        }

        let timeout = TelemetryError::Transport(HttpClientError::Timeout);
        assert_eq!(
            session.finish_cycle(hung, Err(timeout)),
            CycleOutcome::Failed("Connection to server failed: Timeout".into())
        );
        assert!(session.try_begin_cycle().is_some());
        assert_eq!(session.cycles_started(), 2);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut session = PollingSession::new();
        let old = session.try_begin_cycle().unwrap();
        session.abort_cycle();
        let current = session.try_begin_cycle().unwrap();

        assert_eq!(session.finish_cycle(old, Ok(frame("old"))), CycleOutcome::Stale);
        // The newer cycle is still in flight.
        assert!(session.is_in_flight());
        assert_eq!(
            session.finish_cycle(current, Ok(frame("new"))),
            CycleOutcome::Apply(frame("new"))
        );
        // Finishing twice is stale as well.
        assert_eq!(session.finish_cycle(current, Ok(frame("new"))), CycleOutcome::Stale);
    }

    #[test]
    fn test_transport_failure_keeps_overlay() {
        let mut session = PollingSession::new();
        let renderer = OverlayRenderer::new();
        let mut surface = RecordingSurface::default();
        let dims = ImageDimensions::new(64, 64);

        let ticket = session.try_begin_cycle().unwrap();
        if let CycleOutcome::Apply(frame) = session.finish_cycle(ticket, Ok(frame("ok"))) {
            renderer.render(&mut surface, &frame.render_mode(), dims).unwrap();
        }
        let drawn = surface.ops.clone();

        let ticket = session.try_begin_cycle().unwrap();
        let status = match session.finish_cycle(ticket, Err(transport_error())) {
            CycleOutcome::Failed(status) => status,
            other => panic!("expected failure, got {other:?}"),
        };

        assert_eq!(status, "Connection to server failed: Connection error: refused");
        assert_eq!(surface.ops, drawn);
        assert!(matches!(surface.visible()[1], DrawOp::Circle { .. }));
    }

    #[test]
    fn test_reload_from_older_cycle_is_ignored() {
        let mut session = PollingSession::new();
        let ticket = session.try_begin_cycle().unwrap();
        session.finish_cycle(ticket, Ok(frame("a")));
        let token = session.schedule_reload();

        // A new cycle starts before the timer fires.
        session.try_begin_cycle().unwrap();
        assert!(!session.accept_reload(token));
    }

    #[test]
    fn test_reload_accepted_once() {
        let mut session = PollingSession::new();
        let superseded = session.schedule_reload();
        let token = session.schedule_reload();

        assert!(!session.accept_reload(superseded));
        assert!(session.accept_reload(token));
        assert!(!session.accept_reload(token));
    }

    #[test]
    fn test_refresh_queues_while_in_flight() {
        let mut session = PollingSession::new();
        let ticket = session.try_begin_cycle().unwrap();

        assert!(session.request_refresh().is_none());
        session.finish_cycle(ticket, Ok(frame("a")));
        assert!(session.take_pending_refresh());
        assert!(!session.take_pending_refresh());

        // Idle: starts right away.
        assert!(session.request_refresh().is_some());
    }

    #[test]
    fn test_present_without_surface_still_updates_status_and_chart() {
        let mut session = PollingSession::new();
        session.mark_displayed();
        let profile = TelemetryFrame {
            status_text: "Seeing".into(),
            profile: ProfileCurve::from_flat(&[1.0, 2.0, 3.0, 4.0]),
            ..Default::default()
        };
        let mut adapter = ChartAdapter::new();
        let mut chart = FakeChart::default();

        let status = session.present(
            &profile,
            ImageDimensions::new(64, 48),
            &OverlayRenderer::new(),
            None::<&mut RecordingSurface>,
            &mut adapter,
            &mut chart,
        );

        assert_eq!(status, "Dimensions: 64x48\nDisplayed Frame: 1\nSeeing");
        assert!(chart.visible);
        assert_eq!(adapter.state(), ChartState::Showing { points: 2 });
    }

    #[test]
    fn test_present_draws_when_surface_is_mounted() {
        let session = PollingSession::new();
        let mut surface = RecordingSurface::default();
        let mut adapter = ChartAdapter::new();
        let mut chart = FakeChart::default();

        let status = session.present(
            &frame("Star count: 1"),
            ImageDimensions::new(64, 64),
            &OverlayRenderer::new(),
            Some(&mut surface),
            &mut adapter,
            &mut chart,
        );

        assert!(status.ends_with("Star count: 1"));
        assert!(matches!(surface.visible()[1], DrawOp::Circle { .. }));
        assert!(!chart.visible);
    }

    #[test]
    fn test_present_before_image_size_is_known() {
        let session = PollingSession::new();
        let mut adapter = ChartAdapter::new();
        let mut chart = FakeChart::default();

        for mut surface in [None, Some(RecordingSurface::default())] {
            let status = session.present(
                &frame("ignored"),
                ImageDimensions::default(),
                &OverlayRenderer::new(),
                surface.as_mut(),
                &mut adapter,
                &mut chart,
            );
            assert_eq!(status, PollingSession::not_ready_status());
            if let Some(surface) = surface {
                assert!(surface.ops.is_empty());
            }
        }
    }

    #[test]
    fn test_status_line() {
        let mut session = PollingSession::new();
        session.mark_displayed();
        session.mark_displayed();
        assert_eq!(
            session.status_line(ImageDimensions::new(640, 480), "Star count: 3"),
            "Dimensions: 640x480\nDisplayed Frame: 2\nStar count: 3"
        );
        assert_eq!(PollingSession::not_ready_status(), "Image not fully loaded yet!");
    }
}
