//! Page controller: polling loop, live image, overlay, chart and settings.

use gloo_timers::callback::{Interval, Timeout};
use gloo_timers::future::TimeoutFuture;
use polar_shared::config::download_file_name;
use polar_shared::{
    CadencePolicy, ChartAdapter, CycleOutcome, CycleTicket, ImageDimensions, OverlayRenderer,
    PanelConfig, PollingSession, ReloadToken, SettingKind, SettingsError, SettingsTable,
    TelemetryClient, TelemetryError, TelemetryFrame, ViewportController,
};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlAnchorElement, HtmlImageElement};
use yew::prelude::*;

use crate::canvas::CanvasSurface;
use crate::line_chart::LineChart;
use crate::settings_panel::SettingsPanel;

const IMAGE_RETRY_BASE_MS: u32 = 100;
const IMAGE_RETRY_MAX_MS: u32 = 10_000;

#[derive(Properties, PartialEq)]
pub struct PolarAppProps {
    pub config: PanelConfig,
}

pub struct PolarApp {
    client: TelemetryClient,
    session: PollingSession,
    renderer: OverlayRenderer,
    chart_adapter: ChartAdapter,
    line_chart: LineChart,
    viewport: ViewportController,
    settings: SettingsTable,

    image_url: String,
    image_dims: ImageDimensions,
    image_failure_count: u32,
    status: String,
    message: Option<String>,
    running_action: Option<String>,

    viewport_ref: NodeRef,
    image_ref: NodeRef,
    overlay_ref: NodeRef,

    poll_handle: Option<Interval>,
    reload_handle: Option<Timeout>,
}

pub enum Msg {
    Poll,
    FrameFetched(CycleTicket, Result<TelemetryFrame, TelemetryError>),
    ReloadImage(ReloadToken),
    ImageLoaded,
    ImageError,
    PointerDown(f64, f64),
    PointerMove(f64, f64),
    PointerUp,
    Wheel(f64, f64, f64),
    ApplySetting(String, String),
    SettingApplied(String, Result<String, SettingsError>),
    RunAction(String),
    ActionFinished(String, Result<String, SettingsError>),
}

impl Component for PolarApp {
    type Message = Msg;
    type Properties = PolarAppProps;

    fn create(ctx: &Context<Self>) -> Self {
        let config = &ctx.props().config;

        let poll_handle = match config.cadence {
            CadencePolicy::FixedInterval { period_ms } => {
                let link = ctx.link().clone();
                Some(Interval::new(period_ms, move || {
                    link.send_message(Msg::Poll);
                }))
            }
            // Image loads drive the cycle.
            CadencePolicy::ImageChained { .. } => None,
        };

        let mut settings = SettingsTable::default();
        let applied = settings.apply_overrides(&config.settings);
        log::info!(
            "panel starting: {:?} encoding, {:?}, {applied} setting values from page",
            config.encoding,
            config.cadence
        );

        Self {
            client: TelemetryClient::new(&config.base_url, config.encoding),
            session: PollingSession::new(),
            renderer: OverlayRenderer::new(),
            chart_adapter: ChartAdapter::new(),
            line_chart: LineChart::new(NodeRef::default()),
            viewport: ViewportController::default(),
            settings,
            image_url: config.image_request_url(now_ms()),
            image_dims: ImageDimensions::default(),
            image_failure_count: 0,
            status: PollingSession::not_ready_status().to_string(),
            message: None,
            running_action: None,
            viewport_ref: NodeRef::default(),
            image_ref: NodeRef::default(),
            overlay_ref: NodeRef::default(),
            poll_handle,
            reload_handle: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Poll => {
                if let Some(ticket) = self.session.try_begin_cycle() {
                    self.spawn_fetch(ctx, ticket);
                }
                false
            }
            Msg::FrameFetched(ticket, result) => {
                let changed = match self.session.finish_cycle(ticket, result) {
                    CycleOutcome::Apply(frame) => {
                        self.apply_frame(&frame);
                        true
                    }
                    CycleOutcome::Failed(status) => {
                        self.status = status;
                        true
                    }
                    CycleOutcome::Stale => return false,
                };

                if self.session.take_pending_refresh() {
                    ctx.link().send_message(Msg::Poll);
                }
                self.schedule_reload(ctx, ctx.props().config.cadence.reload_delay_ms());
                changed
            }
            Msg::ReloadImage(token) => {
                if !self.session.accept_reload(token) {
                    return false;
                }
                self.image_url = ctx.props().config.image_request_url(now_ms());
                true
            }
            Msg::ImageLoaded => {
                self.image_failure_count = 0;
                self.session.mark_displayed();

                if let Some(img) = self.image_ref.cast::<HtmlImageElement>() {
                    let dims = ImageDimensions::new(img.natural_width(), img.natural_height());
                    if dims != self.image_dims {
                        log::info!("image size changed to {dims}");
                        self.image_dims = dims;
                        self.fit_viewport();
                    }
                }

                if ctx.props().config.cadence.is_image_chained() {
                    ctx.link().send_message(Msg::Poll);
                }
                true
            }
            Msg::ImageError => {
                self.image_failure_count += 1;
                let delay = calculate_backoff_delay(
                    self.image_failure_count,
                    IMAGE_RETRY_BASE_MS,
                    IMAGE_RETRY_MAX_MS,
                );
                log::warn!(
                    "image failed to load ({} in a row), retrying in {delay} ms",
                    self.image_failure_count
                );
                // Only chained polling depends on the image to keep going.
                if ctx.props().config.cadence.is_image_chained() && !self.session.is_in_flight() {
                    self.schedule_reload(ctx, delay);
                }
                false
            }
            Msg::PointerDown(x, y) => {
                self.viewport.begin_pan(x, y);
                false
            }
            Msg::PointerMove(x, y) => {
                if !self.viewport.is_panning() {
                    return false;
                }
                self.viewport.pan(x, y);
                true
            }
            Msg::PointerUp => {
                self.viewport.end_pan();
                false
            }
            Msg::Wheel(x, y, delta) => self.viewport.zoom(x, y, delta),
            Msg::ApplySetting(key, value) => {
                let Some(entry) = self.settings.get(&key).cloned() else {
                    return false;
                };
                let client = self.client.clone();
                let link = ctx.link().clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let result = client.apply_setting(&entry, &value).await;
                    link.send_message(Msg::SettingApplied(entry.key, result));
                });
                false
            }
            Msg::SettingApplied(key, result) => {
                match result {
                    Ok(value) => {
                        log::info!("{key} set to {value}");
                        if let Err(e) = self.settings.set_value(&key, &value) {
                            log::warn!("{e}");
                        }
                        self.message = None;
                        if let Some(ticket) = self.session.request_refresh() {
                            self.spawn_fetch(ctx, ticket);
                        }
                    }
                    Err(e) => {
                        log::warn!("{key} not applied: {e}");
                        self.message = Some(e.to_string());
                    }
                }
                true
            }
            Msg::RunAction(key) => {
                let Some(entry) = self.settings.get(&key).cloned() else {
                    return false;
                };
                if entry.kind == SettingKind::Download {
                    self.download_full_image(ctx);
                    return false;
                }
                if self.running_action.is_some() {
                    return false;
                }

                self.running_action = Some(key);
                let client = self.client.clone();
                let link = ctx.link().clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let result = client.call_action(&entry).await;
                    link.send_message(Msg::ActionFinished(entry.key, result));
                });
                true
            }
            Msg::ActionFinished(key, result) => {
                self.running_action = None;
                self.message = Some(match result {
                    Ok(message) => message,
                    Err(e) => {
                        log::warn!("{key} failed: {e}");
                        e.to_string()
                    }
                });
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();

        let onmousedown = {
            let viewport_ref = self.viewport_ref.clone();
            link.callback(move |e: MouseEvent| {
                let (x, y) = local_position(&viewport_ref, &e);
                Msg::PointerDown(x, y)
            })
        };
        let onmousemove = {
            let viewport_ref = self.viewport_ref.clone();
            link.callback(move |e: MouseEvent| {
                let (x, y) = local_position(&viewport_ref, &e);
                Msg::PointerMove(x, y)
            })
        };
        let onwheel = {
            let viewport_ref = self.viewport_ref.clone();
            link.callback(move |e: WheelEvent| {
                e.prevent_default();
                let (x, y) = local_position(&viewport_ref, &e);
                Msg::Wheel(x, y, e.delta_y())
            })
        };

        let stage_style = format!(
            "position: relative; transform-origin: 0 0; transform: {};",
            self.viewport.css_transform()
        );

        html! {
            <div class="polar-panel">
                <div
                    class="viewport"
                    ref={self.viewport_ref.clone()}
                    style="position: relative; overflow: hidden; width: 100%; height: 100vh;"
                    {onmousedown}
                    {onmousemove}
                    onmouseup={link.callback(|_| Msg::PointerUp)}
                    onmouseleave={link.callback(|_| Msg::PointerUp)}
                    {onwheel}
                >
                    <div class="stage" style={stage_style}>
                        <img
                            ref={self.image_ref.clone()}
                            src={self.image_url.clone()}
                            alt="Live image"
                            draggable="false"
                            style="display: block;"
                            onload={link.callback(|_| Msg::ImageLoaded)}
                            onerror={link.callback(|_| Msg::ImageError)}
                        />
                        <canvas
                            ref={self.overlay_ref.clone()}
                            class="overlay"
                            style="position: absolute; left: 0; top: 0; pointer-events: none;"
                        />
                    </div>
                </div>

                <div class="side-panel">
                    <pre id="status" class="status">{&self.status}</pre>
                    <canvas
                        ref={self.line_chart.node().clone()}
                        class="chart"
                        width="640"
                        height="320"
                        style="display: none;"
                    />
                    { self.view_message() }
                    <SettingsPanel
                        table={self.settings.clone()}
                        running_action={self.running_action.clone()}
                        on_apply={link.callback(|(key, value): (String, String)| {
                            Msg::ApplySetting(key, value)
                        })}
                        on_action={link.callback(Msg::RunAction)}
                    />
                </div>
            </div>
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.poll_handle = None;
        self.reload_handle = None;
    }
}

impl PolarApp {
    fn spawn_fetch(&self, ctx: &Context<Self>, ticket: CycleTicket) {
        let client = self.client.clone();
        let link = ctx.link().clone();
        let timeout_ms = ctx.props().config.fetch_timeout_ms;
        wasm_bindgen_futures::spawn_local(async move {
            let result = client
                .fetch_frame_until(TimeoutFuture::new(timeout_ms))
                .await;
            link.send_message(Msg::FrameFetched(ticket, result));
        });
    }

    /// Draw one frame onto the overlay and chart.
    fn apply_frame(&mut self, frame: &TelemetryFrame) {
        let mut surface = CanvasSurface::from_node(&self.overlay_ref);
        self.status = self.session.present(
            frame,
            self.image_dims,
            &self.renderer,
            surface.as_mut(),
            &mut self.chart_adapter,
            &mut self.line_chart,
        );
    }

    fn schedule_reload(&mut self, ctx: &Context<Self>, delay_ms: u32) {
        let token = self.session.schedule_reload();
        let link = ctx.link().clone();
        self.reload_handle = Some(Timeout::new(delay_ms, move || {
            link.send_message(Msg::ReloadImage(token));
        }));
    }

    fn fit_viewport(&mut self) {
        let Some(container) = self.viewport_ref.cast::<Element>() else {
            return;
        };
        let rect = container.get_bounding_client_rect();
        self.viewport
            .fit(rect.width(), rect.height(), self.image_dims);
    }

    fn download_full_image(&self, ctx: &Context<Self>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let anchor = match document
            .create_element("a")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok())
        {
            Some(a) => a,
            None => return,
        };

        let today = js_sys::Date::new_0();
        anchor.set_href(&ctx.props().config.download_url(now_ms()));
        anchor.set_download(&download_file_name(
            today.get_date(),
            today.get_month() + 1,
            today.get_full_year() as i32,
        ));
        anchor.click();
    }

    fn view_message(&self) -> Html {
        match &self.message {
            Some(message) => html! { <div class="message">{message}</div> },
            None => html! {},
        }
    }
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

/// Pointer position relative to the viewport's untransformed box.
fn local_position(viewport_ref: &NodeRef, e: &MouseEvent) -> (f64, f64) {
    let (left, top) = viewport_ref
        .cast::<Element>()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (rect.left(), rect.top())
        })
        .unwrap_or((0.0, 0.0));
    (e.client_x() as f64 - left, e.client_y() as f64 - top)
}

fn calculate_backoff_delay(failure_count: u32, base_delay: u32, max_delay: u32) -> u32 {
    if failure_count == 0 {
        base_delay
    } else {
        let exponential_delay = base_delay.saturating_mul(2_u32.pow(failure_count.min(10)));
        exponential_delay.min(max_delay)
    }
}
