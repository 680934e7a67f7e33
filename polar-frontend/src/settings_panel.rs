//! Settings form generated from the settings table.

use std::collections::HashMap;

use polar_shared::geometry::{local_mean_sidereal_time, polaris_angle_from_lmst};
use polar_shared::{SettingEntry, SettingKind, SettingsTable};
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

const CALIBRATION_GROUP: &str = "Calibrate Telescope";

#[derive(Properties, PartialEq)]
pub struct SettingsPanelProps {
    pub table: SettingsTable,
    /// Key of the action currently running on the device
    pub running_action: Option<String>,
    /// `(key, raw value)` of a setting to apply
    pub on_apply: Callback<(String, String)>,
    /// Key of an action or download to run
    pub on_action: Callback<String>,
}

pub struct SettingsPanel {
    inputs: HashMap<String, NodeRef>,
}

pub enum Msg {
    Apply(String),
}

impl Component for SettingsPanel {
    type Message = Msg;
    type Properties = SettingsPanelProps;

    fn create(ctx: &Context<Self>) -> Self {
        let inputs = ctx
            .props()
            .table
            .entries()
            .iter()
            .filter(|e| !e.is_action())
            .map(|e| (e.key.clone(), NodeRef::default()))
            .collect();
        Self { inputs }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Apply(key) => {
                let props = ctx.props();
                let Some(entry) = props.table.get(&key) else {
                    log::warn!("apply for unknown setting {key}");
                    return false;
                };
                match self.read_input(entry) {
                    Some(value) if !value.is_empty() => props.on_apply.emit((key, value)),
                    _ => log::debug!("no input value for {key}"),
                }
                false
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let table = &ctx.props().table;
        html! {
            <div class="settings-panel">
                { for table.groups().into_iter().map(|group| html! {
                    <div class="settings-group">
                        <h2>{group}</h2>
                        { for table.in_group(group).map(|entry| self.view_entry(ctx, entry)) }
                        { if group == CALIBRATION_GROUP { Self::view_calibration_preview(table) } else { html! {} } }
                    </div>
                }) }
            </div>
        }
    }
}

impl SettingsPanel {
    fn read_input(&self, entry: &SettingEntry) -> Option<String> {
        let node = self.inputs.get(&entry.key)?;
        match entry.kind {
            SettingKind::Number { .. } => Some(node.cast::<HtmlInputElement>()?.value()),
            SettingKind::Mode { .. } => Some(node.cast::<HtmlSelectElement>()?.value()),
            SettingKind::Toggle => {
                let checked = node.cast::<HtmlInputElement>()?.checked();
                Some(if checked { "1" } else { "0" }.to_string())
            }
            SettingKind::Action | SettingKind::Download => None,
        }
    }

    fn view_entry(&self, ctx: &Context<Self>, entry: &SettingEntry) -> Html {
        let key = entry.key.clone();
        let apply = {
            let key = key.clone();
            ctx.link().callback(move |_: MouseEvent| Msg::Apply(key.clone()))
        };
        let node = self.inputs.get(&entry.key).cloned().unwrap_or_default();

        let control = match &entry.kind {
            SettingKind::Number { min, max, step } => {
                let onkeydown = {
                    let key = key.clone();
                    ctx.link().batch_callback(move |e: KeyboardEvent| {
                        (e.key() == "Enter").then(|| Msg::Apply(key.clone()))
                    })
                };
                let step = step.map(|s| s.to_string()).unwrap_or_else(|| "any".to_string());
                html! {
                    <>
                        <input
                            ref={node}
                            type="number"
                            autocomplete="off"
                            value={entry.value.clone()}
                            min={min.to_string()}
                            max={max.to_string()}
                            {step}
                            {onkeydown}
                        />
                        <button onclick={apply}>{"OK"}</button>
                    </>
                }
            }
            SettingKind::Mode { options } => {
                let selected: Option<usize> = entry.value.parse().ok();
                html! {
                    <>
                        <select ref={node} autocomplete="off">
                            { for options.iter().enumerate().map(|(i, option)| html! {
                                <option value={i.to_string()} selected={selected == Some(i)}>{option}</option>
                            }) }
                        </select>
                        <button onclick={apply}>{"OK"}</button>
                    </>
                }
            }
            SettingKind::Toggle => html! {
                <>
                    <input ref={node} type="checkbox" checked={entry.value == "1"} />
                    <button onclick={apply}>{"OK"}</button>
                </>
            },
            SettingKind::Action | SettingKind::Download => {
                let running = ctx.props().running_action.as_deref() == Some(entry.key.as_str());
                let onclick = {
                    let on_action = ctx.props().on_action.clone();
                    Callback::from(move |_: MouseEvent| on_action.emit(key.clone()))
                };
                html! {
                    <button class="actionbtn" disabled={running} {onclick}>
                        { if running { "Running..." } else { "Run" } }
                    </button>
                }
            }
        };

        html! {
            <div class="control-group">
                <label class="control-label">{&entry.label}</label>
                { control }
            </div>
        }
    }

    fn view_calibration_preview(table: &SettingsTable) -> Html {
        let radius = table
            .orbit_radius_px()
            .map(|px| format!("{px:.1} px"))
            .unwrap_or_else(|| "-".to_string());

        let angle = table
            .get("longitude")
            .and_then(SettingEntry::as_number)
            .map(|longitude| {
                let lmst = local_mean_sidereal_time(js_sys::Date::now() / 1000.0, longitude);
                format!("{:.1}° (LMST {lmst:.2} h)", polaris_angle_from_lmst(lmst))
            })
            .unwrap_or_else(|| "-".to_string());

        html! {
            <div class="info-item">
                <span class="info-label">{"Polaris orbit radius: "}</span>{radius}<br/>
                <span class="info-label">{"Polaris angle now: "}</span>{angle}
            </div>
        }
    }
}
