use polar_frontend::polar_app::PolarAppProps;
use polar_frontend::{console_log, PolarApp};
use polar_shared::PanelConfig;

fn main() {
    let window = web_sys::window().expect("no global `window` exists");
    let document = window.document().expect("should have a document on window");
    let root = document
        .get_element_by_id("app")
        .expect("page should have an #app element");

    // Logger first, so configuration warnings are not lost.
    let level = PanelConfig::log_level_from_attributes(|name| root.get_attribute(name));
    if console_log::init(level).is_err() {
        web_sys::console::warn_1(&"logger already installed".into());
    }
    let config = PanelConfig::from_attributes(|name| root.get_attribute(name));

    yew::Renderer::<PolarApp>::with_root_and_props(root, PolarAppProps { config }).render();
}
