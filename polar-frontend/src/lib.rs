pub mod canvas;
pub mod console_log;
pub mod line_chart;
pub mod polar_app;
pub mod settings_panel;

pub use polar_app::PolarApp;
