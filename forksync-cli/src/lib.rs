pub mod app;
pub mod reconcile;
pub mod telemetry;
pub mod wiring;

pub use app::run as run_app;
