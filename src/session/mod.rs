pub mod controller;
pub mod state;

pub use controller::WorkoutController;
pub use state::{AnalysisState, EngineSnapshot, EngineState, LifecyclePhase, RepState};
