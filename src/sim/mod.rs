/// Asset parameters and dispatch policies.
pub mod assets;
/// Step counter for the simulation loop.
pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod kpi;
pub mod types;
