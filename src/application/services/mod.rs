pub mod adaptive;
pub mod alerts;
pub mod degradation;
pub mod early_warning;
pub mod governor;
pub mod probes;
pub mod sampler;
pub mod scheduler;
pub mod subprocess;
pub mod supervisor;
pub mod task;
pub mod timeout;
