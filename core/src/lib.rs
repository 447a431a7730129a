pub mod cli;
pub mod clock;
pub mod config;
pub mod driver;
pub mod host;
pub mod script;

// Re-export main types
pub use clock::{HostClock, ManualClock, SystemClock, WakeMode, WakeRequest};
pub use config::Config;
pub use host::{
    ContinuationId, DrainPolicy, ErrorReport, ErrorReporter, HostBuilder, HostEvent, Outcome,
    ScriptHost, ScriptPlugin, TickReport,
};
pub use script::{ErrorInfo, Val};
