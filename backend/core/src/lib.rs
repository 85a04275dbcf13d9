pub mod clock;
pub mod error;
pub mod traits;

pub use clock::{add_saturating, Clock, ManualClock, SystemClock};
pub use error::MetronomeError;
pub use traits::{Service, TaskHandler, TaskRegistry, MAX_TASK_INTERVAL};
