mod accessor;
mod best_effort;
mod classifier;
mod value;

pub use self::accessor::{ControlAccessor, ControlRanges, ControlValues};
pub use self::classifier::{CapabilityFlags, CapabilityTable, ControlClassifier};
pub use self::value::{ControlRange, ControlValue};
