mod factory;
mod lister;

pub use self::factory::{DeviceFactory, SelectorMismatchPolicy};
pub use self::lister::{DeviceLister, DeviceSummary};
