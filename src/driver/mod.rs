pub mod dry_run;
pub mod traits;

use anyhow::Result;

pub use dry_run::DryRunDriver;
pub use traits::BrowserDriver;

/// Names accepted by [`create_driver`].
pub const DRIVER_NAMES: &[&str] = &["dry-run"];

/// Create the driver registered under `name`.
pub fn create_driver(name: &str) -> Result<Box<dyn BrowserDriver>> {
    match name {
        "dry-run" => Ok(Box::new(DryRunDriver::new())),
        _ => {
            anyhow::bail!(
                "Unknown driver: {} (available: {})",
                name,
                DRIVER_NAMES.join(", ")
            );
        }
    }
}
