mod naming;
mod platform;
mod run;
mod test_set;

pub use naming::{connector_name, NameSalt};
pub use platform::CloudPlatform;
pub use run::RunPhase;
pub use test_set::TestSet;
