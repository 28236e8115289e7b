pub mod checks;
pub mod fixture;
pub mod inspect;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use checks::{SMOKE_CHECKS, get_check, list_checks};
pub use fixture::Fixture;
pub use inspect::{RideInspection, inspect_ride};
pub use seeds::{SeedInfo, resolve_seed_inputs};
pub use tester::*;
