pub mod filter;
pub mod region;

pub use filter::{compute_required_clicks, FilterNavigator, FilterOutcome, FilterTarget, ToggleState};
pub use region::RegionSelector;
