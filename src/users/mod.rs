mod lookup;
mod repo;
mod repo_types;

pub use lookup::Lookup;
pub use repo_types::{User, UserSummary};
