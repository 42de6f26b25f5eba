pub mod list;

pub use list::{ListMakesError, ListMakesQuery, MakeListItem};
