pub mod get;
pub mod list;

pub use get::{GetVehicleError, GetVehicleQuery};
pub use list::{ListVehiclesError, ListVehiclesQuery, VehicleListItem};
