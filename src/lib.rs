use config::Config;
use coordinator::CoordinatorHandle;
use database::{LocationRepository, MapCenterStore};

pub mod common;
pub mod config;
pub mod coordinator;
pub mod database;
pub mod error;
pub mod middleware;
pub mod search;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub repository: LocationRepository,
    pub map_center: MapCenterStore,
    pub coordinator: CoordinatorHandle,
    pub config: Config,
}
