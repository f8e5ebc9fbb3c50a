// Multi-stage weather pipeline: resolution, location, fetch, normalize, load

pub mod fetch;
pub mod geo;
pub mod loader;
pub mod locate;
pub mod normalize;
pub mod runner;
pub mod storage;
