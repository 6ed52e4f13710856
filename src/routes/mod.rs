pub mod relay_routes;
pub mod store_routes;
