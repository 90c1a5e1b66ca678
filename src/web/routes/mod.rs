pub mod health_routes;
pub mod metrics_routes;
pub mod replication_routes;
