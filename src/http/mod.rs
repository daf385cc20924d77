pub mod exposition;
pub mod health;
pub mod routes;
pub mod version;
