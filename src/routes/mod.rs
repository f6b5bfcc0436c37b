pub mod auth;
pub mod posts;
pub mod tags;
pub mod users;
