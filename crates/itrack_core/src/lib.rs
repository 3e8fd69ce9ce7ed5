pub mod db;
pub mod demo;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod query;
pub mod repo;
pub mod store;
pub mod validate;
