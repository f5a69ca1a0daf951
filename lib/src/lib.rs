//! Backend for storing and querying images tagged with geographic
//! coordinates.
//!
//! Uploaded bytes land in the *content store* (a plain directory served
//! under `/static`), while image metadata goes to the *metadata store*, an
//! embedded database selected through cargo features (`sled` by default,
//! `redb` as an alternative).

#[macro_use]
extern crate serde_derive;

pub mod api;
pub mod axum;
pub mod config;
pub mod db;
pub mod error;
pub mod gallery;
pub mod geo;
pub mod image;
pub mod routes;
pub mod tracing;

pub use self::config::Config;
pub use self::db::{Database, Store};
pub use self::error::{Error, ErrorKind, Result};
pub use self::gallery::{Health, Upload};
pub use self::geo::BoundingBox;
pub use self::image::{ImageId, ImageRecord};
