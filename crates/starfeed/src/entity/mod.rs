//! SeaORM entity definitions for the starfeed database schema.

pub mod prelude;
pub mod repo;
pub mod star;
pub mod user;
pub mod version;
