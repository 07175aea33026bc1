mod engagement_sets;
mod preferences;
mod schema;
mod types;

pub use preferences::LANGUAGE_KEY;
pub use schema::Database;
pub use types::DatabaseError;
