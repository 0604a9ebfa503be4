pub mod context;
pub mod markup;
pub mod schema;
