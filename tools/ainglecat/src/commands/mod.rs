pub mod count;
pub mod dump;
pub mod fromjson;
pub mod meta;
pub mod schema;
