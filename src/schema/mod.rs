mod field;
mod table;
mod validator;

pub use field::{BqType, Field, FieldMode};
pub use table::Schema;
pub use validator::{SchemaValidator, ValidationRules, NAMING_CONVENTION};
