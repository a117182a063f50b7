pub mod load;
pub mod types;

pub use load::{load_profile, load_profile_str};
pub use types::{
    AnchorStrategy, ColumnKind, ColumnSpec, DependencyColumn, DependencySpec, ForeignKeyRef,
    KeyType, SchemaProfile, TableSpec,
};
