pub mod column;
pub mod dates;
pub mod engine;
pub mod record;
pub mod transforms;
pub mod unique;
pub mod value;

pub use column::RunState;
pub use engine::{synthesize, synthesize_document, SynthesisOptions, SynthesisResult};
pub use transforms::Transform;
pub use unique::UniquenessRegistry;
pub use value::{Record, Value};
