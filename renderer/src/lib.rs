pub mod error;
pub mod loader;
pub mod messages;
pub mod render;
pub mod resolver;
pub mod run;
pub mod scope;
pub mod value;

pub use error::{LoadError, RefKind, RenderError, ResolveError, RunError};
pub use loader::{FileSource, MemorySource, TemplateSource, load_template};
pub use messages::{DriverMessage, Generator};
pub use render::Renderer;
pub use resolver::{Resolve, Resolver};
pub use run::{DeliveryRun, SchemaVersion};
pub use value::Value;
