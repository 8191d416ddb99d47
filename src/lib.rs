pub mod applier;
pub mod autowire;
pub mod batch;
pub mod cli;
pub mod components;
pub mod config;
pub mod copilot;
pub mod directive;
pub mod ecs;
pub mod error;
pub mod events;
pub mod intent;
pub mod material_registry;
pub mod prefab;
pub mod project;
pub mod resolver;
pub mod scene;
pub mod scene_summary;
pub mod undo;
pub mod value;

pub use applier::{ApprovalGate, AutoApprove, DenyAll};
pub use copilot::Copilot;
pub use directive::{Directive, DirectiveExtractor};
pub use error::{DirectiveError, DirectiveResult};
pub use events::{MessageKind, SystemMessage};
pub use intent::{CreationIntentParser, PrimitiveRequest, PrimitiveShape};
