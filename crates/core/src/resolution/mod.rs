pub mod engine;
pub mod states;

pub use engine::{Resolver, ResolverSettings, DEFAULT_MAX_RETRIES};
pub use states::{Resolution, ResolutionState};
