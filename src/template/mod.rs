//! Templating for card properties and agent prompts
//!
//! Card templates use plain `{{placeholder}}` tokens bound to fields of the
//! previous card's output; anything left unbound is stripped. The agent loop's
//! fixed prompt clauses are minijinja templates so they can be overridden
//! from config.
//!
//! # Example
//!
//! ```ignore
//! use cardflow::engine::{Field, OutputEnvelope};
//! use cardflow::template::{bind, resolve};
//!
//! let prev = OutputEnvelope::from_value("rust");
//! let query = resolve("about {{input}}{{missing}}", Some(&prev), &[bind("input", Field::Value)]);
//! assert_eq!(query, "about rust");
//! ```

mod errors;
mod prompts;
mod resolver;

pub use errors::TemplateError;
pub use prompts::AgentPrompts;
pub use resolver::{Binding, apply_binding, bind, resolve, strip_unresolved, substitute};
