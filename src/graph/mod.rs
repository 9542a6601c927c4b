//! Workflow graph model
//!
//! Cards (typed nodes with a property bag) and connections (directed edges
//! between ports), plus the lookups the walker relies on.
//!
//! # Example
//!
//! ```ignore
//! use cardflow::graph::{Card, CardType, Graph};
//!
//! let graph = Graph::new()
//!     .with_card(Card::new("s", CardType::Start))
//!     .with_card(Card::new("e", CardType::End))
//!     .with_connection("s", "e");
//!
//! assert!(graph.validate().is_valid());
//! ```

mod card;
mod connection;
mod model;

pub use card::{Card, CardType};
pub use connection::Connection;
pub use model::Graph;
