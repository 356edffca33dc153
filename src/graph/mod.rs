//! Graph representation module

pub mod builder;
pub mod compressed;
pub mod projection;

pub use builder::{GraphBuilder, IngestStats};
pub use compressed::{Direction, EdgeAttrs, Node, TransactionGraph};
pub use projection::UndirectedGraph;
