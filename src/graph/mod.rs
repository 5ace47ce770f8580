// Search Graph Module
// StateGraph runtime and the four-step search pipeline

pub mod builder;
pub mod node;
pub mod nodes;
pub mod runtime;
pub mod state;

pub use builder::build_search_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use nodes::{extract_answer, format_report};
pub use runtime::GraphRuntime;
pub use state::SearchState;
