pub mod common;
pub mod community;
pub mod pathfinding;
pub mod reachability;

pub use common::{GraphView, NodeId};
pub use community::{strongly_connected_components, SccResult};
pub use pathfinding::{bfs, PathResult};
pub use reachability::{reachable_paths, ReachPath};
