mod node;
mod traversal;

pub use node::SceneNode;
pub use traversal::{collect_parameters, node_path, walk};
