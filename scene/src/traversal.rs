use std::{collections::HashSet, sync::Arc};

use autodiff::ParameterSet;
use log::debug;

use crate::SceneNode;

/// Ids of this form are generated from an object's address and carry no meaning.
const ANONYMOUS_ID_MARKER: &str = "[0x";

/// Builds the path of `node` below `parent`, e.g. `/Scene/BSDF[id="floor"]/`.
pub fn node_path(parent: &str, node: &dyn SceneNode) -> String {
    let mut path = format!("{parent}{}", node.type_name());

    if let Some(id) = node
        .id()
        .filter(|id| !id.is_empty() && !id.contains(ANONYMOUS_ID_MARKER))
    {
        path.push_str(&format!("[id=\"{id}\"]"));
    }

    path.push('/');
    path
}

/// Visits every node reachable from `root` depth-first, exactly once.
///
/// # Arguments
/// * `root` - The node to start from, its path is `/<type>/`.
/// * `visit` - Called with the path and the node, parents before children.
pub fn walk<F>(root: &Arc<dyn SceneNode>, mut visit: F)
where
    F: FnMut(&str, &dyn SceneNode),
{
    let mut visited = HashSet::new();
    walk_from("/", root, &mut visited, &mut visit);
}

fn walk_from<F>(
    parent: &str,
    node: &Arc<dyn SceneNode>,
    visited: &mut HashSet<*const ()>,
    visit: &mut F,
) where
    F: FnMut(&str, &dyn SceneNode),
{
    if !visited.insert(Arc::as_ptr(node) as *const ()) {
        return;
    }

    let path = node_path(parent, node.as_ref());
    visit(&path, node.as_ref());

    for child in node.children() {
        walk_from(&path, child, visited, visit);
    }
}

/// Collects the differentiable parameters of every node reachable from `root`.
///
/// Each parameter is registered under the path of the node that owns it.
pub fn collect_parameters(root: &Arc<dyn SceneNode>) -> ParameterSet {
    let mut params = ParameterSet::new();

    walk(root, |path, node| {
        debug!(path = path; "visiting scene node");
        node.put_parameters(&mut params.scope(path));
    });

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, Option<&'static str>);

    impl SceneNode for Named {
        fn type_name(&self) -> &str {
            self.0
        }

        fn id(&self) -> Option<&str> {
            self.1
        }
    }

    #[test]
    fn test_path_includes_meaningful_ids_only() {
        assert_eq!(node_path("/", &Named("Scene", None)), "/Scene/");
        assert_eq!(
            node_path("/Scene/", &Named("BSDF", Some("floor"))),
            "/Scene/BSDF[id=\"floor\"]/"
        );
        assert_eq!(node_path("/Scene/", &Named("BSDF", Some(""))), "/Scene/BSDF/");
        assert_eq!(
            node_path("/Scene/", &Named("Mesh", Some("_unnamed_[0x7f3a]"))),
            "/Scene/Mesh/"
        );
    }
}
