use std::sync::Arc;

use autodiff::ParamScope;

/// An object of the scene graph.
///
/// Every capability other than the type name is optional: nodes without an
/// identifier, children or differentiable parameters keep the defaults.
pub trait SceneNode {
    /// The name of the node's type, e.g. `"Scene"` or `"SmoothDiffuse"`.
    fn type_name(&self) -> &str;

    /// The user given identifier of this node, if any.
    fn id(&self) -> Option<&str> {
        None
    }

    /// The nodes referenced by this one. The same node may be the child of
    /// several parents.
    fn children(&self) -> &[Arc<dyn SceneNode>] {
        &[]
    }

    /// Registers this node's differentiable parameters into `scope`.
    fn put_parameters(&self, _scope: &mut ParamScope<'_>) {}
}
