use std::{
    collections::{BTreeMap, btree_map},
    fmt,
};

use log::debug;

use crate::{AutodiffErr, Result, Variable};

/// An ordered mapping from parameter names to differentiable variables.
///
/// Keys are kept in lexicographic order so that every traversal of the set
/// (optimizer updates, gradient accumulation, display) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    params: BTreeMap<String, Variable>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Inserts a variable, returning the one previously stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, var: Variable) -> Option<Variable> {
        self.params.insert(key.into(), var)
    }

    pub fn remove(&mut self, key: &str) -> Option<Variable> {
        self.params.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Variable> {
        self.params.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Variable> {
        self.params.get_mut(key)
    }

    /// Like `get` but fails with `UnknownParameter` when the key is missing.
    pub fn require(&self, key: &str) -> Result<&Variable> {
        self.params
            .get(key)
            .ok_or_else(|| AutodiffErr::UnknownParameter(key.to_string()))
    }

    /// Like `get_mut` but fails with `UnknownParameter` when the key is missing.
    pub fn require_mut(&mut self, key: &str) -> Result<&mut Variable> {
        self.params
            .get_mut(key)
            .ok_or_else(|| AutodiffErr::UnknownParameter(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Variable> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Variable> {
        self.params.iter_mut()
    }

    /// Enables or disables gradient tracking on every parameter.
    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.params
            .values_mut()
            .for_each(|var| var.set_requires_grad(requires_grad));
    }

    /// Drops the gradient data of every parameter.
    pub fn clear_grads(&mut self) {
        self.params.values_mut().for_each(Variable::clear_grad);
    }

    /// Returns a registration scope that prepends `prefix` to every key.
    pub fn scope<'a>(&'a mut self, prefix: &'a str) -> ParamScope<'a> {
        ParamScope {
            params: self,
            prefix,
        }
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a Variable);
    type IntoIter = btree_map::Iter<'a, String, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Variable)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (K, Variable)>>(iter: T) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ParameterSet[")?;
        for (key, var) in &self.params {
            let marker = if var.requires_grad() { '*' } else { ' ' };
            writeln!(f, "  {marker} {key} ({} elements)", var.len())?;
        }
        write!(f, "]")
    }
}

/// A view of a `ParameterSet` that registers parameters under a fixed path.
pub struct ParamScope<'a> {
    params: &'a mut ParameterSet,
    prefix: &'a str,
}

impl ParamScope<'_> {
    pub fn prefix(&self) -> &str {
        self.prefix
    }

    /// Registers `var` under `prefix + name`.
    pub fn put(&mut self, name: &str, var: Variable) {
        let key = format!("{}{name}", self.prefix);
        debug!(key = key.as_str(), len = var.len(); "registering parameter");
        self.params.insert(key, var);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_prefixes_keys() {
        let mut params = ParameterSet::new();
        params.scope("/Scene/BSDF/").put("reflectance", Variable::scalar(0.5));

        assert!(params.contains_key("/Scene/BSDF/reflectance"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let params: ParameterSet = [
            ("b", Variable::scalar(1.)),
            ("a", Variable::scalar(2.)),
            ("c", Variable::scalar(3.)),
        ]
        .into_iter()
        .collect();

        let keys: Vec<_> = params.keys().collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_require_unknown_key() {
        let params = ParameterSet::new();
        assert_eq!(
            params.require("missing").unwrap_err(),
            AutodiffErr::UnknownParameter("missing".into())
        );
    }
}
