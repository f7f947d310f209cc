use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::value::{Dict, Value};

pub trait MetaKey: 'static {
    const KEY: &'static str;

    type Value: TryFrom<Value> + Into<Value> + fmt::Debug;
}

#[macro_export]
macro_rules! define_meta_key {
    ($($(#[$attr:meta])* $v:vis $T:ident : $key:literal => $V:ty),+ $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Clone, Copy)]
            $v struct $T;

            impl $crate::metadata::MetaKey for $T {
                const KEY: &'static str = $key;
                type Value = $V;
            }
        )+
    }
}

define_meta_key! {
    /// Name of the template a page renders through.
    pub Template: "template" => Arc<str>,
}

/// A page's front matter, with typed access through [`MetaKey`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    map: Arc<Dict>,
}

impl Metadata {
    pub fn new(map: Arc<Dict>) -> Self {
        Metadata { map }
    }

    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    #[inline]
    pub fn get<K: MetaKey>(&self, _: K) -> Option<Result<K::Value, Value>> {
        let value = self.get_raw(K::KEY)?.clone();
        Some(value.clone().try_into().map_err(|_| value))
    }

    #[inline(always)]
    pub fn contains<K: MetaKey>(&self, _: K) -> bool {
        self.map.contains_key(K::KEY)
    }

    /// Like [`Metadata::get()`], but absence and type mismatches are errors.
    pub fn require<K: MetaKey>(&self, key: K) -> Result<K::Value> {
        match self.get(key) {
            Some(Ok(value)) => Ok(value),
            Some(Err(value)) => err! {
                "unexpected metadata value type",
                "key" => K::KEY,
                "expected" => std::any::type_name::<K::Value>(),
                "actual type" => value.kind(),
            },
            None => err! {
                "missing required metadata key",
                "key" => K::KEY,
            },
        }
    }

    pub fn as_dict(&self) -> &Dict {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl From<Dict> for Metadata {
    fn from(dict: Dict) -> Self {
        Metadata::new(Arc::new(dict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access() {
        let meta = Metadata::from(crate::dict! { "template" => "page", "draft" => true });
        assert!(meta.contains(Template));
        assert_eq!(meta.require(Template).unwrap(), Arc::from("page"));
        assert_eq!(meta.get_raw("draft"), Some(&Value::Bool(true)));
    }

    #[test]
    fn missing_and_mistyped_keys() {
        let missing = Metadata::from(crate::dict! { "title" => "About" });
        assert!(missing.get(Template).is_none());
        assert!(missing.require(Template).unwrap_err().to_string().contains("missing"));

        let mistyped = Metadata::from(crate::dict! { "template" => 7 });
        assert_eq!(mistyped.get(Template), Some(Err(Value::Int(7))));
        assert!(mistyped.require(Template).is_err());
    }
}
