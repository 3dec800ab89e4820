//! Dependency ordering
//!
//! Objects are ranked by kind precedence and sorted stably, so objects of
//! equal rank keep their input order. Deletion walks the exact mirror of the
//! creation order.

use kubesync_core::{ApiObject, KindRank, ObjectId};

use crate::backend::{Location, ResourceLocator};
use crate::error::Result;

/// An object with its resolved location and rank
#[derive(Debug, Clone)]
pub struct OrderedObject {
    pub object: ApiObject,
    pub location: Location,
    pub rank: KindRank,
}

impl OrderedObject {
    /// Identity at the resolved location
    pub fn id(&self) -> ObjectId {
        self.location.id_of(self.object.name())
    }
}

/// Objects in creation order
#[derive(Debug, Clone, Default)]
pub struct DependencyOrder {
    items: Vec<OrderedObject>,
}

impl DependencyOrder {
    /// Locate and rank every object, then sort by rank
    ///
    /// Fails on the first object the locator cannot resolve. Namespaced objects
    /// without a namespace get the default namespace written into them.
    pub fn build(
        objects: Vec<ApiObject>,
        locator: &dyn ResourceLocator,
        default_namespace: &str,
    ) -> Result<Self> {
        let mut items = Vec::with_capacity(objects.len());

        for mut object in objects {
            let location = locator.locate(&object, default_namespace)?;
            if let Some(ns) = &location.namespace
                && object.namespace() != Some(ns.as_str())
            {
                object.set_namespace(ns);
            }

            let rank = KindRank::classify(
                object.kind(),
                &location.endpoint.group,
                location.endpoint.namespaced,
            );
            items.push(OrderedObject {
                object,
                location,
                rank,
            });
        }

        // sort_by_key is stable: equal ranks keep input order
        items.sort_by_key(|item| item.rank);
        tracing::debug!(count = items.len(), "ordered objects");

        Ok(Self { items })
    }

    /// Mirror of this order
    pub fn reverse(mut self) -> Self {
        self.items.reverse();
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrderedObject> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, OrderedObject> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Identities in order
    pub fn ids(&self) -> Vec<ObjectId> {
        self.items.iter().map(OrderedObject::id).collect()
    }
}

impl IntoIterator for DependencyOrder {
    type Item = OrderedObject;
    type IntoIter = std::vec::IntoIter<OrderedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
