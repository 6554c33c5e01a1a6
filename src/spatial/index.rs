use crate::core::geo::LatLngBounds;

use rstar::{RTree, RTreeObject, AABB};

/// A spatial item that can be indexed via an R-tree
#[derive(Debug, Clone)]
pub struct SpatialItem<T> {
    pub id: String,
    pub bounds: LatLngBounds,
    pub data: T,
}

impl<T> SpatialItem<T> {
    pub fn new(id: impl Into<String>, bounds: LatLngBounds, data: T) -> Self {
        Self {
            id: id.into(),
            bounds,
            data,
        }
    }
}

impl<T> PartialEq for SpatialItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SpatialItem<T> {}

// --- rstar integration -------------------------------------------------------------------------

fn envelope(bounds: &LatLngBounds) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [bounds.south_west.lng, bounds.south_west.lat],
        [bounds.north_east.lng, bounds.north_east.lat],
    )
}

impl<T> RTreeObject for SpatialItem<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope(&self.bounds)
    }
}

/// R-tree over geographic bounding boxes (`[lng, lat]` envelopes)
pub struct SpatialIndex<T> {
    rtree: RTree<SpatialItem<T>>,
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self {
            rtree: RTree::new(),
        }
    }

    /// Builds the tree in one pass, which packs better than repeated inserts
    pub fn bulk_load(items: Vec<SpatialItem<T>>) -> Self {
        Self {
            rtree: RTree::bulk_load(items),
        }
    }

    pub fn insert(&mut self, item: SpatialItem<T>) {
        self.rtree.insert(item);
    }

    /// Items whose bounds intersect `bounds`
    pub fn query(&self, bounds: &LatLngBounds) -> Vec<&SpatialItem<T>> {
        self.rtree
            .locate_in_envelope_intersecting(&envelope(bounds))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&SpatialItem<T>> {
        self.rtree.iter().find(|item| item.id == id)
    }

    /// Bounds of everything indexed, `None` when empty
    pub fn bounds(&self) -> Option<LatLngBounds> {
        if self.is_empty() {
            return None;
        }
        let env = self.rtree.root().envelope();
        Some(LatLngBounds::from_coords(
            env.lower()[1],
            env.lower()[0],
            env.upper()[1],
            env.upper()[0],
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn clear(&mut self) {
        self.rtree = RTree::new();
    }
}

impl<T: Clone> SpatialIndex<T> {
    pub fn remove(&mut self, id: &str) -> Option<SpatialItem<T>> {
        // Find the element immutably, clone it, then remove mutably.
        let found = self.get(id).cloned()?;
        self.rtree.remove(&found)
    }
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;

    fn at<T>(id: &str, lat: f64, lng: f64, data: T) -> SpatialItem<T> {
        let p = LatLng::new(lat, lng);
        SpatialItem::new(id, LatLngBounds::new(p, p), data)
    }

    #[test]
    fn test_query_by_bounds() {
        let index = SpatialIndex::bulk_load(vec![
            at("pekanbaru", 0.51, 101.44, 0_usize),
            at("dumai", 1.67, 101.45, 1),
            SpatialItem::new(
                "siak",
                LatLngBounds::from_coords(0.5, 101.5, 1.2, 102.5),
                2,
            ),
        ]);
        assert_eq!(index.len(), 3);

        let around_pekanbaru = LatLngBounds::from_coords(0.4, 101.3, 0.6, 101.6);
        let mut hits: Vec<_> = index.query(&around_pekanbaru).iter().map(|i| i.data).collect();
        hits.sort();
        assert_eq!(hits, vec![0, 2]);

        let bounds = index.bounds().unwrap();
        assert_eq!(bounds.south_west, LatLng::new(0.5, 101.44));
        assert_eq!(bounds.north_east, LatLng::new(1.67, 102.5));
    }

    #[test]
    fn test_remove() {
        let mut index = SpatialIndex::new();
        index.insert(at("a", 0.0, 0.0, ()));
        index.insert(at("b", 0.0, 0.0, ()));

        assert_eq!(index.remove("a").map(|i| i.id), Some("a".to_string()));
        assert!(index.remove("a").is_none());
        assert_eq!(index.len(), 1);
        assert!(index.get("b").is_some());
    }
}
