use std::{collections::HashMap, fmt};

use gridwalk_core::{MapGeometry, MapId, MapMetrics};
use log::{info, warn};

/// Memoized per-map tile size and pixel offset.
///
/// Geometry is fetched from the metrics source the first time a map is
/// projected and served from memory afterwards. Entries are dropped only by
/// [`PositionCache::invalidate`] and [`PositionCache::invalidate_all`], which
/// the map lifecycle owner calls when maps load or unload between ticks.
pub struct PositionCache {
    metrics: Box<dyn MapMetrics>,
    entries: HashMap<MapId, MapGeometry>,
}

impl PositionCache {
    /// Creates an empty cache backed by the provided metrics source.
    #[must_use]
    pub fn new(metrics: Box<dyn MapMetrics>) -> Self {
        Self {
            metrics,
            entries: HashMap::new(),
        }
    }

    /// Geometry of the map, fetched from the metrics source on a miss.
    pub fn geometry(&mut self, map: MapId) -> MapGeometry {
        if let Some(geometry) = self.entries.get(&map) {
            return *geometry;
        }

        let tile_size = self.metrics.tile_size(map);
        if !MapGeometry::is_usable_tile_size(tile_size) {
            warn!(
                "map {} reported unusable tile size {tile_size}; using the default",
                map.get()
            );
        }
        let geometry = MapGeometry::new(tile_size, self.metrics.world_offset(map));
        let _ = self.entries.insert(map, geometry);
        geometry
    }

    /// Geometry of the map if it has already been memoized.
    #[must_use]
    pub fn cached(&self, map: MapId) -> Option<MapGeometry> {
        self.entries.get(&map).copied()
    }

    /// Drops the memoized geometry of a single map.
    pub fn invalidate(&mut self, map: MapId) -> bool {
        let removed = self.entries.remove(&map).is_some();
        if removed {
            info!("invalidated cached geometry for map {}", map.get());
        }
        removed
    }

    /// Drops every memoized geometry and reports how many were dropped.
    pub fn invalidate_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        info!("invalidated cached geometry for {count} maps");
        count
    }

    /// Number of memoized maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no map geometry is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PositionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionCache")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
