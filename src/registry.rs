// ABOUTME: Bidirectional index between image keys and the pods running them.
// ABOUTME: Both directions live behind one RwLock so readers never see a torn update.
// ABOUTME: Per-pod generation stamps keep a stale listing from undoing newer watch updates.

use crate::types::{ImageKey, InstanceId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// A point in the registry's mutation history.
///
/// Taken with [`Registry::generation`] before starting a listing and handed
/// back to [`Registry::reconcile_since`] afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct Maps {
    by_image: HashMap<ImageKey, HashSet<InstanceId>>,
    by_instance: HashMap<InstanceId, HashSet<ImageKey>>,
    generation: u64,
    /// Generation of the last incremental change per pod, removals included.
    touched: HashMap<InstanceId, u64>,
}

impl Maps {
    fn stamp(&mut self, instance: &InstanceId) {
        self.generation += 1;
        self.touched.insert(instance.clone(), self.generation);
    }

    fn insert(&mut self, instance: &InstanceId, image: &ImageKey) {
        self.by_image
            .entry(image.clone())
            .or_default()
            .insert(instance.clone());
        self.by_instance
            .entry(instance.clone())
            .or_default()
            .insert(image.clone());
    }

    fn delete(&mut self, instance: &InstanceId, image: &ImageKey) {
        if let Some(instances) = self.by_image.get_mut(image) {
            instances.remove(instance);
            if instances.is_empty() {
                self.by_image.remove(image);
            }
        }
        if let Some(images) = self.by_instance.get_mut(instance) {
            images.remove(image);
            if images.is_empty() {
                self.by_instance.remove(instance);
            }
        }
    }

    fn delete_instance(&mut self, instance: &InstanceId) -> Vec<ImageKey> {
        let Some(images) = self.by_instance.remove(instance) else {
            return Vec::new();
        };
        for image in &images {
            if let Some(instances) = self.by_image.get_mut(image) {
                instances.remove(instance);
                if instances.is_empty() {
                    self.by_image.remove(image);
                }
            }
        }
        images.into_iter().collect()
    }
}

/// Tracks which pods run which images.
///
/// Every operation takes the lock once and holds it only for in-memory
/// bookkeeping. Writers are exclusive, readers share. The two maps are kept
/// as exact inverses of each other and empty sets are pruned, so memory is
/// bounded by the live pod population.
#[derive(Debug, Default)]
pub struct Registry {
    maps: RwLock<Maps>,
}

/// A consistent copy of the registry taken under a single read lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub by_image: HashMap<ImageKey, HashSet<InstanceId>>,
    pub by_instance: HashMap<InstanceId, HashSet<ImageKey>>,
}

impl RegistrySnapshot {
    /// Check that both directions agree and that no empty set is stored.
    pub fn is_consistent(&self) -> bool {
        let forward = self.by_image.iter().all(|(image, instances)| {
            !instances.is_empty()
                && instances.iter().all(|i| {
                    self.by_instance
                        .get(i)
                        .is_some_and(|images| images.contains(image))
                })
        });
        let backward = self.by_instance.iter().all(|(instance, images)| {
            !images.is_empty()
                && images.iter().all(|m| {
                    self.by_image
                        .get(m)
                        .is_some_and(|instances| instances.contains(instance))
                })
        });
        forward && backward
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `instance` runs `image`. Adding a known pair is a no-op.
    ///
    /// Called once per container of a pod, so a pod with several containers
    /// ends up with several images.
    pub fn add(&self, instance: &InstanceId, image: &ImageKey) {
        let mut maps = self.maps.write();
        maps.stamp(instance);
        maps.insert(instance, image);
    }

    /// Forget that `instance` runs `image`. Removing an unknown pair is a no-op.
    pub fn remove(&self, instance: &InstanceId, image: &ImageKey) {
        let mut maps = self.maps.write();
        maps.stamp(instance);
        maps.delete(instance, image);
    }

    /// Pods currently known to run `image`. Empty if the image is unknown.
    pub fn instances_for(&self, image: &ImageKey) -> Vec<InstanceId> {
        self.maps
            .read()
            .by_image
            .get(image)
            .map(|instances| instances.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Images currently associated with `instance`.
    pub fn images_for(&self, instance: &InstanceId) -> Vec<ImageKey> {
        self.maps
            .read()
            .by_instance
            .get(instance)
            .map(|images| images.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every association of `instance` at once and return the images it had.
    pub fn remove_instance(&self, instance: &InstanceId) -> Vec<ImageKey> {
        let mut maps = self.maps.write();
        maps.stamp(instance);
        maps.delete_instance(instance)
    }

    /// Make `images` the exact association set of `instance`.
    ///
    /// New images are added and images no longer declared are removed in
    /// the same critical section. An empty `images` untracks the instance.
    pub fn replace_instance<I>(&self, instance: &InstanceId, images: I)
    where
        I: IntoIterator<Item = ImageKey>,
    {
        let wanted: HashSet<ImageKey> = images.into_iter().collect();
        let mut maps = self.maps.write();
        maps.stamp(instance);
        let stale: Vec<ImageKey> = maps
            .by_instance
            .get(instance)
            .map(|current| current.difference(&wanted).cloned().collect())
            .unwrap_or_default();
        for image in &stale {
            maps.delete(instance, image);
        }
        for image in &wanted {
            maps.insert(instance, image);
        }
    }

    /// Rebuild the registry from a full listing of the live population.
    ///
    /// Anything not in `population` is dropped. Readers see either the old
    /// contents or the new ones. Only for listings that are ordered with
    /// the incremental updates, such as a watch re-list. Every pod it adds
    /// or drops counts as changed for a later [`Registry::reconcile_since`].
    pub fn reconcile<P, I>(&self, population: P)
    where
        P: IntoIterator<Item = (InstanceId, I)>,
        I: IntoIterator<Item = ImageKey>,
    {
        let mut maps = self.maps.write();
        let generation = maps.generation + 1;
        let mut fresh = Maps {
            generation,
            ..Maps::default()
        };
        for (instance, images) in population {
            for image in images {
                fresh.insert(&instance, &image);
            }
        }
        let changed: HashSet<InstanceId> = maps
            .touched
            .keys()
            .chain(maps.by_instance.keys())
            .chain(fresh.by_instance.keys())
            .cloned()
            .collect();
        fresh.touched = changed.into_iter().map(|i| (i, generation)).collect();
        *maps = fresh;
    }

    /// Current mutation generation, to be taken before an out-of-band listing.
    pub fn generation(&self) -> Generation {
        Generation(self.maps.read().generation)
    }

    /// Rebuild the registry from a listing that started at `mark`.
    ///
    /// Pods added, changed or removed after `mark` keep their current
    /// state and the listing's view of them is ignored. Every other pod
    /// takes the listing's view, including removal when it is absent.
    pub fn reconcile_since<P, I>(&self, mark: Generation, population: P)
    where
        P: IntoIterator<Item = (InstanceId, I)>,
        I: IntoIterator<Item = ImageKey>,
    {
        let mut maps = self.maps.write();
        let newer = |maps: &Maps, instance: &InstanceId| {
            maps.touched.get(instance).is_some_and(|g| *g > mark.0)
        };

        let mut fresh = Maps {
            generation: maps.generation,
            ..Maps::default()
        };
        for (instance, images) in population {
            if newer(&*maps, &instance) {
                continue;
            }
            for image in images {
                fresh.insert(&instance, &image);
            }
        }
        for (instance, images) in &maps.by_instance {
            if newer(&*maps, instance) {
                for image in images {
                    fresh.insert(instance, image);
                }
            }
        }
        fresh.touched = maps
            .touched
            .drain()
            .filter(|(_, g)| *g > mark.0)
            .collect();
        *maps = fresh;
    }

    /// Image keys with at least one pod.
    pub fn known_images(&self) -> Vec<ImageKey> {
        self.maps.read().by_image.keys().cloned().collect()
    }

    pub fn len_images(&self) -> usize {
        self.maps.read().by_image.len()
    }

    pub fn len_instances(&self) -> usize {
        self.maps.read().by_instance.len()
    }

    pub fn is_empty(&self) -> bool {
        let maps = self.maps.read();
        maps.by_image.is_empty() && maps.by_instance.is_empty()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let maps = self.maps.read();
        RegistrySnapshot {
            by_image: maps.by_image.clone(),
            by_instance: maps.by_instance.clone(),
        }
    }
}
