//! Distance, nearest-of and center-of over unit snapshots

use ordered_float::OrderedFloat;

use crate::core::types::Vec2;
use crate::world::UnitSnapshot;

/// Centroid of a set of positions, `None` when empty
pub fn center<I>(positions: I) -> Option<Vec2>
where
    I: IntoIterator<Item = Vec2>,
{
    let mut sum = Vec2::default();
    let mut count = 0usize;
    for p in positions {
        sum = sum + p;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum * (1.0 / count as f32))
    }
}

/// Centroid of a set of units
pub fn center_of<'a, I>(units: I) -> Option<Vec2>
where
    I: IntoIterator<Item = &'a UnitSnapshot>,
{
    center(units.into_iter().map(|u| u.position))
}

pub fn closest_to<'a, I>(units: I, point: Vec2) -> Option<&'a UnitSnapshot>
where
    I: IntoIterator<Item = &'a UnitSnapshot>,
{
    units
        .into_iter()
        .min_by_key(|u| OrderedFloat(u.position.distance(&point)))
}

pub fn furthest_from<'a, I>(units: I, point: Vec2) -> Option<&'a UnitSnapshot>
where
    I: IntoIterator<Item = &'a UnitSnapshot>,
{
    units
        .into_iter()
        .max_by_key(|u| OrderedFloat(u.position.distance(&point)))
}

/// The `n` units nearest to `point`, nearest first
pub fn closest_n<'a, I>(units: I, point: Vec2, n: usize) -> Vec<&'a UnitSnapshot>
where
    I: IntoIterator<Item = &'a UnitSnapshot>,
{
    let mut sorted: Vec<&UnitSnapshot> = units.into_iter().collect();
    sorted.sort_by_key(|u| (OrderedFloat(u.position.distance(&point)), u.id));
    sorted.truncate(n);
    sorted
}

/// Units strictly within `range` of `point`
pub fn closer_than<'a, I>(units: I, range: f32, point: Vec2) -> Vec<&'a UnitSnapshot>
where
    I: IntoIterator<Item = &'a UnitSnapshot>,
{
    units
        .into_iter()
        .filter(|u| u.position.is_closer_than(range, &point))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UnitId, UnitKind};

    fn at(id: u64, x: f32, y: f32) -> UnitSnapshot {
        UnitSnapshot::new(UnitId(id), UnitKind(1), Vec2::new(x, y))
    }

    #[test]
    fn test_center_of_empty_is_none() {
        assert!(center(Vec::new()).is_none());
    }

    #[test]
    fn test_center_of_square() {
        let units = vec![at(1, 0.0, 0.0), at(2, 2.0, 0.0), at(3, 2.0, 2.0), at(4, 0.0, 2.0)];
        assert_eq!(center_of(&units), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_closest_n_orders_by_distance() {
        let units = vec![at(1, 10.0, 0.0), at(2, 1.0, 0.0), at(3, 5.0, 0.0)];
        let picked = closest_n(&units, Vec2::default(), 2);
        let ids: Vec<_> = picked.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![UnitId(2), UnitId(3)]);
    }

    #[test]
    fn test_closest_and_furthest() {
        let units = vec![at(1, 10.0, 0.0), at(2, 1.0, 0.0)];
        assert_eq!(closest_to(&units, Vec2::default()).map(|u| u.id), Some(UnitId(2)));
        assert_eq!(furthest_from(&units, Vec2::default()).map(|u| u.id), Some(UnitId(1)));
    }

    #[test]
    fn test_closer_than_is_strict() {
        let units = vec![at(1, 5.0, 0.0), at(2, 4.9, 0.0)];
        let near = closer_than(&units, 5.0, Vec2::default());
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].id, UnitId(2));
    }
}
