//! Placement strategies
//!
//! All arithmetic is integer centidegrees and parts per million.

use super::log_scale::log_scale;
use crate::config::{HomeEdge, Sector, SectorMap, Strategy};
use crate::error::ClockError;
use crate::state::LocationUpdate;
use crate::units::{Angle, Distance, DISTANCE_FULL_SCALE};

/// Inset applied to both edges of a distance-scaled sector (2.5 %)
///
/// Keeps hands off sector boundaries, so a hand at Home never looks like it
/// belongs to the neighbouring sector.
pub const EDGE_MARGIN_PPM: u32 = 25_000;

/// Resolve an update against the sector map
///
/// Fails with `UnknownSector` if the update names a sector the face does not
/// have.
pub fn resolve_in(
    map: &SectorMap,
    update: &LocationUpdate,
    slot: u8,
    count: u8,
) -> Result<Angle, ClockError> {
    let sector = map.get(&update.sector).ok_or(ClockError::UnknownSector)?;
    Ok(resolve(update, sector, slot, count))
}

/// Resolve an update within an already-selected sector
pub fn resolve(update: &LocationUpdate, sector: &Sector, slot: u8, count: u8) -> Angle {
    place(sector, update.distance, slot, count)
}

/// Target angle for a hand in `sector`
///
/// `slot` and `count` are the hand's roster position and the roster size;
/// they only matter for subdivision placement.
pub fn place(sector: &Sector, distance: Option<Distance>, slot: u8, count: u8) -> Angle {
    match sector.strategy {
        Strategy::Midpoint => sector.midpoint(),
        Strategy::FixedSubdivision => subdivision_midpoint(sector, slot, count),
        Strategy::DistanceScaled {
            home_edge,
            near_home,
        } => match distance {
            None => sector.midpoint(),
            Some(d) if near_home.is_some_and(|threshold| d < threshold) => {
                subdivision_midpoint(sector, slot, count)
            }
            Some(d) => distance_scaled(sector, d, home_edge),
        },
    }
}

/// Sub-range `[lo, hi)` of `sector` owned by `slot` out of `count`
///
/// A `count` too small for the slot is widened to include it, so a slot
/// always gets a non-empty share when the sector is wide enough.
pub fn subdivision(sector: &Sector, slot: u8, count: u8) -> (Angle, Angle) {
    let n = count.max(slot.saturating_add(1)).max(1) as u64;
    let i = slot as u64;
    let start = sector.start.centidegrees() as u64;
    let width = sector.width() as u64;

    let lo = start + width * i / n;
    let hi = start + width * (i + 1) / n;
    (
        Angle::from_centidegrees(lo as u32),
        Angle::from_centidegrees(hi as u32),
    )
}

fn subdivision_midpoint(sector: &Sector, slot: u8, count: u8) -> Angle {
    let (lo, hi) = subdivision(sector, slot, count);
    let lo = lo.centidegrees();
    Angle::from_centidegrees(lo + (hi.centidegrees() - lo) / 2)
}

fn distance_scaled(sector: &Sector, distance: Distance, home_edge: HomeEdge) -> Angle {
    let full = DISTANCE_FULL_SCALE as u64;
    let margin = EDGE_MARGIN_PPM as u64;
    let scaled = log_scale(distance) as u64;

    let fraction = margin + (full - 2 * margin) * scaled / full;
    let offset = (sector.width() as u64 * fraction / full) as u32;

    let start = sector.start.centidegrees();
    let last = sector.end.centidegrees() - 1;
    let cd = match home_edge {
        HomeEdge::Start => start + offset,
        HomeEdge::End => sector.end.centidegrees() - offset,
    };

    Angle::from_centidegrees(cd.clamp(start, last))
}
