//! Weighted item selection.

use std::sync::{Mutex, PoisonError};

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::models::CaseItem;
use crate::errors::{EconomyError, EconomyResult};

/// Source of uniform draws for the selector.
pub trait DrawSource: Send {
    /// Draw a value uniformly from `[0, total)`. `total` is always positive.
    fn draw(&mut self, total: f64) -> f64;
}

/// Draws from a `rand` generator.
pub struct RngDraw<R = StdRng> {
    rng: R,
}

impl RngDraw<StdRng> {
    /// Generator seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator, for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> RngDraw<R> {
    /// Wrap an arbitrary generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> DrawSource for RngDraw<R> {
    fn draw(&mut self, total: f64) -> f64 {
        self.rng.random_range(0.0..total)
    }
}

/// Always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl DrawSource for FixedDraw {
    fn draw(&mut self, _total: f64) -> f64 {
        self.0
    }
}

/// Picks items from a case proportionally to their drop chance.
pub struct ItemSelector {
    source: Mutex<Box<dyn DrawSource>>,
}

impl ItemSelector {
    /// Create a selector over the given draw source
    pub fn new(source: impl DrawSource + 'static) -> Self {
        Self {
            source: Mutex::new(Box::new(source)),
        }
    }

    /// Select one item.
    ///
    /// # Errors
    ///
    /// * `EconomyError::InvalidCatalog` - No items, a malformed weight, or a
    ///   non-positive total
    pub fn select<'a>(&self, items: &'a [CaseItem]) -> EconomyResult<&'a CaseItem> {
        let total = total_weight(items)?;
        let r = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .draw(total);
        log::debug!("Drew {r} of {total} over {} items", items.len());
        select_at(items, r)
    }
}

impl Default for ItemSelector {
    fn default() -> Self {
        Self::new(RngDraw::from_os_rng())
    }
}

/// Sum of all drop chances.
///
/// # Errors
///
/// * `EconomyError::InvalidCatalog` - Empty list, a negative or non-finite
///   weight, or a total that is not positive
pub fn total_weight(items: &[CaseItem]) -> EconomyResult<f64> {
    if items.is_empty() {
        return Err(EconomyError::InvalidCatalog("no items".to_string()));
    }

    if let Some(bad) = items
        .iter()
        .find(|item| !item.drop_chance.is_finite() || item.drop_chance < 0.0)
    {
        return Err(EconomyError::InvalidCatalog(format!(
            "item {} has drop chance {}",
            bad.id, bad.drop_chance
        )));
    }

    let total: f64 = items.iter().map(|item| item.drop_chance).sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(EconomyError::InvalidCatalog(format!(
            "total drop chance {total} is not positive"
        )));
    }

    Ok(total)
}

/// Select the item whose cumulative weight first reaches `r`.
///
/// Items are walked in slice order. Zero-weight items are never selected. If
/// rounding leaves the running sum below `r`, the last weighted item is
/// returned.
pub fn select_at(items: &[CaseItem], r: f64) -> EconomyResult<&CaseItem> {
    let total = total_weight(items)?;

    let mut cumulative = 0.0;
    let mut last_weighted = None;
    for item in items.iter().filter(|item| item.drop_chance > 0.0) {
        cumulative += item.drop_chance;
        last_weighted = Some(item);
        if cumulative >= r {
            return Ok(item);
        }
    }

    last_weighted.ok_or_else(|| {
        EconomyError::InvalidCatalog(format!("total drop chance {total} is not positive"))
    })
}
