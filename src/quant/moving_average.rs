//! Moving-average abs-max scale tracker
//!
//! Keeps an unnormalized exponentially weighted sum (`accum`) together with
//! its total weight (`state`). Dividing one by the other gives a
//! bias-corrected estimate, so the first observation is returned unchanged
//! instead of being pulled toward zero:
//!
//! ```text
//! state' = state * moving_rate + 1
//! accum' = accum * moving_rate + cur
//! scale  = accum' / state'
//! ```
//!
//! `state` converges to `1 / (1 - moving_rate)`, so long training runs never
//! overflow it.

use crate::tensor::Element;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Persistent `(accum, state)` pair owned by the caller between training steps
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageState<T> {
    /// Decayed sum of observed abs-max values
    pub accum: T,
    /// Decayed count of observations
    pub state: T,
}

impl<T: Element> Default for MovingAverageState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> MovingAverageState<T> {
    /// Uninitialized tracker, `(0, 0)`
    pub fn new() -> Self {
        Self {
            accum: T::zero(),
            state: T::zero(),
        }
    }

    /// Tracker resumed from previously stored accumulators
    pub fn from_parts(accum: T, state: T) -> Self {
        Self { accum, state }
    }

    /// Whether at least one observation has been folded in
    pub fn is_initialized(&self) -> bool {
        self.state > T::zero()
    }

    /// Current scale estimate, `None` before the first observation
    pub fn scale(&self) -> Option<T> {
        self.is_initialized().then(|| self.accum / self.state)
    }

    /// Fold in one observation and return the new scale estimate
    pub fn observe(&mut self, cur: T, moving_rate: f32) -> T {
        let update = find_moving_average_abs_max(self, cur, moving_rate);
        *self = update.state;
        update.out_scale
    }

    /// Convert the accumulators to another precision
    pub fn cast<U: Element>(&self) -> MovingAverageState<U> {
        MovingAverageState {
            accum: U::cast_from(self.accum),
            state: U::cast_from(self.state),
        }
    }
}

/// Result of one tracker step: the new accumulators and the derived scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovingAverageUpdate<T> {
    /// `(accum', state')`
    pub state: MovingAverageState<T>,
    /// `accum' / state'`
    pub out_scale: T,
}

/// One step of the moving-average tracker
///
/// Pure function of the previous accumulators; the caller decides where the
/// new pair is stored.
pub fn find_moving_average_abs_max<T: Element>(
    prev: &MovingAverageState<T>,
    cur: T,
    moving_rate: f32,
) -> MovingAverageUpdate<T> {
    let rate = T::from_f64_lossy(f64::from(moving_rate));
    let state = prev.state * rate + T::one();
    let accum = prev.accum * rate + cur;
    let out_scale = accum / state;

    trace!(
        cur = cur.to_f64_lossy(),
        accum = accum.to_f64_lossy(),
        state = state.to_f64_lossy(),
        scale = out_scale.to_f64_lossy(),
        "moving-average abs-max step"
    );

    MovingAverageUpdate {
        state: MovingAverageState { accum, state },
        out_scale,
    }
}

/// Limit of `state` after infinitely many observations
pub fn steady_state_weight(moving_rate: f64) -> f64 {
    1.0 / (1.0 - moving_rate)
}
