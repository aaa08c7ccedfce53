/// Step counter driving the simulation loop over an aligned series.
///
/// Steps are handed out strictly in order, once each, so a run never depends on
/// anything but its inputs.
///
/// # Examples
///
/// ```
/// use grid_dac_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(3);
/// let mut steps = Vec::new();
///
/// clock.try_run(|step| {
///     steps.push(step);
///     Ok::<(), ()>(())
/// })?;
/// assert_eq!(steps, vec![0, 1, 2]);
/// assert_eq!(clock.tick(), None);
/// # Ok::<(), ()>(())
/// ```
pub struct Clock {
    /// Next step to hand out
    current: usize,
    /// Number of steps in the run
    total: usize,
}

impl Clock {
    /// Creates a clock over `total` steps.
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(step)` - The step index (starting from 0) before advancing
    /// * `None` - If every step has been handed out
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.total {
            let step = self.current;
            self.current += 1;
            Some(step)
        } else {
            None
        }
    }

    /// Calls `f` for each remaining step, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`; later steps are not run.
    pub fn try_run<E>(&mut self, mut f: impl FnMut(usize) -> Result<(), E>) -> Result<(), E> {
        while let Some(step) = self.tick() {
            f(step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(2);
        assert_eq!(clock.tick(), Some(0));
        assert_eq!(clock.tick(), Some(1));
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = Clock::new(0);
        let mut was_called = false;
        let result: Result<(), ()> = clock.try_run(|_| {
            was_called = true;
            Ok(())
        });
        assert_eq!(result, Ok(()));
        assert!(!was_called);
    }

    #[test]
    fn try_run_stops_at_first_error() {
        let mut clock = Clock::new(5);
        let mut seen = Vec::new();
        let result = clock.try_run(|step| {
            seen.push(step);
            if step == 2 { Err(step) } else { Ok(()) }
        });
        assert_eq!(result, Err(2));
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(clock.tick(), Some(3));
    }
}
