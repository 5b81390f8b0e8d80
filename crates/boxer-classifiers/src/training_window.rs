//! Repeated presentation of training examples.
//!
//! A window sits between an example source and a learner. Every call to
//! [`TrainingWindow::absorb_next_example`] presents at most one example to
//! the sink, pulling from the source when the window wants a new one. The
//! source is passed on every call, so one window can span several inputs.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WindowConfig;
use crate::error::{ClassifierError, Result};

/// Receiver of presented examples, usually a closure around a learner.
pub trait ExampleSink<T> {
    fn present(&mut self, example: &T) -> Result<()>;
}

impl<T, F> ExampleSink<T> for F
where
    F: FnMut(&T) -> Result<()>,
{
    fn present(&mut self, example: &T) -> Result<()> {
        self(example)
    }
}

pub trait TrainingWindow<T> {
    /// Present the next example.
    ///
    /// Returns `Ok(false)` when nothing was presented. When the source runs
    /// dry without `can_finalize`, the window returns `false` without
    /// advancing, and a later call with a fresh source resumes where it left
    /// off. With `can_finalize` the source is considered finished for good
    /// and the buffered examples are played out.
    fn absorb_next_example(
        &mut self,
        source: &mut dyn Iterator<Item = T>,
        sink: &mut dyn ExampleSink<T>,
        can_finalize: bool,
    ) -> Result<bool>;

    /// Examples handed to the sink so far.
    fn presented(&self) -> u64;

    /// Examples pulled from the source so far.
    fn ingested(&self) -> u64;

    /// Ingestion ordinal (0-based) of the most recently presented example.
    fn last_presented(&self) -> Option<u64>;
}

/// Drive `window` until it reports exhaustion; returns the number of
/// presentations made.
pub fn run_to_completion<T>(
    window: &mut dyn TrainingWindow<T>,
    source: &mut dyn Iterator<Item = T>,
    sink: &mut dyn ExampleSink<T>,
) -> Result<u64> {
    let start = window.presented();
    while window.absorb_next_example(source, sink, true)? {}
    Ok(window.presented() - start)
}

/// Window for `config`.
pub fn build_window<T: 'static>(config: &WindowConfig) -> Result<Box<dyn TrainingWindow<T>>> {
    config.validate()?;
    Ok(match *config {
        WindowConfig::None => Box::new(SinglePass::default()),
        WindowConfig::Cyclic { size, repeat } => Box::new(CyclicWindow::new(size, repeat)?),
        WindowConfig::Randomized { size, repeat, seed } => {
            Box::new(RandomizedWindow::new(size, repeat, seed)?)
        }
    })
}

/// Every example once, in source order.
#[derive(Debug, Default)]
pub struct SinglePass {
    count: u64,
}

impl<T> TrainingWindow<T> for SinglePass {
    fn absorb_next_example(
        &mut self,
        source: &mut dyn Iterator<Item = T>,
        sink: &mut dyn ExampleSink<T>,
        _can_finalize: bool,
    ) -> Result<bool> {
        match source.next() {
            Some(item) => {
                sink.present(&item)?;
                self.count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn presented(&self) -> u64 {
        self.count
    }

    fn ingested(&self) -> u64 {
        self.count
    }

    fn last_presented(&self) -> Option<u64> {
        self.count.checked_sub(1)
    }
}

struct Slot<T> {
    ordinal: u64,
    item: T,
    left: usize,
}

/// Circular buffer of `size` slots, each example presented exactly `repeat`
/// times in round-robin order.
///
/// Slots are split into `repeat` groups of `size / repeat`; group `g` takes
/// its first example in cycle `g`, so in steady state one group is refilled
/// per cycle.
pub struct CyclicWindow<T> {
    slots: Vec<Option<Slot<T>>>,
    repeat: usize,
    group_size: usize,
    cursor: usize,
    cycle: usize,
    exhausted: bool,
    ingested: u64,
    presented: u64,
    last: Option<u64>,
}

impl<T> CyclicWindow<T> {
    pub fn new(size: usize, repeat: usize) -> Result<Self> {
        if size == 0 || repeat == 0 || size % repeat != 0 {
            return Err(ClassifierError::config(format!(
                "cyclic window size {} must be a positive multiple of repeat {}",
                size, repeat
            )));
        }
        Ok(CyclicWindow {
            slots: (0..size).map(|_| None).collect(),
            repeat,
            group_size: size / repeat,
            cursor: 0,
            cycle: 0,
            exhausted: false,
            ingested: 0,
            presented: 0,
            last: None,
        })
    }

    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor == self.slots.len() {
            self.cursor = 0;
            self.cycle += 1;
        }
    }

    fn has_pending(&self) -> bool {
        self.slots.iter().flatten().any(|s| s.left > 0)
    }
}

impl<T> TrainingWindow<T> for CyclicWindow<T> {
    fn absorb_next_example(
        &mut self,
        source: &mut dyn Iterator<Item = T>,
        sink: &mut dyn ExampleSink<T>,
        can_finalize: bool,
    ) -> Result<bool> {
        if self.exhausted && !can_finalize {
            return Ok(false);
        }
        let (start_cursor, start_cycle) = (self.cursor, self.cycle);

        for _ in 0..2 * self.slots.len() {
            let s = self.cursor;
            let idle = self.slots[s].as_ref().map_or(true, |slot| slot.left == 0);
            if idle && !self.exhausted && self.cycle >= s / self.group_size {
                match source.next() {
                    Some(item) => {
                        self.slots[s] = Some(Slot {
                            ordinal: self.ingested,
                            item,
                            left: self.repeat,
                        });
                        self.ingested += 1;
                    }
                    None if !can_finalize => {
                        self.cursor = start_cursor;
                        self.cycle = start_cycle;
                        return Ok(false);
                    }
                    None => {
                        self.exhausted = true;
                        log::debug!("Cyclic window source exhausted after {} example(s)", self.ingested);
                    }
                }
            }

            if let Some(slot) = self.slots[s].as_mut().filter(|slot| slot.left > 0) {
                sink.present(&slot.item)?;
                slot.left -= 1;
                self.last = Some(slot.ordinal);
                self.presented += 1;
                self.advance();
                return Ok(true);
            }
            self.advance();

            if self.exhausted && !self.has_pending() {
                break;
            }
        }

        log::info!(
            "Cyclic window finished: {} example(s), {} presentation(s)",
            self.ingested,
            self.presented
        );
        Ok(false)
    }

    fn presented(&self) -> u64 {
        self.presented
    }

    fn ingested(&self) -> u64 {
        self.ingested
    }

    fn last_presented(&self) -> Option<u64> {
        self.last
    }
}

/// Reservoir of `size` examples presented in random order.
///
/// Every `repeat`-th step pulls a new example from the source and presents
/// it; while the reservoir is filling the example is appended, afterwards it
/// replaces a uniformly chosen slot. The remaining steps present a uniformly
/// chosen buffered example, so each example is seen `repeat` times on
/// average.
pub struct RandomizedWindow<T> {
    buffer: Vec<(u64, T)>,
    size: usize,
    repeat: usize,
    rng: StdRng,
    step: u64,
    exhausted: bool,
    ingested: u64,
    presented: u64,
    last: Option<u64>,
}

impl<T> RandomizedWindow<T> {
    pub fn new(size: usize, repeat: usize, seed: u64) -> Result<Self> {
        if size == 0 || repeat == 0 {
            return Err(ClassifierError::config(format!(
                "randomized window needs positive size and repeat, got {} and {}",
                size, repeat
            )));
        }
        Ok(RandomizedWindow {
            buffer: Vec::with_capacity(size),
            size,
            repeat,
            rng: StdRng::seed_from_u64(seed),
            step: 0,
            exhausted: false,
            ingested: 0,
            presented: 0,
            last: None,
        })
    }

    fn present_slot(&mut self, index: usize, sink: &mut dyn ExampleSink<T>) -> Result<bool> {
        let (ordinal, item) = &self.buffer[index];
        sink.present(item)?;
        self.last = Some(*ordinal);
        self.presented += 1;
        self.step += 1;
        Ok(true)
    }
}

impl<T> TrainingWindow<T> for RandomizedWindow<T> {
    fn absorb_next_example(
        &mut self,
        source: &mut dyn Iterator<Item = T>,
        sink: &mut dyn ExampleSink<T>,
        can_finalize: bool,
    ) -> Result<bool> {
        if !self.exhausted && self.step % self.repeat as u64 == 0 {
            match source.next() {
                Some(item) => {
                    let entry = (self.ingested, item);
                    self.ingested += 1;
                    let index = if self.buffer.len() < self.size {
                        self.buffer.push(entry);
                        self.buffer.len() - 1
                    } else {
                        let index = self.rng.gen_range(0..self.size);
                        self.buffer[index] = entry;
                        index
                    };
                    return self.present_slot(index, sink);
                }
                None if !can_finalize => return Ok(false),
                None => {
                    self.exhausted = true;
                    log::debug!(
                        "Randomized window source exhausted after {} example(s)",
                        self.ingested
                    );
                }
            }
        }

        if self.exhausted {
            if !can_finalize {
                return Ok(false);
            }
            if self.buffer.is_empty() || self.presented >= self.repeat as u64 * self.ingested {
                log::info!(
                    "Randomized window finished: {} example(s), {} presentation(s)",
                    self.ingested,
                    self.presented
                );
                return Ok(false);
            }
        }

        if self.buffer.is_empty() {
            return Ok(false);
        }
        let index = self.rng.gen_range(0..self.buffer.len());
        self.present_slot(index, sink)
    }

    fn presented(&self) -> u64 {
        self.presented
    }

    fn ingested(&self) -> u64 {
        self.ingested
    }

    fn last_presented(&self) -> Option<u64> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(window: &mut dyn TrainingWindow<u32>, items: Vec<u32>) -> Vec<u32> {
        let mut seen = Vec::new();
        let mut source = items.into_iter();
        let mut sink = |x: &u32| -> Result<()> {
            seen.push(*x);
            Ok(())
        };
        run_to_completion(window, &mut source, &mut sink).unwrap();
        seen
    }

    #[test]
    fn single_pass_presents_in_order() {
        let mut w = SinglePass::default();
        assert_eq!(collect(&mut w, vec![3, 1, 2]), vec![3, 1, 2]);
    }

    #[test]
    fn cyclic_rejects_indivisible_size() {
        assert!(CyclicWindow::<u32>::new(7, 3).is_err());
        assert!(CyclicWindow::<u32>::new(0, 1).is_err());
    }

    #[test]
    fn cyclic_two_items_three_times_each() {
        let mut w = CyclicWindow::new(6, 3).unwrap();
        let seen = collect(&mut w, vec![10, 20]);
        assert_eq!(seen, vec![10, 20, 10, 20, 10, 20]);
    }

    #[test]
    fn cyclic_staggers_groups() {
        let mut w = CyclicWindow::new(4, 2).unwrap();
        let seen = collect(&mut w, (0..6).collect());
        for x in 0..6 {
            assert_eq!(seen.iter().filter(|&&v| v == x).count(), 2, "item {}", x);
        }
        // Cycle 0 only fills the first group.
        assert_eq!(&seen[..2], &[0, 1]);
    }

    #[test]
    fn cyclic_without_finalize_stops_and_resumes() {
        let mut w = CyclicWindow::new(2, 2).unwrap();
        let mut seen = Vec::new();
        let mut sink = |x: &u32| -> Result<()> {
            seen.push(*x);
            Ok(())
        };
        let mut first = vec![1u32].into_iter();
        while w.absorb_next_example(&mut first, &mut sink, false).unwrap() {}
        let presented = w.presented();
        assert!(!w.absorb_next_example(&mut first, &mut sink, false).unwrap());
        assert_eq!(w.presented(), presented);
        let mut second = vec![2u32].into_iter();
        while w.absorb_next_example(&mut second, &mut sink, false).unwrap() {}
        let mut empty = std::iter::empty();
        while w.absorb_next_example(&mut empty, &mut sink, true).unwrap() {}
        assert_eq!(seen, vec![1, 1, 2, 2]);
    }

    #[test]
    fn randomized_is_deterministic_for_a_seed() {
        let run = |seed| {
            let mut w = RandomizedWindow::new(10, 5, seed).unwrap();
            let mut ordinals = Vec::new();
            let mut source = 0..40u32;
            let mut sink = |_: &u32| -> Result<()> { Ok(()) };
            while w.absorb_next_example(&mut source, &mut sink, true).unwrap() {
                ordinals.push(w.last_presented().unwrap());
            }
            (ordinals, w.presented(), w.ingested())
        };
        let (a, presented, ingested) = run(42);
        let (b, _, _) = run(42);
        assert_eq!(a, b);
        assert_eq!(ingested, 40);
        assert!(presented >= 5 * 40);
        assert!(a.iter().all(|&o| o < 40));
    }

    #[test]
    fn randomized_without_finalize_stops_at_exhaustion() {
        let mut w = RandomizedWindow::new(4, 2, 1).unwrap();
        let mut source = 0..3u32;
        let mut sink = |_: &u32| -> Result<()> { Ok(()) };
        let mut steps = 0;
        while w.absorb_next_example(&mut source, &mut sink, false).unwrap() {
            steps += 1;
        }
        assert_eq!(w.ingested(), 3);
        assert_eq!(steps, w.presented());
        assert!(steps < 2 * 3 + 1);
    }

    #[test]
    fn build_window_from_config() {
        let w = build_window::<u32>(&WindowConfig::Cyclic { size: 4, repeat: 2 }).unwrap();
        assert_eq!(w.presented(), 0);
        assert!(build_window::<u32>(&WindowConfig::Cyclic { size: 5, repeat: 2 }).is_err());
    }
}
