//! Spin selection.
//!
//! A spin picks up to `options` candidates from the eligible items with an
//! unbiased shuffle, gives each a colour, and commits to a winner drawn
//! uniformly from the candidates. The winner stays hidden until the
//! presentation finishes and the engine is told to reveal it.
//!
//! ```text
//! loading --items arrive--> ready --spin--> spinning --reveal--> done
//!                             ^                 ^                  |
//!                             |                 +----spin again----+
//!                             +----------------------reset---------+
//! ```

use super::wrap::wrap;
use super::{WheelSettings, PALETTE};
use crate::error::SelectionError;
use crate::models::Item;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Ready,
    Spinning,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ItemsArrived,
    Spin,
    RevealElapsed,
    SpinAgain,
    Reset,
}

/// The transition table. `None` means the event is not accepted in `phase`.
pub fn next_phase(phase: Phase, event: Event) -> Option<Phase> {
    match (phase, event) {
        (Phase::Loading, Event::ItemsArrived) => Some(Phase::Ready),
        (Phase::Ready, Event::Spin) => Some(Phase::Spinning),
        (Phase::Spinning, Event::RevealElapsed) => Some(Phase::Done),
        (Phase::Done, Event::SpinAgain) => Some(Phase::Spinning),
        (Phase::Done, Event::Reset) => Some(Phase::Ready),
        _ => None,
    }
}

/// Segment colours, carried from one spin to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<&'static str>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: PALETTE.to_vec(),
        }
    }
}

impl Palette {
    pub fn colors(&self) -> &[&'static str] {
        &self.colors
    }

    pub fn shuffled<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        self.colors.shuffle(rng);
        self
    }

    fn color_for(&self, index: usize) -> &'static str {
        self.colors[index % self.colors.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub item: Item,
    /// Title with line breaks for display.
    pub label: String,
    pub color: &'static str,
}

/// A committed spin: the candidates shown on the wheel and the one that wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spin {
    pub segments: Vec<Segment>,
    pub winner_index: usize,
}

impl Spin {
    pub fn winner(&self) -> &Item {
        &self.segments[self.winner_index].item
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Item> {
        self.segments.iter().map(|s| &s.item)
    }
}

#[derive(Debug, Clone)]
pub struct Draw {
    pub spin: Spin,
    /// Palette to hand to the next draw.
    pub palette: Palette,
}

/// Draw candidates and a winner from `eligible`.
///
/// Candidates are the first `options` items of a uniform random permutation,
/// so every eligible item is equally likely to be shown and, once shown,
/// every candidate is equally likely to win.
pub fn draw<R: Rng + ?Sized>(
    eligible: &[Item],
    palette: Palette,
    options: usize,
    break_at: usize,
    rng: &mut R,
) -> Result<Draw, SelectionError> {
    if options == 0 {
        return Err(SelectionError::NoCandidateSlots);
    }
    if eligible.is_empty() {
        return Err(SelectionError::NoEligibleItems);
    }

    let mut order: Vec<&Item> = eligible.iter().collect();
    order.shuffle(rng);
    order.truncate(options);

    let palette = palette.shuffled(rng);
    let segments: Vec<Segment> = order
        .into_iter()
        .enumerate()
        .map(|(i, item)| Segment {
            item: item.clone(),
            label: wrap(&item.title, break_at),
            color: palette.color_for(i),
        })
        .collect();

    let winner_index = rng.gen_range(0..segments.len());

    Ok(Draw {
        spin: Spin {
            segments,
            winner_index,
        },
        palette,
    })
}

/// What observers see: the phase and, once revealed, the winner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionState {
    pub phase: Phase,
    pub winner: Option<Item>,
}

/// Plays a committed spin to the user (wheel animation, music, ...).
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Resolves with the spin's winner once `duration` has elapsed.
    async fn present(&self, spin: &Spin, duration: Duration) -> Item;
}

pub struct SelectionEngine {
    state: SelectionState,
    spin: Option<Spin>,
    palette: Palette,
    rng: StdRng,
    options: usize,
    break_at: usize,
    updates: watch::Sender<SelectionState>,
}

impl SelectionEngine {
    pub fn new(settings: &WheelSettings) -> Self {
        let state = SelectionState {
            phase: Phase::Loading,
            winner: None,
        };
        let (updates, _) = watch::channel(state.clone());

        Self {
            state,
            spin: None,
            palette: Palette::default(),
            rng: StdRng::from_entropy(),
            options: settings.options,
            break_at: settings.break_at,
            updates,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.updates.subscribe()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn winner(&self) -> Option<&Item> {
        self.state.winner.as_ref()
    }

    /// The spin in flight or last revealed.
    pub fn current_spin(&self) -> Option<&Spin> {
        self.spin.as_ref()
    }

    /// Whether a spin (or spin again) would be accepted right now.
    pub fn can_spin(&self, eligible: &[Item]) -> bool {
        self.options > 0
            && !eligible.is_empty()
            && matches!(self.state.phase, Phase::Ready | Phase::Done)
    }

    pub fn items_arrived(&mut self) -> Result<(), SelectionError> {
        self.advance(Event::ItemsArrived)?;
        self.publish();
        Ok(())
    }

    pub fn spin(&mut self, eligible: &[Item]) -> Result<&Spin, SelectionError> {
        self.commit(Event::Spin, eligible)
    }

    pub fn spin_again(&mut self, eligible: &[Item]) -> Result<&Spin, SelectionError> {
        self.commit(Event::SpinAgain, eligible)
    }

    /// The presentation has finished: make the committed winner visible.
    pub fn reveal(&mut self) -> Result<Item, SelectionError> {
        let next = self.check(Event::RevealElapsed)?;
        let winner = self
            .spin
            .as_ref()
            .map(|spin| spin.winner().clone())
            .ok_or(SelectionError::InvalidTransition {
                phase: self.state.phase,
                event: Event::RevealElapsed,
            })?;

        tracing::info!("Winner revealed: {}", winner.title);
        self.state.phase = next;
        self.state.winner = Some(winner.clone());
        self.publish();

        Ok(winner)
    }

    pub fn reset(&mut self) -> Result<(), SelectionError> {
        self.advance(Event::Reset)?;
        self.state.winner = None;
        self.spin = None;
        self.publish();
        Ok(())
    }

    fn commit(&mut self, event: Event, eligible: &[Item]) -> Result<&Spin, SelectionError> {
        let next = self.check(event)?;

        let drawn = draw(
            eligible,
            self.palette.clone(),
            self.options,
            self.break_at,
            &mut self.rng,
        )?;

        tracing::debug!(
            "Committed spin over {} candidates from {} eligible items",
            drawn.spin.segments.len(),
            eligible.len()
        );

        self.palette = drawn.palette;
        self.state.phase = next;
        self.state.winner = None;
        self.publish();

        Ok(self.spin.insert(drawn.spin))
    }

    fn check(&self, event: Event) -> Result<Phase, SelectionError> {
        next_phase(self.state.phase, event).ok_or(SelectionError::InvalidTransition {
            phase: self.state.phase,
            event,
        })
    }

    fn advance(&mut self, event: Event) -> Result<Phase, SelectionError> {
        let next = self.check(event)?;
        self.state.phase = next;
        Ok(next)
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn settings() -> WheelSettings {
        WheelSettings::default()
    }

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(format!("Movie {}", i))).collect()
    }

    fn engine(seed: u64) -> SelectionEngine {
        SelectionEngine::new(&settings()).with_rng(StdRng::seed_from_u64(seed))
    }

    fn ready_engine(seed: u64) -> SelectionEngine {
        let mut engine = engine(seed);
        engine.items_arrived().unwrap();
        engine
    }

    #[test]
    fn test_transition_table() {
        let phases = [Phase::Loading, Phase::Ready, Phase::Spinning, Phase::Done];
        let events = [
            Event::ItemsArrived,
            Event::Spin,
            Event::RevealElapsed,
            Event::SpinAgain,
            Event::Reset,
        ];

        let mut allowed = 0;
        for phase in phases {
            for event in events {
                if next_phase(phase, event).is_some() {
                    allowed += 1;
                }
            }
        }
        assert_eq!(allowed, 5);

        assert_eq!(next_phase(Phase::Loading, Event::ItemsArrived), Some(Phase::Ready));
        assert_eq!(next_phase(Phase::Ready, Event::Spin), Some(Phase::Spinning));
        assert_eq!(next_phase(Phase::Spinning, Event::RevealElapsed), Some(Phase::Done));
        assert_eq!(next_phase(Phase::Done, Event::SpinAgain), Some(Phase::Spinning));
        assert_eq!(next_phase(Phase::Done, Event::Reset), Some(Phase::Ready));
    }

    #[test]
    fn test_no_spin_while_loading() {
        let mut engine = engine(1);
        let library = items(3);

        assert!(!engine.can_spin(&library));
        assert_eq!(
            engine.spin(&library).unwrap_err(),
            SelectionError::InvalidTransition {
                phase: Phase::Loading,
                event: Event::Spin
            }
        );
        assert_eq!(engine.phase(), Phase::Loading);
    }

    #[test]
    fn test_no_second_spin_while_spinning() {
        let mut engine = ready_engine(2);
        let library = items(3);

        engine.spin(&library).unwrap();
        assert_eq!(engine.phase(), Phase::Spinning);
        assert!(!engine.can_spin(&library));
        assert!(engine.spin(&library).is_err());
        assert!(engine.spin_again(&library).is_err());
        assert!(engine.reset().is_err());
        assert_eq!(engine.phase(), Phase::Spinning);
        assert!(engine.winner().is_none());
    }

    #[test]
    fn test_full_cycle() {
        let mut engine = ready_engine(3);
        let library = items(10);

        let committed = engine.spin(&library).unwrap().winner().clone();
        assert!(engine.winner().is_none());

        let revealed = engine.reveal().unwrap();
        assert_eq!(revealed, committed);
        assert_eq!(engine.phase(), Phase::Done);
        assert_eq!(engine.winner(), Some(&committed));

        engine.spin_again(&library).unwrap();
        assert_eq!(engine.phase(), Phase::Spinning);
        assert!(engine.winner().is_none());

        engine.reveal().unwrap();
        engine.reset().unwrap();
        assert_eq!(engine.phase(), Phase::Ready);
        assert!(engine.winner().is_none());
        assert!(engine.current_spin().is_none());
    }

    #[test]
    fn test_empty_eligible_set_rejected() {
        let mut engine = ready_engine(4);

        assert!(!engine.can_spin(&[]));
        assert_eq!(engine.spin(&[]).unwrap_err(), SelectionError::NoEligibleItems);
        assert_eq!(engine.phase(), Phase::Ready);
        assert_eq!(engine.palette, Palette::default());
    }

    #[test]
    fn test_zero_options_rejected() {
        let mut rng = StdRng::seed_from_u64(12);
        let err = draw(&items(3), Palette::default(), 0, 20, &mut rng).unwrap_err();
        assert_eq!(err, SelectionError::NoCandidateSlots);

        let settings = WheelSettings {
            options: 0,
            ..WheelSettings::default()
        };
        let mut engine = SelectionEngine::new(&settings).with_rng(rng);
        engine.items_arrived().unwrap();
        assert!(!engine.can_spin(&items(3)));
        assert_eq!(engine.spin(&items(3)).unwrap_err(), SelectionError::NoCandidateSlots);
        assert_eq!(engine.phase(), Phase::Ready);
    }

    #[test]
    fn test_single_item_always_wins() {
        let mut engine = ready_engine(5);
        let library = vec![Item::new("A").with_critic_rating(2.0)];

        let spin = engine.spin(&library).unwrap();
        assert_eq!(spin.candidates().cloned().collect::<Vec<_>>(), library);
        assert_eq!(spin.winner(), &library[0]);
        assert_eq!(engine.reveal().unwrap(), library[0]);
    }

    #[test]
    fn test_candidates_distinct_and_capped() {
        let mut rng = StdRng::seed_from_u64(6);
        let library = items(30);

        for _ in 0..50 {
            let drawn = draw(&library, Palette::default(), 8, 20, &mut rng).unwrap();
            let titles: HashSet<&str> = drawn.spin.candidates().map(|i| i.title.as_str()).collect();
            assert_eq!(titles.len(), 8);
            assert!(drawn.spin.candidates().all(|i| library.contains(i)));
            assert!(drawn.spin.winner_index < 8);
        }

        let drawn = draw(&items(3), Palette::default(), 8, 20, &mut rng).unwrap();
        assert_eq!(drawn.spin.segments.len(), 3);
    }

    #[test]
    fn test_colors_and_labels() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut library = items(7);
        library.push(Item::new("The Good, the Bad and the Ugly"));

        let drawn = draw(&library, Palette::default(), 8, 20, &mut rng).unwrap();

        let mut sorted = drawn.palette.colors().to_vec();
        sorted.sort_unstable();
        let mut expected = PALETTE.to_vec();
        expected.sort_unstable();
        assert_eq!(sorted, expected);

        let colors: HashSet<&str> = drawn.spin.segments.iter().map(|s| s.color).collect();
        assert_eq!(colors.len(), 8);

        let long = drawn
            .spin
            .segments
            .iter()
            .find(|s| s.item.title.starts_with("The Good"))
            .unwrap();
        assert_eq!(long.label, "The Good, the Bad\n and the Ugly");
    }

    #[test]
    fn test_more_candidates_than_colors_reuses_palette() {
        let mut rng = StdRng::seed_from_u64(8);
        let drawn = draw(&items(12), Palette::default(), 12, 20, &mut rng).unwrap();
        let colors = drawn.palette.colors();
        assert_eq!(drawn.spin.segments[9].color, colors[0]);
        assert_eq!(drawn.spin.segments[11].color, colors[2]);
    }

    /// Chi-square statistic of `counts` against a uniform expectation.
    fn chi_square(counts: &[usize], trials: usize) -> f64 {
        let expected = trials as f64 / counts.len() as f64;
        counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum()
    }

    #[test]
    fn test_winner_uniform_over_small_library() {
        const TRIALS: usize = 10_000;
        let library = items(5);
        let mut engine = ready_engine(9);
        let mut counts = vec![0usize; library.len()];

        for trial in 0..TRIALS {
            let spin = if trial == 0 {
                engine.spin(&library).unwrap()
            } else {
                engine.spin_again(&library).unwrap()
            };
            let winner = spin.winner().clone();
            let idx = library.iter().position(|i| *i == winner).unwrap();
            counts[idx] += 1;
            engine.reveal().unwrap();
        }

        // df = 4, p = 0.001
        assert!(chi_square(&counts, TRIALS) < 18.47, "counts: {:?}", counts);
    }

    #[test]
    fn test_winner_uniform_when_library_exceeds_options() {
        const TRIALS: usize = 24_000;
        let library = items(12);
        let mut rng = StdRng::seed_from_u64(10);
        let mut counts = vec![0usize; library.len()];
        let mut palette = Palette::default();

        for _ in 0..TRIALS {
            let drawn = draw(&library, palette, 8, 20, &mut rng).unwrap();
            let idx = library.iter().position(|i| i == drawn.spin.winner()).unwrap();
            counts[idx] += 1;
            palette = drawn.palette;
        }

        // df = 11, p = 0.001
        assert!(chi_square(&counts, TRIALS) < 31.26, "counts: {:?}", counts);
    }

    #[test]
    fn test_observers_see_transitions() {
        let mut engine = engine(11);
        let mut rx = engine.subscribe();
        let library = items(4);

        engine.items_arrived().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().phase, Phase::Ready);

        engine.spin(&library).unwrap();
        assert_eq!(rx.borrow_and_update().phase, Phase::Spinning);

        let winner = engine.reveal().unwrap();
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.phase, Phase::Done);
        assert_eq!(seen.winner, Some(winner));

        engine.reset().unwrap();
        assert_eq!(
            *rx.borrow(),
            SelectionState {
                phase: Phase::Ready,
                winner: None
            }
        );
    }
}
