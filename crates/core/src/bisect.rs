//! Bisection of good/bad profile pairs.
//!
//! The search works over the functions both profiles know about
//! ("common keys"), in a fixed order. Every probe builds a hybrid profile:
//! the good profile with some window of common keys replaced by their bad
//! blobs. A window is split in half and each half is probed on its own:
//!
//! - a half that is BAD by itself is searched recursively;
//! - when neither half is BAD alone, the culprit is an interaction that
//!   crosses the split, and the window is narrowed to the smallest range
//!   the border search can find and reported as a joint range.
//!
//! The oracle is assumed to be deterministic and monotone (adding bad
//! blobs to a BAD hybrid keeps it BAD). Neither is re-verified.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decider::{Decider, DeciderError, Verdict};
use crate::profile::Profile;

/// Upper bound on shuffle-and-narrow rounds spent on one joint range.
pub const RANGE_SEARCH_ROUNDS: usize = 20;

/// Seed for the joint-range shuffles when the caller did not pick one.
const DEFAULT_SEARCH_SEED: u64 = 0;

/// Culprits found by a bisection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BisectResults {
    /// Functions whose bad blob alone makes the build BAD.
    pub individuals: Vec<String>,
    /// Sets of functions that are only BAD together.
    pub ranges: Vec<Vec<String>>,
}

impl BisectResults {
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty() && self.ranges.is_empty()
    }

    fn merge(&mut self, other: BisectResults) {
        self.individuals.extend(other.individuals);
        self.ranges.extend(other.ranges);
    }

    /// Sort individuals, the members of each range, and the ranges themselves.
    pub fn normalize(&mut self) {
        self.individuals.sort();
        for range in &mut self.ranges {
            range.sort();
        }
        self.ranges.sort();
    }
}

#[derive(Debug, Error)]
pub enum BisectError {
    #[error("Precondition failed: {0}")]
    Precondition(&'static str),
    #[error(transparent)]
    Decider(#[from] DeciderError),
}

/// Knobs for [`bisect_profiles_wrapper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectOptions {
    /// Verify that `good` is GOOD and `bad` is BAD before searching.
    pub perform_check: bool,
    /// Shuffle the common keys with this seed. Results are order-dependent,
    /// so different seeds can surface different culprits.
    pub shuffle_seed: Option<u64>,
}

impl Default for BisectOptions {
    fn default() -> Self {
        Self { perform_check: true, shuffle_seed: None }
    }
}

/// Functions present in both profiles, in `good`'s order.
pub fn common_keys(good: &Profile, bad: &Profile) -> Vec<String> {
    good.names().filter(|name| bad.contains(name)).map(str::to_string).collect()
}

/// Probe `good` with `names` swapped to their bad blobs.
fn probe<D: Decider + ?Sized>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
    names: &[String],
) -> Result<Verdict, DeciderError> {
    let hybrid = good.with_substitutions(bad, names.iter().map(String::as_str));
    let verdict = decider.run(&hybrid, true)?;
    debug!("Probe over {} bad function(s) returned {}", names.len(), verdict.as_str());
    Ok(verdict)
}

/// Recursively search `common_keys[start..end]` for culprits.
///
/// The caller guarantees the window as a whole is BAD. A window of one key
/// is reported as that key without consulting the decider.
pub fn range_search<D, R>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
    common_keys: &[String],
    start: usize,
    end: usize,
    rng: &mut R,
) -> Result<BisectResults, BisectError>
where
    D: Decider + ?Sized,
    R: Rng + ?Sized,
{
    let mut results = BisectResults::default();
    if end.saturating_sub(start) <= 1 {
        if let Some(culprit) = common_keys.get(start) {
            info!("Found {} as a problematic function profile", culprit);
            results.individuals.push(culprit.clone());
        }
        return Ok(results);
    }

    let mid = start + (end - start) / 2;
    let lo_verdict = probe(decider, good, bad, &common_keys[start..mid])?;
    let hi_verdict = probe(decider, good, bad, &common_keys[mid..end])?;

    if lo_verdict == Verdict::Bad {
        results.merge(range_search(decider, good, bad, common_keys, start, mid, rng)?);
    }
    if hi_verdict == Verdict::Bad {
        results.merge(range_search(decider, good, bad, common_keys, mid, end, rng)?);
    }

    if lo_verdict == Verdict::Good && hi_verdict == Verdict::Good {
        let range = find_joint_range(
            decider,
            good,
            bad,
            &common_keys[start..mid],
            &common_keys[mid..end],
            rng,
        )?;
        if !range.is_empty() {
            info!("Found {:?} as a problematic combination of profiles", range);
            results.ranges.push(range);
        }
    }

    Ok(results)
}

/// Narrow a window whose halves are GOOD alone but BAD together.
///
/// `funcs` is laid out as lower half then upper half. The upper border is
/// the shortest prefix of the upper half that, combined with the whole lower
/// half, is BAD. The lower border is the latest start in the lower half that
/// keeps `funcs[lower..upper]` BAD. Each round reshuffles both narrowed halves
/// and keeps the smallest window seen; a pair cannot shrink further.
fn find_joint_range<D, R>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
    lo_half: &[String],
    hi_half: &[String],
    rng: &mut R,
) -> Result<Vec<String>, DeciderError>
where
    D: Decider + ?Sized,
    R: Rng + ?Sized,
{
    let mut lo_funcs = lo_half.to_vec();
    let mut hi_funcs = hi_half.to_vec();
    let mut smallest: Vec<String> = Vec::new();

    for round in 0..RANGE_SEARCH_ROUNDS {
        if round > 0 {
            lo_funcs.shuffle(rng);
            hi_funcs.shuffle(rng);
        }
        let mid = lo_funcs.len();
        let funcs: Vec<String> = lo_funcs.iter().chain(hi_funcs.iter()).cloned().collect();

        let upper = find_upper_border(decider, good, bad, &funcs, mid)?;
        let lower = find_lower_border(decider, good, bad, &funcs, mid, upper)?;
        let candidate = &funcs[lower..upper];

        if smallest.is_empty() || candidate.len() < smallest.len() {
            smallest = candidate.to_vec();
            lo_funcs = funcs[lower..mid].to_vec();
            hi_funcs = funcs[mid..upper].to_vec();
            if smallest.len() <= 2 {
                break;
            }
        }
    }

    smallest.sort();
    Ok(smallest)
}

/// Smallest `upper` in `(mid, funcs.len()]` with `funcs[..upper]` BAD.
fn find_upper_border<D: Decider + ?Sized>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
    funcs: &[String],
    mid: usize,
) -> Result<usize, DeciderError> {
    let mut known_good = mid;
    let mut known_bad = funcs.len();
    while known_bad - known_good > 1 {
        let probe_at = known_good + (known_bad - known_good) / 2;
        match probe(decider, good, bad, &funcs[..probe_at])? {
            Verdict::Bad => known_bad = probe_at,
            Verdict::Good => known_good = probe_at,
        }
    }
    Ok(known_bad)
}

/// Largest `lower` in `[0, mid)` with `funcs[lower..upper]` BAD.
fn find_lower_border<D: Decider + ?Sized>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
    funcs: &[String],
    mid: usize,
    upper: usize,
) -> Result<usize, DeciderError> {
    let mut known_bad = 0;
    let mut known_good = mid;
    while known_good - known_bad > 1 {
        let probe_at = known_bad + (known_good - known_bad) / 2;
        match probe(decider, good, bad, &funcs[probe_at..upper])? {
            Verdict::Bad => known_bad = probe_at,
            Verdict::Good => known_good = probe_at,
        }
    }
    Ok(known_bad)
}

/// Validate the inputs and bisect every function the two profiles share.
pub fn bisect_profiles_wrapper<D: Decider + ?Sized>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
    options: &BisectOptions,
) -> Result<BisectResults, BisectError> {
    if options.perform_check {
        if decider.run(good, false)? != Verdict::Good {
            return Err(BisectError::Precondition("Supplied good profile is not actually GOOD"));
        }
        if decider.run(bad, false)? != Verdict::Bad {
            return Err(BisectError::Precondition("Supplied bad profile is not actually BAD"));
        }
    }

    let mut keys = common_keys(good, bad);
    if keys.is_empty() {
        warn!("Good and bad profiles share no functions; nothing to bisect");
        return Ok(BisectResults::default());
    }

    let mut rng = StdRng::seed_from_u64(options.shuffle_seed.unwrap_or(DEFAULT_SEARCH_SEED));
    if options.shuffle_seed.is_some() {
        keys.shuffle(&mut rng);
    }

    if probe(decider, good, bad, &keys)? == Verdict::Good {
        warn!(
            "Swapping all {} shared functions to their bad profiles is GOOD; \
             the problem lies in functions present in only one profile",
            keys.len()
        );
        return Ok(BisectResults::default());
    }

    let mut results = range_search(decider, good, bad, &keys, 0, keys.len(), &mut rng)?;
    results.normalize();
    Ok(results)
}

/// Does `bad` turn GOOD once it gains the functions only `good` has?
pub fn check_good_not_bad<D: Decider + ?Sized>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
) -> Result<bool, DeciderError> {
    let good_only: Vec<&str> = good.names_missing_from(bad).collect();
    let patched = bad.with_substitutions(good, good_only);
    Ok(decider.run(&patched, true)? == Verdict::Good)
}

/// Does `good` turn BAD once it gains the functions only `bad` has?
pub fn check_bad_not_good<D: Decider + ?Sized>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
) -> Result<bool, DeciderError> {
    let bad_only: Vec<&str> = bad.names_missing_from(good).collect();
    let patched = good.with_substitutions(bad, bad_only);
    Ok(decider.run(&patched, true)? == Verdict::Bad)
}
