//! Shared fixtures for the core integration tests.
//!
//! Every test builds its own profiles through these factories; nothing here
//! holds state between tests.

#![allow(dead_code)]

use afdo_core::decider::{DeciderError, FnDecider, Verdict};
use afdo_core::profile::Profile;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Functions shared by both profiles that no oracle below cares about.
pub const COMMON_EXTRA_FUNCS: usize = 100;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// The small good/bad pair: `func_a` and `func_b` differ, `func_d` exists
/// only in good and `func_c` only in bad.
pub fn base_profiles() -> (Profile, Profile) {
    let good: Profile = [("func_a", "2"), ("func_b", "4"), ("func_d", "5")].into_iter().collect();
    let bad: Profile = [("func_a", "1"), ("func_b", "3"), ("func_c", "5")].into_iter().collect();
    (good, bad)
}

/// [`base_profiles`] padded with `extras` shared functions whose good and bad
/// blobs differ but never matter. Blob values come from `rng`.
pub fn padded_profiles(rng: &mut StdRng, extras: usize) -> (Profile, Profile) {
    let (mut good, mut bad) = base_profiles();
    for i in 0..extras {
        let name = format!("extra_{i:03}");
        // Stay clear of the digits the oracles look for.
        let good_value: u32 = rng.gen_range(5000..6000);
        let bad_value: u32 = rng.gen_range(7000..8000);
        good.insert(name.as_str(), format!("g{good_value}"));
        bad.insert(name.as_str(), format!("b{bad_value}"));
    }
    (good, bad)
}

fn blob_contains(profile: &Profile, name: &str, needle: &str) -> bool {
    profile.get(name).map(|blob| blob.contains(needle)).unwrap_or(false)
}

/// BAD if either `func_a` or `func_b` carries its bad blob.
pub fn either_bad_decider(
) -> FnDecider<impl FnMut(&Profile) -> Result<Verdict, DeciderError>> {
    FnDecider::new(|prof: &Profile| {
        if blob_contains(prof, "func_a", "1") || blob_contains(prof, "func_b", "3") {
            Ok(Verdict::Bad)
        } else {
            Ok(Verdict::Good)
        }
    })
}

/// BAD only if `func_a` and `func_b` both carry their bad blobs.
pub fn both_bad_decider() -> FnDecider<impl FnMut(&Profile) -> Result<Verdict, DeciderError>> {
    FnDecider::new(|prof: &Profile| {
        if blob_contains(prof, "func_a", "1") && blob_contains(prof, "func_b", "3") {
            Ok(Verdict::Bad)
        } else {
            Ok(Verdict::Good)
        }
    })
}

/// BAD iff `name` holds exactly `bad_blob`.
pub fn single_key_decider(
    name: &'static str,
    bad_blob: String,
) -> FnDecider<impl FnMut(&Profile) -> Result<Verdict, DeciderError>> {
    FnDecider::new(move |prof: &Profile| {
        if prof.get(name) == Some(bad_blob.as_str()) {
            Ok(Verdict::Bad)
        } else {
            Ok(Verdict::Good)
        }
    })
}
