use rand::seq::SliceRandom;
use rand::Rng;

use super::SharedRng;
use crate::db::BotStore;
use crate::error::Result;

pub const MAX_USERNAME_LEN: usize = 20;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brave", "bright", "calm", "clever", "cosmic", "crimson", "curious", "daring",
    "dusty", "eager", "electric", "fancy", "fierce", "gentle", "golden", "happy", "hidden",
    "humble", "jolly", "lively", "lucky", "mellow", "misty", "noble", "odd", "polar", "quiet",
    "rapid", "rustic", "shy", "silent", "silver", "sleepy", "snowy", "solar", "stormy", "sunny",
    "swift", "tidy", "vivid", "wild", "witty", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "beacon", "comet", "coyote", "dolphin", "falcon", "fern", "fox", "galaxy", "gecko",
    "harbor", "hawk", "heron", "koala", "lantern", "lynx", "maple", "meadow", "moose", "nebula",
    "otter", "owl", "panda", "pebble", "penguin", "pixel", "quasar", "raven", "river", "robin",
    "sparrow", "squid", "tiger", "trail", "tundra", "walrus", "willow", "wolf", "yak", "zebra",
];

/// `adjective_noun_N` with N in `0..=9999`, cut to 20 characters.
pub fn generate_candidate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("quiet");
    let noun = NOUNS.choose(rng).copied().unwrap_or("owl");
    let number: u16 = rng.gen_range(0..=9999);
    truncate(format!("{adjective}_{noun}_{number}"))
}

/// Replace the first non-digit character with a random digit.
/// Returns `None` when the name is all digits.
pub fn mutate_first_non_digit<R: Rng + ?Sized>(name: &str, rng: &mut R) -> Option<String> {
    let position = name.char_indices().find(|(_, c)| !c.is_ascii_digit())?;
    let digit = char::from(b'0' + rng.gen_range(0..10u8));

    let mut mutated = String::with_capacity(name.len());
    mutated.push_str(&name[..position.0]);
    mutated.push(digit);
    mutated.push_str(&name[position.0 + position.1.len_utf8()..]);
    Some(mutated)
}

/// A username no bot currently holds.
///
/// A taken candidate has its first non-digit character turned into a digit;
/// a taken all-digit name is replaced by a fresh candidate.
pub async fn generate_unique_username(store: &dyn BotStore, rng: &SharedRng) -> Result<String> {
    let mut name = rng.with(|r| generate_candidate(r));
    while store.bot_name_exists(&name).await? {
        tracing::debug!(username = %name, "Username taken, mutating");
        name = rng.with(|r| mutate_first_non_digit(&name, r).unwrap_or_else(|| generate_candidate(r)));
    }
    Ok(name)
}

fn truncate(mut name: String) -> String {
    if let Some((idx, _)) = name.char_indices().nth(MAX_USERNAME_LEN) {
        name.truncate(idx);
    }
    name
}
