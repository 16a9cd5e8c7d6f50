use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

const DICEBEAR_BASE_URL: &str = "https://api.dicebear.com/9.x";

pub const AVATAR_STYLES: [&str; 8] = [
    "adventurer-neutral",
    "avataaars-neutral",
    "big-ears-neutral",
    "bottts-neutral",
    "fun-emoji",
    "pixel-art-neutral",
    "thumbs",
    "shapes",
];

/// PNG avatar URL for `style`, seeded so the image is stable for the bot.
pub fn avatar_url(style: &str, seed: Uuid) -> String {
    format!("{DICEBEAR_BASE_URL}/{style}/png?seed={seed}")
}

/// Avatar URL with a random style and a fresh seed.
pub fn random_avatar<R: Rng + ?Sized>(rng: &mut R) -> String {
    let style = AVATAR_STYLES.choose(rng).copied().unwrap_or(AVATAR_STYLES[0]);
    avatar_url(style, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_avatar_url_shape() {
        let seed = Uuid::nil();
        assert_eq!(
            avatar_url("thumbs", seed),
            "https://api.dicebear.com/9.x/thumbs/png?seed=00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_random_avatar_uses_known_style() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let url = random_avatar(&mut rng);
            let style = url
                .trim_start_matches("https://api.dicebear.com/9.x/")
                .split('/')
                .next()
                .unwrap();
            assert!(AVATAR_STYLES.contains(&style), "{url}");
        }
    }
}
