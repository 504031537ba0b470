/// Maps an identifying string to the key the progress store is indexed by.
pub trait ContentHasher: Send + Sync {
    fn hash(&self, input: &str) -> String;
}

/// The host's string hash: a 31-multiplier rolling hash over UTF-16 code units,
/// wrapped to 32 bits and rendered as its absolute decimal value.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostHasher;

impl ContentHasher for HostHasher {
    fn hash(&self, input: &str) -> String {
        let mut acc: i32 = 0;
        for unit in input.encode_utf16() {
            acc = acc.wrapping_shl(5).wrapping_sub(acc).wrapping_add(unit as i32);
        }
        acc.unsigned_abs().to_string()
    }
}

/// Key for one episode of a show: season, a `:` separator for seasons past 10,
/// episode number and the show title, concatenated.
pub fn episode_key(season: i64, episode: i64, title: &str) -> String {
    let sep = if season > 10 { ":" } else { "" };
    format!("{season}{sep}{episode}{title}")
}
