/// last `/`-separated component of a relative path
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// pick a storage name for a new blob that `is_taken` doesn't reject
///
/// candidates are `{hash[..k]}-{base}` for k growing from `prefix_len` to the
/// full hash, then `{hash}-{n}-{base}` for n = 0, 1, 2, ...
/// with N taken names this needs at most `hash.len() + N` probes.
pub fn storage_name(
    hash: &str,
    base: &str,
    prefix_len: usize,
    mut is_taken: impl FnMut(&str) -> bool,
) -> String {
    let start = prefix_len.clamp(1, hash.len().max(1)).min(hash.len());

    for k in start..=hash.len() {
        let name = format!("{}-{}", &hash[..k], base);
        if !is_taken(&name) {
            return name;
        }
    }

    let mut n: u64 = 0;
    loop {
        let name = format!("{}-{}-{}", hash, n, base);
        if !is_taken(&name) {
            return name;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const HASH: &str = "abcdef0123456789";

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a.txt"), "a.txt");
        assert_eq!(base_name("lib/x/a.so"), "a.so");
    }

    #[test]
    fn test_short_prefix_when_free() {
        let name = storage_name(HASH, "a.txt", 4, |_| false);
        assert_eq!(name, "abcd-a.txt");
    }

    #[test]
    fn test_prefix_grows_on_collision() {
        let taken: HashSet<_> = ["abcd-a.txt", "abcde-a.txt"].into_iter().collect();
        let name = storage_name(HASH, "a.txt", 4, |n| taken.contains(n));
        assert_eq!(name, "abcdef-a.txt");
    }

    #[test]
    fn test_numeric_suffix_after_full_hash() {
        let mut taken: HashSet<String> = (4..=HASH.len())
            .map(|k| format!("{}-a.txt", &HASH[..k]))
            .collect();

        let name = storage_name(HASH, "a.txt", 4, |n| taken.contains(n));
        assert_eq!(name, format!("{}-0-a.txt", HASH));

        taken.insert(name);
        let name = storage_name(HASH, "a.txt", 4, |n| taken.contains(n));
        assert_eq!(name, format!("{}-1-a.txt", HASH));
    }

    #[test]
    fn test_unique_names_within_probe_bound() {
        let mut taken = HashSet::new();
        let total = 40;

        for i in 0..total {
            let mut probes = 0;
            let name = storage_name(HASH, "a.txt", 4, |n| {
                probes += 1;
                taken.contains(n)
            });
            assert!(probes <= HASH.len() + i + 1, "probe count {} for file {}", probes, i);
            assert!(taken.insert(name));
        }
        assert_eq!(taken.len(), total);
    }

    #[test]
    fn test_prefix_len_clamped() {
        assert_eq!(storage_name("abc", "f", 10, |_| false), "abc-f");
        assert_eq!(storage_name("abc", "f", 0, |_| false), "a-f");
    }
}
