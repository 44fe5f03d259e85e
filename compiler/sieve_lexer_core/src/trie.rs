//! Greedy longest-match trie over a fixed string vocabulary.

/// An immutable trie over a finite set of strings, each mapped to a value.
///
/// Built once from the full vocabulary and read-only afterwards, so a trie
/// stored in a `static` is safe to share without synchronization. Child
/// lookup is a binary search over the node's sorted character list.
///
/// # Vocabulary invariant
///
/// Every scanner that uses a trie for one-character-lookahead splitting
/// relies on this property of the vocabulary: for any two member strings
/// where one is a strict prefix of the other, every string strictly between
/// them in length must itself be a member. That is what allows greedy
/// longest-prefix scanning to be corrected later by a bounded join pass
/// instead of full backtracking. The property holds for the vocabularies in
/// this repository (JS punctuation, entity names are never split this way)
/// and is documented rather than mechanically checked.
#[derive(Debug)]
pub struct PunctuationTrie<V> {
    /// Sorted first characters of the child subtrees.
    child_map: Vec<char>,
    /// Child subtrees, parallel to `child_map`.
    children: Vec<PunctuationTrie<V>>,
    /// The value of the vocabulary string ending at this node, if any.
    value: Option<V>,
}

impl<V: Clone> PunctuationTrie<V> {
    /// Build a trie from `(string, value)` entries.
    ///
    /// Duplicate strings keep the first value given.
    pub fn new(entries: &[(&str, V)]) -> PunctuationTrie<V> {
        let mut sorted: Vec<(Vec<char>, V)> = entries
            .iter()
            .map(|(s, v)| (s.chars().collect(), v.clone()))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted.dedup_by(|a, b| a.0 == b.0);
        Self::build(&sorted, 0)
    }

    fn build(entries: &[(Vec<char>, V)], depth: usize) -> PunctuationTrie<V> {
        let mut value = None;
        let mut child_map = Vec::new();
        let mut children = Vec::new();

        let mut i = 0;
        while i < entries.len() {
            let (chars, v) = &entries[i];
            if chars.len() == depth {
                value = Some(v.clone());
                i += 1;
                continue;
            }
            let ch = chars[depth];
            let group_start = i;
            while i < entries.len()
                && entries[i].0.len() > depth
                && entries[i].0[depth] == ch
            {
                i += 1;
            }
            child_map.push(ch);
            children.push(Self::build(&entries[group_start..i], depth + 1));
        }

        PunctuationTrie {
            child_map,
            children,
            value,
        }
    }

    /// True iff a vocabulary string ends exactly at this node.
    pub fn is_terminal(&self) -> bool {
        self.value.is_some()
    }

    /// The value of the vocabulary string ending here, if terminal.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Step one character deeper, or `None` if no member continues this way.
    pub fn lookup(&self, ch: char) -> Option<&PunctuationTrie<V>> {
        self.child_map
            .binary_search(&ch)
            .ok()
            .map(|i| &self.children[i])
    }

    /// Walk several characters, failing as soon as one has no child.
    pub fn lookup_str(&self, s: &str) -> Option<&PunctuationTrie<V>> {
        let mut t = self;
        for ch in s.chars() {
            t = t.lookup(ch)?;
        }
        Some(t)
    }

    /// True iff some vocabulary string starts with `ch`. Meaningful on the
    /// root node, where splitters use it to decide "is this punctuation?".
    pub fn contains(&self, ch: char) -> bool {
        self.lookup(ch).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit_trie(words: &[&str]) -> PunctuationTrie<()> {
        let entries: Vec<(&str, ())> = words.iter().map(|w| (*w, ())).collect();
        PunctuationTrie::new(&entries)
    }

    // === Lookup ===

    #[test]
    fn terminal_at_member_strings() {
        let t = unit_trie(&["-", "--", "->"]);
        assert!(t.lookup_str("-").is_some_and(PunctuationTrie::is_terminal));
        assert!(t.lookup_str("--").is_some_and(PunctuationTrie::is_terminal));
        assert!(t.lookup_str("->").is_some_and(PunctuationTrie::is_terminal));
        assert!(t.lookup_str("-->").is_none());
    }

    #[test]
    fn non_member_prefix_is_not_terminal() {
        let t = unit_trie(&["..", "..."]);
        let dot = t.lookup('.');
        assert!(dot.is_some());
        assert!(!dot.is_some_and(PunctuationTrie::is_terminal));
    }

    #[test]
    fn contains_checks_first_characters() {
        let t = unit_trie(&["+", "-", "<<"]);
        assert!(t.contains('+'));
        assert!(t.contains('<'));
        assert!(!t.contains('a'));
    }

    #[test]
    fn values_attach_to_terminals() {
        let t = PunctuationTrie::new(&[("amp", '&'), ("lt", '<')]);
        assert_eq!(t.lookup_str("amp").and_then(PunctuationTrie::value), Some(&'&'));
        assert_eq!(t.lookup_str("lt").and_then(PunctuationTrie::value), Some(&'<'));
        assert_eq!(t.lookup_str("am").and_then(PunctuationTrie::value), None);
    }

    // === Greedy longest match ===

    #[test]
    fn greedy_scan_prefers_longest_terminal_prefix() {
        // Scanning "-->" over {-, ->, --} must take "--" then stop, not two
        // one-character matches.
        let t = unit_trie(&["-", "->", "--"]);
        let input: Vec<char> = "-->".chars().collect();

        let mut node = &t;
        let mut last_terminal = 0;
        for (i, &ch) in input.iter().enumerate() {
            match node.lookup(ch) {
                Some(next) => {
                    node = next;
                    if node.is_terminal() {
                        last_terminal = i + 1;
                    }
                }
                None => break,
            }
        }
        assert_eq!(last_terminal, 2);
        let matched: String = input[..last_terminal].iter().collect();
        assert_eq!(matched, "--");
    }

    // === Construction edge cases ===

    #[test]
    fn duplicate_entries_collapse() {
        let t = PunctuationTrie::new(&[("a", 1), ("a", 2)]);
        assert_eq!(t.lookup_str("a").and_then(PunctuationTrie::value), Some(&1));
    }

    #[test]
    fn empty_string_makes_root_terminal() {
        let t = PunctuationTrie::new(&[("", 0), ("x", 1)]);
        assert!(t.is_terminal());
        assert_eq!(t.value(), Some(&0));
    }
}
