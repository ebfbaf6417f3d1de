//! DOMTokenList (classList)
//!
//! CSS state classes are the only channel the loader uses to expose
//! lifecycle state to styling, so swaps must never leave a stale token.

/// Ordered set of space-separated tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DOMTokenList {
    tokens: Vec<String>,
}

impl DOMTokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a class attribute value, dropping duplicates
    pub fn from_string(s: &str) -> Self {
        let mut list = Self::new();
        for token in s.split_whitespace() {
            list.add(token);
        }
        list
    }

    pub fn length(&self) -> usize {
        self.tokens.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Add a token; no-op when present or empty
    pub fn add(&mut self, token: &str) {
        if !token.is_empty() && !self.contains(token) {
            self.tokens.push(token.to_string());
        }
    }

    /// Remove a token, returns whether it was present
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        self.tokens.len() != before
    }

    /// Swap `old_token` for `new_token`.
    ///
    /// Unlike the platform `replace()`, the new token is added even when the
    /// old one is missing, so a state swap always lands on the target class.
    pub fn swap(&mut self, old_token: &str, new_token: &str) {
        match self.tokens.iter().position(|t| t == old_token) {
            Some(pos) if !self.contains(new_token) => self.tokens[pos] = new_token.to_string(),
            Some(_) => {
                self.remove(old_token);
            }
            None => self.add(new_token),
        }
    }

    /// Serialized attribute value
    pub fn value(&self) -> String {
        self.tokens.join(" ")
    }

    pub(crate) fn set_value(&mut self, value: &str) {
        *self = Self::from_string(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|s| s.as_str())
    }
}

impl std::fmt::Display for DOMTokenList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value())
    }
}
