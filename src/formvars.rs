//! An ordered list of name/value pairs. Form data, cookies and session variables are all stored
//! in one of these.

/// A single name/value pair. The name is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: Vec<u8>,
    value: Vec<u8>,
}

impl Entry {
    pub(crate) fn from_parts(name: Vec<u8>, value: Vec<u8>) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The value as `&str` if it is valid utf-8
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    pub fn set_value(&mut self, value: impl Into<Vec<u8>>) {
        self.value = value.into();
    }

    fn matches(&self, name: &[u8]) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Insertion ordered association list. Lookups compare names ignoring ASCII case and return the
/// first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormVars {
    entries: Vec<Entry>,
}

impl FormVars {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry. Returns `false` and leaves the list untouched if `name` is empty.
    pub fn push(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> bool {
        let name = name.into();

        if name.is_empty() {
            return false;
        }

        self.entries.push(Entry {
            name,
            value: value.into(),
        });

        true
    }

    pub(crate) fn push_entry(&mut self, entry: Entry) {
        debug_assert!(!entry.name.is_empty());

        self.entries.push(entry);
    }

    /// Value of the first entry named `name`. An empty value is reported as `None`, the same as a
    /// missing entry.
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.entry(name)
            .map(Entry::value)
            .filter(|value| !value.is_empty())
    }

    /// Like `get`, but only returns values that are valid utf-8
    pub fn get_str(&self, name: impl AsRef<[u8]>) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn entry(&self, name: impl AsRef<[u8]>) -> Option<&Entry> {
        let name = name.as_ref();

        self.entries.iter().find(|e| e.matches(name))
    }

    pub fn get_mut(&mut self, name: impl AsRef<[u8]>) -> Option<&mut Entry> {
        let name = name.as_ref();

        self.entries.iter_mut().find(|e| e.matches(name))
    }

    /// Whether an entry named `name` exists, regardless of its value.
    pub fn contains(&self, name: impl AsRef<[u8]>) -> bool {
        self.entry(name).is_some()
    }

    /// Iterates over the values of every entry named `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a [u8]) -> Values<'a> {
        Values {
            inner: self.entries.iter(),
            name,
        }
    }

    /// Removes the first entry named `name` and returns it.
    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> Option<Entry> {
        let name = name.as_ref();

        let idx = self.entries.iter().position(|e| e.matches(name))?;

        Some(self.entries.remove(idx))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub(crate) fn try_reserve(
        &mut self,
        additional: usize,
    ) -> Result<(), std::collections::TryReserveError> {
        self.entries.try_reserve(additional)
    }
}

impl<'a> IntoIterator for &'a FormVars {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Values of a repeated name. Once exhausted it keeps returning `None`.
pub struct Values<'a> {
    inner: std::slice::Iter<'a, Entry>,
    name: &'a [u8],
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.name;

        self.inner.find(|e| e.matches(name)).map(Entry::value)
    }
}

impl std::iter::FusedIterator for Values<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> FormVars {
        let mut list = FormVars::new();

        list.push("zero", "0");
        list.push("One", "one");
        list.push("empty", "");
        list.push("one", "two");

        list
    }

    #[test]
    fn lookup_ignores_case() {
        let list = list();

        assert_eq!(list.get("ONE"), Some(&b"one"[..]));
        assert_eq!(list.get_str("zero"), Some("0"));
        assert!(list.get("missing").is_none());
    }

    #[test]
    fn empty_value_is_absent() {
        let list = list();

        assert!(list.get("empty").is_none());
        assert!(list.contains("empty"));
    }

    #[test]
    fn rejects_empty_name() {
        let mut list = FormVars::new();

        assert!(!list.push("", "value"));
        assert!(list.is_empty());
    }

    #[test]
    fn remove_first_match() {
        let mut list = list();

        let removed = list.remove("one").unwrap();

        assert_eq!(removed.value(), b"one");
        assert_eq!(list.len(), 3);
        assert_eq!(list.get("one"), Some(&b"two"[..]));

        assert!(list.remove("nothing").is_none());
    }

    #[test]
    fn remove_last_then_push_keeps_order() {
        let mut list = list();

        list.remove("one");
        list.remove("one");
        list.push("tail", "t");

        let names: Vec<&[u8]> = list.iter().map(Entry::name).collect();

        assert_eq!(names, vec![&b"zero"[..], &b"empty"[..], &b"tail"[..]]);
    }

    #[test]
    fn repeated_values_stay_exhausted() {
        let list = list();

        let mut values = list.get_all(b"one");

        assert_eq!(values.next(), Some(&b"one"[..]));
        assert_eq!(values.next(), Some(&b"two"[..]));
        assert_eq!(values.next(), None);
        assert_eq!(values.next(), None);
    }

    #[test]
    fn clear_empty_is_noop() {
        let mut list = FormVars::new();

        list.clear();
        list.clear();

        assert!(list.is_empty());
    }
}
